//! Abstract draw instructions
//!
//! The engine never draws anything itself. It emits instructions to a
//! [`Renderer`] whenever a calibration or measurement step completes and when
//! the whole overlay has to be redrawn.

use crate::error::{MeasureError, MeasureResult};
use crate::geometry::Point;
use crate::units::Unit;
use std::fmt;
use std::str::FromStr;

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Calibration tap marker
    pub const CALIBRATION_POINT: Color = Color::rgb(0xff, 0x6b, 0x6b);
    /// Calibration span line
    pub const CALIBRATION_LINE: Color = Color::rgb(0x48, 0xbb, 0x78);
    /// Measurement tap marker
    pub const MEASUREMENT_POINT: Color = Color::rgb(0x66, 0x7e, 0xea);

    /// `#rrggbb` hex string
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Error parsing a `#rrggbb` color
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {0:?}, expected #rrggbb")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseColorError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        Ok(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl serde::Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Stroke used for measurement lines. Width is always finite and positive.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LineStyle {
    color: Color,
    width: f64,
}

impl LineStyle {
    pub fn new(color: Color, width: f64) -> MeasureResult<Self> {
        if !(width.is_finite() && width > 0.0) {
            return Err(MeasureError::InvalidLineWidth(width));
        }
        Ok(Self { color, width })
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn width(&self) -> f64 {
        self.width
    }
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: Color::MEASUREMENT_POINT,
            width: 3.0,
        }
    }
}

/// A single draw instruction
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawCommand {
    Clear,
    Point {
        at: Point,
        color: Color,
        radius: f64,
    },
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: f64,
    },
    LabeledDistance {
        from: Point,
        to: Point,
        /// Label anchor, the segment midpoint
        at: Point,
        distance: f64,
        unit: Unit,
        text: String,
    },
}

/// Sink for draw instructions
pub trait Renderer {
    fn clear(&mut self);

    fn draw_point(&mut self, at: Point, color: Color, radius: f64);

    fn draw_line(&mut self, from: Point, to: Point, color: Color, width: f64);

    /// Label a segment with its length, centered on its midpoint
    fn draw_labeled_distance(&mut self, from: Point, to: Point, distance: f64, unit: Unit);
}

/// Format a distance label
pub fn distance_label(distance: f64, unit: Unit) -> String {
    format!("{distance:.2} {unit}")
}

/// Renderer that records every instruction
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Commands issued since the most recent `Clear`
    pub fn visible(&self) -> &[DrawCommand] {
        let start = self
            .commands
            .iter()
            .rposition(|command| matches!(command, DrawCommand::Clear))
            .map_or(0, |index| index + 1);
        &self.commands[start..]
    }

    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl Renderer for DrawList {
    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn draw_point(&mut self, at: Point, color: Color, radius: f64) {
        self.commands.push(DrawCommand::Point { at, color, radius });
    }

    fn draw_line(&mut self, from: Point, to: Point, color: Color, width: f64) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            color,
            width,
        });
    }

    fn draw_labeled_distance(&mut self, from: Point, to: Point, distance: f64, unit: Unit) {
        self.commands.push(DrawCommand::LabeledDistance {
            from,
            to,
            at: from.midpoint(&to),
            distance,
            unit,
            text: distance_label(distance, unit),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_round_trip() {
        let color: Color = "#48BB78".parse().unwrap();
        assert_eq!(color, Color::CALIBRATION_LINE);
        assert_eq!(color.to_hex(), "#48bb78");
    }

    #[test]
    fn test_invalid_colors() {
        for input in ["48bb78", "#48bb7", "#48bb78ff", "#gg0000", "#é0000"] {
            assert!(input.parse::<Color>().is_err(), "{input} should not parse");
        }
    }

    #[test]
    fn test_line_style_width() {
        assert!(LineStyle::new(Color::CALIBRATION_LINE, 2.0).is_ok());
        assert_eq!(
            LineStyle::new(Color::CALIBRATION_LINE, 0.0),
            Err(MeasureError::InvalidLineWidth(0.0))
        );
        assert!(LineStyle::new(Color::CALIBRATION_LINE, f64::NAN).is_err());
        assert_eq!(LineStyle::default().width(), 3.0);
    }

    #[test]
    fn test_draw_list_visible() {
        let mut list = DrawList::new();
        list.draw_point(Point::new(1.0, 1.0), Color::CALIBRATION_POINT, 8.0);
        list.clear();
        list.draw_labeled_distance(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 4.25, Unit::Centimeter);

        assert_eq!(list.commands().len(), 3);
        let visible = list.visible();
        assert_eq!(visible.len(), 1);
        assert!(matches!(
            &visible[0],
            DrawCommand::LabeledDistance { text, at, .. }
                if text == "4.25 cm" && *at == Point::new(5.0, 0.0)
        ));
    }

    #[test]
    fn test_command_json() {
        let command = DrawCommand::Point {
            at: Point::new(2.0, 3.0),
            color: Color::MEASUREMENT_POINT,
            radius: 6.0,
        };
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["op"], "point");
        assert_eq!(value["color"], "#667eea");
    }
}
