//! Length units and conversion
//!
//! All conversions compose through millimeters, the canonical unit.

use crate::error::MeasureError;
use std::fmt;
use std::str::FromStr;

const MM_PER_CM: f64 = 10.0;
const MM_PER_INCH: f64 = 25.4;

/// Physical length unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Unit {
    #[serde(rename = "mm")]
    Millimeter,
    #[serde(rename = "cm")]
    Centimeter,
    #[serde(rename = "in")]
    Inch,
}

impl Unit {
    /// Every supported unit, in display order
    pub const ALL: [Unit; 3] = [Unit::Millimeter, Unit::Centimeter, Unit::Inch];

    /// Short symbol used in labels and serialized data
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Millimeter => "mm",
            Unit::Centimeter => "cm",
            Unit::Inch => "in",
        }
    }

    /// Human-readable unit name
    pub fn name(&self) -> &'static str {
        match self {
            Unit::Millimeter => "millimeter",
            Unit::Centimeter => "centimeter",
            Unit::Inch => "inch",
        }
    }

    fn millimeters_per_unit(&self) -> f64 {
        match self {
            Unit::Millimeter => 1.0,
            Unit::Centimeter => MM_PER_CM,
            Unit::Inch => MM_PER_INCH,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" => Ok(Unit::Millimeter),
            "cm" | "centimeter" | "centimeters" => Ok(Unit::Centimeter),
            "in" | "inch" | "inches" => Ok(Unit::Inch),
            _ => Err(MeasureError::UnknownUnit(s.to_string())),
        }
    }
}

/// Convert a length between units
pub fn convert(value: f64, from: Unit, to: Unit) -> f64 {
    if from == to {
        return value;
    }
    let millimeters = value * from.millimeters_per_unit();
    millimeters / to.millimeters_per_unit()
}

/// Convert a length between unit labels.
///
/// An unrecognized label on either side is read as millimeters, so two unknown
/// labels leave the value untouched.
pub fn convert_labels(value: f64, from: &str, to: &str) -> f64 {
    let to_mm = from
        .parse::<Unit>()
        .map(|u| u.millimeters_per_unit())
        .unwrap_or(1.0);
    let from_mm = to
        .parse::<Unit>()
        .map(|u| u.millimeters_per_unit())
        .unwrap_or(1.0);
    value * to_mm / from_mm
}
