//! User preferences for the measurement engine.
//!
//! Preferences can be loaded from a JSON file, from environment variables,
//! or created programmatically. Environment variables take precedence over
//! file values when both are applied.

use crate::error::MeasureResult;
use crate::reference::DEFAULT_REFERENCE;
use crate::render::{Color, LineStyle};
use crate::units::Unit;
use std::fs;
use std::io;
use std::path::Path;

/// Display unit override
pub const ENV_DISPLAY_UNIT: &str = "CAMMEASURE_DISPLAY_UNIT";
/// Measurement line color override (`#rrggbb`)
pub const ENV_LINE_COLOR: &str = "CAMMEASURE_LINE_COLOR";
/// Measurement line width override
pub const ENV_LINE_WIDTH: &str = "CAMMEASURE_LINE_WIDTH";
/// Selected reference object override
pub const ENV_REFERENCE: &str = "CAMMEASURE_REFERENCE";

/// User-facing engine settings
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    /// Unit measurements are displayed in
    pub display_unit: Unit,
    /// Measurement line color
    pub line_color: Color,
    /// Measurement line width in pixels
    pub line_width: f64,
    /// Name of the selected reference object
    pub reference: String,
}

impl Default for Preferences {
    fn default() -> Self {
        let style = LineStyle::default();
        Self {
            display_unit: Unit::Centimeter,
            line_color: style.color(),
            line_width: style.width(),
            reference: DEFAULT_REFERENCE.to_string(),
        }
    }
}

impl Preferences {
    /// Line style built from the color and width settings
    pub fn line_style(&self) -> MeasureResult<LineStyle> {
        LineStyle::new(self.line_color, self.line_width)
    }

    /// Loads preferences from a JSON file.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or holds an
    /// invalid line width.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let preferences: Preferences = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        preferences.validate()?;
        Ok(preferences)
    }

    /// Applies environment variable overrides on top of these values.
    ///
    /// Environment variables:
    /// - `CAMMEASURE_DISPLAY_UNIT`: `mm`, `cm` or `in`
    /// - `CAMMEASURE_LINE_COLOR`: `#rrggbb`
    /// - `CAMMEASURE_LINE_WIDTH`: positive number of pixels
    /// - `CAMMEASURE_REFERENCE`: reference object name
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(val) = std::env::var(ENV_DISPLAY_UNIT) {
            self.display_unit = val
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_DISPLAY_UNIT.to_string()))?;
        }

        if let Ok(val) = std::env::var(ENV_LINE_COLOR) {
            self.line_color = val
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_LINE_COLOR.to_string()))?;
        }

        if let Ok(val) = std::env::var(ENV_LINE_WIDTH) {
            self.line_width = val
                .parse::<f64>()
                .ok()
                .filter(|width| width.is_finite() && *width > 0.0)
                .ok_or_else(|| ConfigError::InvalidValue(ENV_LINE_WIDTH.to_string()))?;
        }

        if let Ok(val) = std::env::var(ENV_REFERENCE) {
            if val.trim().is_empty() {
                return Err(ConfigError::InvalidValue(ENV_REFERENCE.to_string()));
            }
            self.reference = val.trim().to_string();
        }

        Ok(self)
    }

    /// Checks values serde cannot express constraints for
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.line_width.is_finite() && self.line_width > 0.0) {
            return Err(ConfigError::InvalidValue("lineWidth".to_string()));
        }
        if self.reference.trim().is_empty() {
            return Err(ConfigError::InvalidValue("reference".to_string()));
        }
        Ok(())
    }
}

/// Errors that can occur when loading preferences
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
