//! Reference objects of known physical size
//!
//! The catalog ships the common objects a user is likely to have at hand and a
//! single user-editable `custom` entry.

use crate::error::{MeasureError, MeasureResult};
use crate::units::Unit;

/// Name of the user-editable catalog entry
pub const CUSTOM_REFERENCE: &str = "custom";

/// Default reference used when nothing else is selected
pub const DEFAULT_REFERENCE: &str = "credit-card";

/// Physical dimensions of a reference object
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceObject {
    width_physical: f64,
    height_physical: f64,
    unit: Unit,
}

impl ReferenceObject {
    /// Create a reference object. The width must be a positive, finite length.
    pub fn new(width: f64, height: f64, unit: Unit) -> MeasureResult<Self> {
        if !(width.is_finite() && width > 0.0) {
            return Err(MeasureError::InvalidReference(format!(
                "width must be positive, got {width}"
            )));
        }
        Ok(Self {
            width_physical: width,
            height_physical: height,
            unit,
        })
    }

    const fn builtin(width: f64, height: f64, unit: Unit) -> Self {
        Self {
            width_physical: width,
            height_physical: height,
            unit,
        }
    }

    /// Width in `unit()`; this is the span calibration taps are matched against
    pub fn width(&self) -> f64 {
        self.width_physical
    }

    /// Height in `unit()`
    pub fn height(&self) -> f64 {
        self.height_physical
    }

    /// Unit both dimensions are expressed in
    pub fn unit(&self) -> Unit {
        self.unit
    }
}

const BUILTIN_REFERENCES: [(&str, ReferenceObject); 3] = [
    ("credit-card", ReferenceObject::builtin(8.5, 5.4, Unit::Centimeter)),
    ("a4-paper", ReferenceObject::builtin(21.0, 29.7, Unit::Centimeter)),
    ("us-dollar", ReferenceObject::builtin(15.6, 6.6, Unit::Centimeter)),
];

/// Named reference objects
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    custom: ReferenceObject,
}

impl Default for ReferenceCatalog {
    fn default() -> Self {
        Self {
            custom: ReferenceObject::builtin(8.5, 5.4, Unit::Centimeter),
        }
    }
}

impl ReferenceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a reference object by name
    pub fn lookup(&self, name: &str) -> MeasureResult<ReferenceObject> {
        if name == CUSTOM_REFERENCE {
            return Ok(self.custom);
        }
        BUILTIN_REFERENCES
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, reference)| *reference)
            .ok_or_else(|| MeasureError::UnknownReference(name.to_string()))
    }

    /// Replace the dimensions of the `custom` entry.
    ///
    /// On error the previous custom entry is kept.
    pub fn set_custom(&mut self, width: f64, height: f64, unit: Unit) -> MeasureResult<()> {
        self.custom = ReferenceObject::new(width, height, unit)?;
        Ok(())
    }

    /// Every entry name, built-ins first and `custom` last
    pub fn names(&self) -> Vec<&'static str> {
        BUILTIN_REFERENCES
            .iter()
            .map(|(name, _)| *name)
            .chain(std::iter::once(CUSTOM_REFERENCE))
            .collect()
    }

    /// Every entry with its current dimensions
    pub fn entries(&self) -> Vec<(&'static str, ReferenceObject)> {
        let mut entries: Vec<_> = BUILTIN_REFERENCES.to_vec();
        entries.push((CUSTOM_REFERENCE, self.custom));
        entries
    }
}
