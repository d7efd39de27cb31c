//! Two-tap distance measurement
//!
//! A measurement is a pair of taps converted to a physical length through the
//! current calibration. Every completed pair yields one immutable
//! [`MeasurementRecord`]; only its display unit can change afterwards.

use crate::calibration::CalibrationSession;
use crate::error::{MeasureError, MeasureResult};
use crate::geometry::Point;
use crate::units::{convert, Unit};
use chrono::{DateTime, Utc};

/// Unique identifier for measurements
pub type MeasurementId = uuid::Uuid;

/// Where a record entered the ledger from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    /// Measured in this session
    Live,
    /// Staged while offline and merged back on reconnect
    RecoveredOffline,
}

/// A completed measurement
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    id: MeasurementId,
    point_a: Point,
    point_b: Point,
    pixel_distance: f64,
    #[serde(rename = "physicalDistanceInReferenceUnit")]
    physical_distance: f64,
    reference_unit: Unit,
    display_distance: f64,
    display_unit: Unit,
    created_at: DateTime<Utc>,
    origin: Origin,
}

impl MeasurementRecord {
    fn new(
        point_a: Point,
        point_b: Point,
        physical_distance: f64,
        reference_unit: Unit,
        display_unit: Unit,
    ) -> Self {
        Self {
            id: MeasurementId::new_v4(),
            point_a,
            point_b,
            pixel_distance: point_a.distance_to(&point_b),
            physical_distance,
            reference_unit,
            display_distance: convert(physical_distance, reference_unit, display_unit),
            display_unit,
            created_at: Utc::now(),
            origin: Origin::Live,
        }
    }

    pub fn id(&self) -> MeasurementId {
        self.id
    }

    /// The two measured taps
    pub fn points(&self) -> (Point, Point) {
        (self.point_a, self.point_b)
    }

    pub fn pixel_distance(&self) -> f64 {
        self.pixel_distance
    }

    /// Length in `reference_unit()`
    pub fn physical_distance(&self) -> f64 {
        self.physical_distance
    }

    /// Unit of the reference object the measurement was scaled against
    pub fn reference_unit(&self) -> Unit {
        self.reference_unit
    }

    /// Length in `display_unit()`
    pub fn display_distance(&self) -> f64 {
        self.display_distance
    }

    pub fn display_unit(&self) -> Unit {
        self.display_unit
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Formatted label, e.g. `4.25 cm`
    pub fn label(&self) -> String {
        format!("{:.2} {}", self.display_distance, self.display_unit)
    }

    /// Recompute the display length for a new display unit
    pub(crate) fn redisplay(&mut self, unit: Unit) {
        self.display_distance = convert(self.physical_distance, self.reference_unit, unit);
        self.display_unit = unit;
    }

    pub(crate) fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }
}

/// Measurement state machine
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MeasurementState {
    #[default]
    Inactive,
    AwaitingFirstPoint,
    AwaitingSecondPoint {
        first: Point,
    },
}

/// Result of a measurement tap
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementStep {
    /// First point recorded, waiting for the second
    FirstPoint(Point),
    /// Pair completed; the session is inactive again
    Completed(MeasurementRecord),
}

/// Tracks the single measurement pair in progress.
///
/// The session never stores the scale factor: it borrows the
/// [`CalibrationSession`] on every tap, so a recalibration applies to the very
/// next measurement.
#[derive(Debug, Clone, Default)]
pub struct MeasurementSession {
    state: MeasurementState,
}

impl MeasurementSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &MeasurementState {
        &self.state
    }

    /// Whether a pair is in progress
    pub fn is_active(&self) -> bool {
        !matches!(self.state, MeasurementState::Inactive)
    }

    /// Begin a new pair. Requires a completed calibration.
    pub fn start(&mut self, calibration: &CalibrationSession) -> MeasureResult<()> {
        if !calibration.is_calibrated() {
            return Err(MeasureError::NotCalibrated);
        }
        self.state = MeasurementState::AwaitingFirstPoint;
        log::debug!("measurement started");
        Ok(())
    }

    /// Start when inactive, cancel when a pair is in progress.
    ///
    /// Returns whether the session is now active.
    pub fn toggle(&mut self, calibration: &CalibrationSession) -> MeasureResult<bool> {
        if self.is_active() {
            self.cancel();
            Ok(false)
        } else {
            self.start(calibration)?;
            Ok(true)
        }
    }

    /// Drop the pair in progress without recording anything
    pub fn cancel(&mut self) {
        if self.is_active() {
            log::debug!("measurement cancelled");
        }
        self.state = MeasurementState::Inactive;
    }

    /// Record a measurement tap.
    ///
    /// The second tap reads the latest scale factor from `calibration` and
    /// returns the completed record, leaving the session inactive.
    pub fn submit_point(
        &mut self,
        point: Point,
        calibration: &CalibrationSession,
        display_unit: Unit,
    ) -> MeasureResult<MeasurementStep> {
        let scale = calibration.current_scale_factor()?;
        if matches!(self.state, MeasurementState::Inactive) {
            return Err(MeasureError::MeasurementNotStarted);
        }
        if !point.is_finite() {
            return Err(MeasureError::InvalidPoint { x: point.x, y: point.y });
        }

        match self.state {
            MeasurementState::Inactive => Err(MeasureError::MeasurementNotStarted),
            MeasurementState::AwaitingFirstPoint => {
                self.state = MeasurementState::AwaitingSecondPoint { first: point };
                Ok(MeasurementStep::FirstPoint(point))
            }
            MeasurementState::AwaitingSecondPoint { first } => {
                let pixels = first.distance_to(&point);
                // Finite endpoints can still overflow the span
                if !pixels.is_finite() {
                    return Err(MeasureError::InvalidPoint { x: point.x, y: point.y });
                }
                let record = MeasurementRecord::new(
                    first,
                    point,
                    scale.to_physical(pixels),
                    scale.unit(),
                    display_unit,
                );
                log::info!(
                    "measured {:.2}px = {} (id {})",
                    pixels,
                    record.label(),
                    record.id()
                );
                self.state = MeasurementState::Inactive;
                Ok(MeasurementStep::Completed(record))
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_record(physical: f64, unit: Unit) -> MeasurementRecord {
    MeasurementRecord::new(
        Point::new(0.0, 0.0),
        Point::new(physical * 10.0, 0.0),
        physical,
        unit,
        unit,
    )
}
