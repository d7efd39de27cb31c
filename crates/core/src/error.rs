//! Engine error types

use crate::measurement::MeasurementId;

/// Errors surfaced by the calibration and measurement engine.
///
/// All of them are recoverable; the operation that fails leaves the previous
/// state in place.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeasureError {
    #[error("unknown reference object: {0}")]
    UnknownReference(String),

    #[error("invalid reference object: {0}")]
    InvalidReference(String),

    #[error("not calibrated: calibrate against a reference object first")]
    NotCalibrated,

    #[error("calibration points coincide (pixel distance {pixel_distance})")]
    DegenerateCalibration { pixel_distance: f64 },

    #[error("tap at ({x}, {y}) is not a usable finite position")]
    InvalidPoint { x: f64, y: f64 },

    #[error("measurement already recorded: {0}")]
    DuplicateRecord(MeasurementId),

    #[error("line width must be positive, got {0}")]
    InvalidLineWidth(f64),

    #[error("calibration has not been started")]
    CalibrationNotStarted,

    #[error("measurement has not been started")]
    MeasurementNotStarted,

    #[error("capture source is not active")]
    CaptureInactive,

    #[error("unknown unit: {0}")]
    UnknownUnit(String),
}

/// Result type for engine operations
pub type MeasureResult<T> = Result<T, MeasureError>;

/// Errors from a durable staging store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("measurement {0} holds a non-finite distance")]
    InvalidRecord(MeasurementId),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
