//! CamMeasure Core Library
//!
//! Calibration and measurement state engine: converts pixel distances on a
//! live camera frame into physical lengths using a reference object of known
//! size, and keeps measurements taken offline until they can be merged back.

pub mod calibration;
pub mod csv_export;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod ledger;
pub mod measurement;
pub mod offline;
pub mod preferences;
pub mod reference;
pub mod render;
pub mod store;
pub mod units;

pub use calibration::{
    Calibration, CalibrationSession, CalibrationState, CalibrationStep, ScaleFactor,
};
pub use csv_export::{export_measurements_csv, CsvExportConfig, CsvExportError};
pub use engine::{MeasureEngine, StageStatus, TapOutcome};
pub use error::{MeasureError, MeasureResult, StoreError, StoreResult};
pub use geometry::Point;
pub use ledger::MeasurementLedger;
pub use measurement::{
    MeasurementId, MeasurementRecord, MeasurementSession, MeasurementState, MeasurementStep,
    Origin,
};
pub use offline::{OfflineReconciler, ReconcileReport};
pub use preferences::{ConfigError, Preferences};
pub use reference::{ReferenceCatalog, ReferenceObject, CUSTOM_REFERENCE, DEFAULT_REFERENCE};
pub use render::{Color, DrawCommand, DrawList, LineStyle, Renderer};
pub use store::{MemoryStore, StagingStore, OFFLINE_MEASUREMENTS_KEY};
pub use units::{convert, convert_labels, Unit};
