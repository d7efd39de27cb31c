//! Event-handling layer
//!
//! [`MeasureEngine`] owns one calibration session, one measurement session,
//! the ledger and the offline reconciler, and turns the discrete input events
//! of the host (taps, capture start/stop, connectivity changes, setting
//! changes) into state transitions and draw instructions.

use crate::calibration::{Calibration, CalibrationSession, CalibrationStep, ScaleFactor};
use crate::error::{MeasureError, MeasureResult, StoreResult};
use crate::geometry::Point;
use crate::ledger::MeasurementLedger;
use crate::measurement::{MeasurementRecord, MeasurementSession, MeasurementStep};
use crate::offline::{OfflineReconciler, ReconcileReport};
use crate::preferences::Preferences;
use crate::reference::{ReferenceCatalog, ReferenceObject};
use crate::render::{Color, LineStyle, Renderer};
use crate::store::StagingStore;
use crate::units::Unit;

/// Marker radius for calibration taps
pub const CALIBRATION_POINT_RADIUS: f64 = 8.0;
/// Marker radius for measurement taps
pub const MEASUREMENT_POINT_RADIUS: f64 = 6.0;
/// Stroke width of the calibration span
pub const CALIBRATION_LINE_WIDTH: f64 = 3.0;

/// Whether a completed measurement reached the offline stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    /// Online; nothing to stage
    NotNeeded,
    Staged,
    /// Staging failed; the record is in the ledger only
    Failed(String),
}

/// What a tap did
#[derive(Debug, Clone, PartialEq)]
pub enum TapOutcome {
    CalibrationPoint(Point),
    Calibrated(ScaleFactor),
    MeasurementPoint(Point),
    Measured {
        record: MeasurementRecord,
        stage: StageStatus,
    },
}

/// The calibration and measurement engine
pub struct MeasureEngine<S, R> {
    catalog: ReferenceCatalog,
    calibration: CalibrationSession,
    measurement: MeasurementSession,
    ledger: MeasurementLedger,
    reconciler: OfflineReconciler<S>,
    renderer: R,
    preferences: Preferences,
    line_style: LineStyle,
    capture_active: bool,
    online: bool,
}

impl<S: StagingStore, R: Renderer> MeasureEngine<S, R> {
    /// Create an engine. Starts online with the capture source inactive.
    ///
    /// Fails if the preferred reference object is not in the catalog or the
    /// preferred line width is not positive.
    pub fn new(store: S, renderer: R, preferences: Preferences) -> MeasureResult<Self> {
        let catalog = ReferenceCatalog::new();
        catalog.lookup(&preferences.reference)?;
        let line_style = preferences.line_style()?;

        Ok(Self {
            catalog,
            calibration: CalibrationSession::new(),
            measurement: MeasurementSession::new(),
            ledger: MeasurementLedger::new(),
            reconciler: OfflineReconciler::new(store),
            renderer,
            preferences,
            line_style,
            capture_active: false,
            online: true,
        })
    }

    pub fn ledger(&self) -> &MeasurementLedger {
        &self.ledger
    }

    pub fn calibration(&self) -> &CalibrationSession {
        &self.calibration
    }

    pub fn measurement(&self) -> &MeasurementSession {
        &self.measurement
    }

    pub fn reconciler(&self) -> &OfflineReconciler<S> {
        &self.reconciler
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn is_capture_active(&self) -> bool {
        self.capture_active
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Human-readable scale of the current calibration
    pub fn scale_description(&self) -> Option<String> {
        self.calibration.describe_scale()
    }

    /// The selected reference object
    pub fn current_reference(&self) -> MeasureResult<ReferenceObject> {
        self.catalog.lookup(&self.preferences.reference)
    }

    /// Capture source started or stopped.
    ///
    /// Stopping abandons any calibration or measurement in progress and clears
    /// the overlay.
    pub fn set_capture_active(&mut self, active: bool) {
        if self.capture_active == active {
            return;
        }
        self.capture_active = active;
        log::debug!("capture source {}", if active { "active" } else { "inactive" });

        if !active {
            self.calibration.cancel();
            self.measurement.cancel();
            self.renderer.clear();
        }
    }

    /// Select the reference object used by the next calibration
    pub fn select_reference(&mut self, name: &str) -> MeasureResult<()> {
        self.catalog.lookup(name)?;
        self.preferences.reference = name.to_string();
        Ok(())
    }

    /// Set the dimensions of the `custom` reference object
    pub fn set_custom_reference(&mut self, width: f64, height: f64, unit: Unit) -> MeasureResult<()> {
        self.catalog.set_custom(width, height, unit)
    }

    /// Start (or restart) calibration against the selected reference
    pub fn begin_calibration(&mut self) -> MeasureResult<()> {
        if !self.capture_active {
            return Err(MeasureError::CaptureInactive);
        }
        let reference = self.current_reference()?;
        self.measurement.cancel();
        self.calibration.begin(reference);
        Ok(())
    }

    /// Begin a measurement pair
    pub fn start_measuring(&mut self) -> MeasureResult<()> {
        self.measurement.start(&self.calibration)
    }

    /// Start or stop measuring. Returns whether a pair is now in progress.
    pub fn toggle_measuring(&mut self) -> MeasureResult<bool> {
        self.measurement.toggle(&self.calibration)
    }

    pub fn cancel_measuring(&mut self) {
        self.measurement.cancel();
    }

    /// Handle a tap on the capture surface.
    ///
    /// Taps go to calibration while it awaits a point and to the measurement
    /// session otherwise.
    pub fn tap(&mut self, point: Point) -> MeasureResult<TapOutcome> {
        if self.calibration.is_awaiting_point() {
            return self.calibration_tap(point);
        }

        let step =
            self.measurement
                .submit_point(point, &self.calibration, self.preferences.display_unit)?;
        self.renderer
            .draw_point(point, Color::MEASUREMENT_POINT, MEASUREMENT_POINT_RADIUS);

        match step {
            MeasurementStep::FirstPoint(point) => Ok(TapOutcome::MeasurementPoint(point)),
            MeasurementStep::Completed(record) => {
                draw_record(&mut self.renderer, &record, &self.line_style);
                self.ledger.append(record.clone())?;
                let stage = self.stage_if_offline(&record);
                Ok(TapOutcome::Measured { record, stage })
            }
        }
    }

    fn calibration_tap(&mut self, point: Point) -> MeasureResult<TapOutcome> {
        let step = self.calibration.submit_point(point)?;
        self.renderer
            .draw_point(point, Color::CALIBRATION_POINT, CALIBRATION_POINT_RADIUS);

        match step {
            CalibrationStep::FirstPoint(point) => Ok(TapOutcome::CalibrationPoint(point)),
            CalibrationStep::Calibrated(calibration) => {
                draw_calibration(&mut self.renderer, &calibration);
                Ok(TapOutcome::Calibrated(calibration.scale_factor()))
            }
        }
    }

    fn stage_if_offline(&self, record: &MeasurementRecord) -> StageStatus {
        if self.online {
            return StageStatus::NotNeeded;
        }
        match self.reconciler.stage(record) {
            Ok(()) => StageStatus::Staged,
            Err(e) => {
                log::warn!("could not stage measurement {} offline: {}", record.id(), e);
                StageStatus::Failed(e.to_string())
            }
        }
    }

    /// Connectivity changed.
    ///
    /// Going online merges the offline stage into the ledger and returns the
    /// report of that pass. A store failure is returned without touching the
    /// ledger; the stage is retried on the next reconnect.
    pub fn set_online(&mut self, online: bool) -> StoreResult<Option<ReconcileReport>> {
        let was_online = std::mem::replace(&mut self.online, online);
        log::debug!("connectivity: {}", if online { "online" } else { "offline" });

        if online && !was_online {
            return self.reconcile_now().map(Some);
        }
        Ok(None)
    }

    /// Merge the offline stage into the ledger now
    pub fn reconcile_now(&mut self) -> StoreResult<ReconcileReport> {
        let report = self.reconciler.reconcile(&mut self.ledger).inspect_err(|e| {
            log::warn!("offline reconciliation failed: {}", e);
        })?;
        if report.merged > 0 {
            self.redraw();
        }
        Ok(report)
    }

    /// Switch the display unit of every measurement
    pub fn set_display_unit(&mut self, unit: Unit) {
        self.preferences.display_unit = unit;
        self.ledger.recompute_display(unit);
        self.redraw();
    }

    /// Change the measurement line style
    pub fn set_line_style(&mut self, style: LineStyle) {
        self.line_style = style;
        self.preferences.line_color = style.color();
        self.preferences.line_width = style.width();
        self.redraw();
    }

    /// Remove every measurement from the ledger
    pub fn clear_measurements(&mut self) {
        self.ledger.clear();
        self.redraw();
    }

    /// Redraw the calibration span and every measurement
    pub fn redraw(&mut self) {
        self.renderer.clear();
        if let Some(calibration) = self.calibration.calibration() {
            draw_calibration(&mut self.renderer, calibration);
        }
        for record in self.ledger.all() {
            draw_record(&mut self.renderer, record, &self.line_style);
        }
    }
}

fn draw_calibration<R: Renderer>(renderer: &mut R, calibration: &Calibration) {
    let (first, second) = calibration.points();
    let reference = calibration.reference();
    renderer.draw_line(first, second, Color::CALIBRATION_LINE, CALIBRATION_LINE_WIDTH);
    renderer.draw_labeled_distance(first, second, reference.width(), reference.unit());
}

fn draw_record<R: Renderer>(renderer: &mut R, record: &MeasurementRecord, style: &LineStyle) {
    let (a, b) = record.points();
    renderer.draw_line(a, b, style.color(), style.width());
    renderer.draw_labeled_distance(a, b, record.display_distance(), record.display_unit());
}
