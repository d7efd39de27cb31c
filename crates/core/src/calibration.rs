//! Two-tap scale calibration
//!
//! The user taps both ends of the reference object's width. The ratio of the
//! known width to the tapped pixel span becomes the scale factor used by every
//! later measurement.
//!
//! Only the reference width is used. The height plays no part, so a reference
//! photographed at an angle calibrates against its horizontal span alone.

use crate::error::{MeasureError, MeasureResult};
use crate::geometry::Point;
use crate::reference::ReferenceObject;
use crate::units::{convert, Unit};

/// Pixel spans at or below this are treated as coincident taps
pub const MIN_CALIBRATION_PIXELS: f64 = 1e-6;

/// Physical length per pixel, in the unit of the reference it came from
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleFactor {
    per_pixel: f64,
    unit: Unit,
}

impl ScaleFactor {
    /// Physical units per pixel
    pub fn per_pixel(&self) -> f64 {
        self.per_pixel
    }

    /// Unit of `per_pixel`
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Convert a pixel span to a physical length in `unit()`
    pub fn to_physical(&self, pixels: f64) -> f64 {
        pixels * self.per_pixel
    }
}

/// A completed calibration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    reference: ReferenceObject,
    first: Point,
    second: Point,
    pixel_distance: f64,
    scale: ScaleFactor,
}

impl Calibration {
    fn from_points(reference: ReferenceObject, first: Point, second: Point) -> MeasureResult<Self> {
        let pixel_distance = first.distance_to(&second);
        // Overflowing spans would give a zero scale
        if !(pixel_distance > MIN_CALIBRATION_PIXELS && pixel_distance.is_finite()) {
            return Err(MeasureError::DegenerateCalibration { pixel_distance });
        }

        Ok(Self {
            reference,
            first,
            second,
            pixel_distance,
            scale: ScaleFactor {
                per_pixel: reference.width() / pixel_distance,
                unit: reference.unit(),
            },
        })
    }

    pub fn reference(&self) -> &ReferenceObject {
        &self.reference
    }

    /// The two calibration taps
    pub fn points(&self) -> (Point, Point) {
        (self.first, self.second)
    }

    pub fn pixel_distance(&self) -> f64 {
        self.pixel_distance
    }

    pub fn scale_factor(&self) -> ScaleFactor {
        self.scale
    }
}

/// Calibration state machine
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CalibrationState {
    #[default]
    Idle,
    AwaitingFirstPoint {
        reference: ReferenceObject,
    },
    AwaitingSecondPoint {
        reference: ReferenceObject,
        first: Point,
    },
    Calibrated(Calibration),
}

/// Result of a calibration tap
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStep {
    /// First point recorded, waiting for the second
    FirstPoint(Point),
    /// Both points recorded and the scale factor derived
    Calibrated(Calibration),
}

/// Owns the calibration taps and the derived scale factor
#[derive(Debug, Clone, Default)]
pub struct CalibrationSession {
    state: CalibrationState,
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    /// Start (or restart) calibration against `reference`.
    ///
    /// Any previous calibration is discarded. The caller is responsible for
    /// checking that a capture source is active.
    pub fn begin(&mut self, reference: ReferenceObject) {
        log::debug!(
            "calibration started against {} {} reference",
            reference.width(),
            reference.unit()
        );
        self.state = CalibrationState::AwaitingFirstPoint { reference };
    }

    /// Record a calibration tap
    pub fn submit_point(&mut self, point: Point) -> MeasureResult<CalibrationStep> {
        if self.is_awaiting_point() && !point.is_finite() {
            return Err(MeasureError::InvalidPoint { x: point.x, y: point.y });
        }

        match self.state {
            CalibrationState::AwaitingFirstPoint { reference } => {
                self.state = CalibrationState::AwaitingSecondPoint {
                    reference,
                    first: point,
                };
                Ok(CalibrationStep::FirstPoint(point))
            }
            CalibrationState::AwaitingSecondPoint { reference, first } => {
                let calibration = Calibration::from_points(reference, first, point)?;
                log::info!(
                    "calibrated: {:.3}px span = {} {}, scale {:.6} {}/px",
                    calibration.pixel_distance,
                    reference.width(),
                    reference.unit(),
                    calibration.scale.per_pixel,
                    calibration.scale.unit
                );
                self.state = CalibrationState::Calibrated(calibration);
                Ok(CalibrationStep::Calibrated(calibration))
            }
            CalibrationState::Idle | CalibrationState::Calibrated(_) => {
                Err(MeasureError::CalibrationNotStarted)
            }
        }
    }

    /// Abandon an in-progress calibration. A completed calibration is kept.
    pub fn cancel(&mut self) {
        if self.is_awaiting_point() {
            self.state = CalibrationState::Idle;
        }
    }

    /// Whether a tap would be consumed by calibration
    pub fn is_awaiting_point(&self) -> bool {
        matches!(
            self.state,
            CalibrationState::AwaitingFirstPoint { .. } | CalibrationState::AwaitingSecondPoint { .. }
        )
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrated(_))
    }

    /// The completed calibration, if any
    pub fn calibration(&self) -> Option<&Calibration> {
        match &self.state {
            CalibrationState::Calibrated(calibration) => Some(calibration),
            _ => None,
        }
    }

    /// The current scale factor
    pub fn current_scale_factor(&self) -> MeasureResult<ScaleFactor> {
        self.calibration()
            .map(Calibration::scale_factor)
            .ok_or(MeasureError::NotCalibrated)
    }

    /// Human-readable scale, e.g. `1px = 0.850mm`
    pub fn describe_scale(&self) -> Option<String> {
        self.calibration().map(|calibration| {
            let scale = calibration.scale_factor();
            let millimeters = convert(scale.per_pixel(), scale.unit(), Unit::Millimeter);
            format!("1px = {millimeters:.3}mm")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn width_reference(width: f64) -> ReferenceObject {
        ReferenceObject::new(width, 5.4, Unit::Centimeter).unwrap()
    }

    fn calibrated(width: f64, first: Point, second: Point) -> CalibrationSession {
        let mut session = CalibrationSession::new();
        session.begin(width_reference(width));
        session.submit_point(first).unwrap();
        session.submit_point(second).unwrap();
        session
    }

    #[test]
    fn test_two_tap_calibration() {
        let mut session = CalibrationSession::new();
        session.begin(width_reference(8.5));

        let step = session.submit_point(Point::new(0.0, 0.0)).unwrap();
        assert_eq!(step, CalibrationStep::FirstPoint(Point::new(0.0, 0.0)));
        assert!(!session.is_calibrated());
        assert_eq!(session.current_scale_factor(), Err(MeasureError::NotCalibrated));

        let step = session.submit_point(Point::new(100.0, 0.0)).unwrap();
        let CalibrationStep::Calibrated(calibration) = step else {
            panic!("second tap should complete calibration");
        };
        assert_eq!(calibration.pixel_distance(), 100.0);

        let scale = session.current_scale_factor().unwrap();
        assert!((scale.per_pixel() - 0.085).abs() < 1e-12);
        assert_eq!(scale.unit(), Unit::Centimeter);
    }

    #[test]
    fn test_diagonal_calibration_uses_euclidean_span() {
        let session = calibrated(10.0, Point::new(0.0, 0.0), Point::new(30.0, 40.0));
        let scale = session.current_scale_factor().unwrap();
        assert!((scale.per_pixel() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_coincident_points_are_rejected() {
        let mut session = CalibrationSession::new();
        session.begin(width_reference(8.5));
        session.submit_point(Point::new(42.0, 42.0)).unwrap();

        let result = session.submit_point(Point::new(42.0, 42.0));
        assert_eq!(
            result,
            Err(MeasureError::DegenerateCalibration { pixel_distance: 0.0 })
        );
        assert_eq!(session.current_scale_factor(), Err(MeasureError::NotCalibrated));

        // First tap is kept; a distinct second tap completes calibration
        assert!(matches!(
            session.state(),
            CalibrationState::AwaitingSecondPoint { first, .. } if *first == Point::new(42.0, 42.0)
        ));
        session.submit_point(Point::new(142.0, 42.0)).unwrap();
        assert!(session.is_calibrated());
    }

    #[test]
    fn test_non_finite_points_are_rejected() {
        let mut session = CalibrationSession::new();
        session.begin(width_reference(8.5));
        assert!(matches!(
            session.submit_point(Point::new(f64::NAN, 0.0)),
            Err(MeasureError::InvalidPoint { .. })
        ));
        assert!(matches!(session.state(), CalibrationState::AwaitingFirstPoint { .. }));

        session.submit_point(Point::new(0.0, 0.0)).unwrap();
        assert!(matches!(
            session.submit_point(Point::new(0.0, f64::INFINITY)),
            Err(MeasureError::InvalidPoint { .. })
        ));
        assert!(!session.is_calibrated());
    }

    #[test]
    fn test_overflowing_span_is_degenerate() {
        let mut session = CalibrationSession::new();
        session.begin(width_reference(8.5));
        session.submit_point(Point::new(-1e308, 0.0)).unwrap();
        assert!(matches!(
            session.submit_point(Point::new(1e308, 0.0)),
            Err(MeasureError::DegenerateCalibration { .. })
        ));
        assert!(session.is_awaiting_point());
    }

    #[test]
    fn test_submit_without_begin() {
        let mut session = CalibrationSession::new();
        assert_eq!(
            session.submit_point(Point::new(1.0, 1.0)),
            Err(MeasureError::CalibrationNotStarted)
        );
        assert_eq!(session.state(), &CalibrationState::Idle);
    }

    #[test]
    fn test_submit_after_calibrated() {
        let mut session = calibrated(8.5, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert_eq!(
            session.submit_point(Point::new(5.0, 5.0)),
            Err(MeasureError::CalibrationNotStarted)
        );
        assert!(session.is_calibrated());
    }

    #[test]
    fn test_restart_discards_previous_calibration() {
        let mut session = calibrated(8.5, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        session.begin(width_reference(21.0));

        assert!(!session.is_calibrated());
        assert!(session.is_awaiting_point());
        assert_eq!(session.current_scale_factor(), Err(MeasureError::NotCalibrated));

        session.submit_point(Point::new(0.0, 0.0)).unwrap();
        session.begin(width_reference(21.0));
        assert!(matches!(
            session.state(),
            CalibrationState::AwaitingFirstPoint { .. }
        ));
    }

    #[test]
    fn test_cancel() {
        let mut session = CalibrationSession::new();
        session.begin(width_reference(8.5));
        session.submit_point(Point::new(0.0, 0.0)).unwrap();
        session.cancel();
        assert_eq!(session.state(), &CalibrationState::Idle);

        let mut done = calibrated(8.5, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        done.cancel();
        assert!(done.is_calibrated());
    }

    #[test]
    fn test_describe_scale() {
        let session = calibrated(8.5, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert_eq!(session.describe_scale().as_deref(), Some("1px = 0.850mm"));
        assert_eq!(CalibrationSession::new().describe_scale(), None);
    }
}
