//! # Measurement
//!
//! Point-collection state machine for distance, angle and area measurement,
//! plus the reference-line capture used by two-point calibration.
//!
//! ```text
//!            select_tool(Distance|Angle|Area|Calibrating)
//!   Idle ───────────────────────────────────────────────▶ Collecting
//!    ▲                                                        │
//!    │   distance: 2nd click      angle: 3rd click            │
//!    │   area: Enter / double-click with ≥ 3 points           │
//!    ├────────────────────── Completed ◀──────────────────────┤
//!    │   calibrating: 2nd click                               │
//!    ├────────────────────── ReferenceCaptured ◀──────────────┤
//!    │   Escape                                               │
//!    └────────────────────── Cancelled ◀──────────────────────┘
//! ```
//!
//! All geometry is computed in pixels and then scaled by the active
//! [`Calibration`].

use serde::{Deserialize, Serialize};

use crate::calibration::{Calibration, CalibrationError, Unit};
use crate::event::Key;
use crate::object::{Point, SerializedObject, Shape, Style};

/// What a measurement measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    /// Straight-line length between two points.
    Distance,
    /// Angle at a vertex between two rays.
    Angle,
    /// Enclosed area (and perimeter) of a polygon.
    Area,
}

impl MeasurementKind {
    /// Number of points that completes the measurement automatically.
    #[must_use]
    pub const fn auto_complete_at(self) -> Option<usize> {
        match self {
            Self::Distance => Some(2),
            Self::Angle => Some(3),
            Self::Area => None,
        }
    }
}

/// The active measurement tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// No measurement in progress.
    #[default]
    Idle,
    /// Collecting points for a measurement.
    Measure(MeasurementKind),
    /// Collecting a two-point reference line for calibration.
    Calibrating,
}

/// A completed measurement, ready to be committed as an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// What was measured.
    pub kind: MeasurementKind,
    /// Points in click order.
    pub points: Vec<Point>,
    /// Primary value in real units (length, degrees, or square units).
    pub value: f64,
    /// Closed-polygon perimeter in real units, for area measurements.
    pub perimeter: Option<f64>,
    /// Unit of `value` (angles are always degrees).
    pub unit: Unit,
    /// Rendered readout.
    pub label: String,
}

impl Measurement {
    /// Convert into a committed annotation object.
    #[must_use]
    pub fn into_object(self, style: Style) -> SerializedObject {
        SerializedObject::new(Shape::Measurement {
            kind: self.kind,
            points: self.points,
            label: self.label,
        })
        .with_style(style)
    }
}

/// Non-committed feedback for the current pointer position.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    /// Buffered points followed by the cursor.
    pub points: Vec<Point>,
    /// Running numeric readout, when enough points exist.
    pub readout: Option<String>,
}

/// Result of feeding input to a [`MeasureSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum MeasureOutcome {
    /// No tool was active; the input was not consumed.
    Ignored,
    /// A point was added or removed; the session is still collecting.
    Pending {
        /// Points now buffered.
        points: usize,
    },
    /// The measurement finished; the session is idle again.
    Completed(Measurement),
    /// A calibration reference line was captured; the session is idle again.
    ReferenceCaptured {
        /// Length of the reference line in pixels.
        pixel_distance: f64,
    },
    /// The session was cancelled; the session is idle again.
    Cancelled,
}

/// Transient measurement state for one editor.
#[derive(Debug, Clone, Default)]
pub struct MeasureSession {
    tool: Tool,
    points: Vec<Point>,
    calibration: Calibration,
    /// Captured reference line awaiting its known distance.
    reference: Option<f64>,
}

impl MeasureSession {
    /// Create an idle session with the given calibration.
    #[must_use]
    pub fn new(calibration: Calibration) -> Self {
        Self {
            calibration,
            ..Self::default()
        }
    }

    /// The active tool.
    #[must_use]
    pub const fn tool(&self) -> Tool {
        self.tool
    }

    /// Whether a tool is collecting points.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.tool != Tool::Idle
    }

    /// Buffered points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The active calibration.
    #[must_use]
    pub const fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Pixel length of a captured reference line awaiting its known distance.
    #[must_use]
    pub const fn pending_reference(&self) -> Option<f64> {
        self.reference
    }

    /// Switch tools, discarding any buffered points.
    pub fn select_tool(&mut self, tool: Tool) {
        tracing::debug!(?tool, discarded = self.points.len(), "Measurement tool selected");
        self.tool = tool;
        self.points.clear();
    }

    /// Replace the calibration.
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    /// Direct entry of scale and unit.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive scale; the previous calibration is kept.
    pub fn calibrate_direct(&mut self, scale: f64, unit: Unit) -> Result<Calibration, CalibrationError> {
        let calibration = Calibration::new(scale, unit)?;
        self.calibration = calibration;
        Ok(calibration)
    }

    /// Complete two-point calibration with the real length of the captured line.
    ///
    /// # Errors
    ///
    /// Returns an error if no line was captured or either distance is not
    /// positive; the previous calibration is kept. The captured line is only
    /// consumed on success so the user can retry.
    pub fn apply_known_distance(
        &mut self,
        known_distance: f64,
        unit: Unit,
    ) -> Result<Calibration, CalibrationError> {
        let pixels = self.reference.ok_or(CalibrationError::NoReferenceLine)?;
        let calibration = Calibration::from_reference(pixels, known_distance, unit)?;
        self.reference = None;
        self.calibration = calibration;
        tracing::info!(
            scale = calibration.scale(),
            unit = %calibration.unit(),
            "Calibrated from reference line"
        );
        Ok(calibration)
    }

    /// Drop a captured reference line without calibrating.
    pub fn discard_reference(&mut self) {
        self.reference = None;
    }

    /// Append a clicked point.
    pub fn click(&mut self, point: Point) -> MeasureOutcome {
        match self.tool {
            Tool::Idle => MeasureOutcome::Ignored,
            Tool::Calibrating => {
                self.points.push(point);
                if self.points.len() < 2 {
                    return MeasureOutcome::Pending { points: self.points.len() };
                }
                let pixel_distance = self.points[0].distance_to(&self.points[1]);
                self.reset();
                self.reference = Some(pixel_distance);
                tracing::debug!(pixel_distance, "Reference line captured");
                MeasureOutcome::ReferenceCaptured { pixel_distance }
            }
            Tool::Measure(kind) => {
                self.points.push(point);
                if kind.auto_complete_at() == Some(self.points.len()) {
                    self.complete(kind)
                } else {
                    MeasureOutcome::Pending { points: self.points.len() }
                }
            }
        }
    }

    /// Finish an area measurement on double-click.
    ///
    /// The click events that precede a double-click usually repeat the last
    /// point; consecutive duplicates are collapsed before counting.
    pub fn double_click(&mut self) -> MeasureOutcome {
        self.finish_area()
    }

    /// Handle a key press.
    pub fn key(&mut self, key: Key) -> MeasureOutcome {
        match (self.tool, key) {
            (Tool::Idle, _) | (_, Key::Other) => MeasureOutcome::Ignored,
            (_, Key::Escape) => {
                self.reset();
                tracing::debug!("Measurement cancelled");
                MeasureOutcome::Cancelled
            }
            (_, Key::Backspace | Key::Delete) => {
                self.points.pop();
                MeasureOutcome::Pending { points: self.points.len() }
            }
            (_, Key::Enter) => self.finish_area(),
        }
    }

    /// Live preview for the cursor position. Never commits.
    #[must_use]
    pub fn preview(&self, cursor: Point) -> Option<Preview> {
        if self.tool == Tool::Idle || self.points.is_empty() {
            return None;
        }
        let mut points = self.points.clone();
        points.push(cursor);
        let readout = match self.tool {
            Tool::Measure(MeasurementKind::Distance) | Tool::Calibrating => {
                let pixels = points[0].distance_to(&points[1]);
                Some(match self.tool {
                    Tool::Calibrating => Unit::Px.format_length(pixels),
                    _ => self.calibration.unit().format_length(self.calibration.length(pixels)),
                })
            }
            Tool::Measure(MeasurementKind::Angle) if points.len() >= 3 => {
                Some(format_angle(angle_degrees(points[0], points[1], points[2])))
            }
            Tool::Measure(MeasurementKind::Area) if points.len() >= 3 => {
                Some(self.area_label(&points).0)
            }
            _ => None,
        };
        Some(Preview { points, readout })
    }

    fn finish_area(&mut self) -> MeasureOutcome {
        if self.tool != Tool::Measure(MeasurementKind::Area) {
            return MeasureOutcome::Ignored;
        }
        let mut points = self.points.clone();
        points.dedup();
        if points.len() < 3 {
            return MeasureOutcome::Pending { points: self.points.len() };
        }
        self.points = points;
        self.complete(MeasurementKind::Area)
    }

    fn complete(&mut self, kind: MeasurementKind) -> MeasureOutcome {
        let points = std::mem::take(&mut self.points);
        let unit = self.calibration.unit();
        let measurement = match kind {
            MeasurementKind::Distance => {
                let value = self.calibration.length(points[0].distance_to(&points[1]));
                Measurement {
                    kind,
                    label: unit.format_length(value),
                    points,
                    value,
                    perimeter: None,
                    unit,
                }
            }
            MeasurementKind::Angle => {
                let value = angle_degrees(points[0], points[1], points[2]);
                Measurement {
                    kind,
                    label: format_angle(value),
                    points,
                    value,
                    perimeter: None,
                    unit,
                }
            }
            MeasurementKind::Area => {
                let (label, value, perimeter) = self.area_label(&points);
                Measurement {
                    kind,
                    label,
                    points,
                    value,
                    perimeter: Some(perimeter),
                    unit,
                }
            }
        };
        self.reset();
        tracing::debug!(?kind, label = %measurement.label, "Measurement completed");
        MeasureOutcome::Completed(measurement)
    }

    fn area_label(&self, points: &[Point]) -> (String, f64, f64) {
        let unit = self.calibration.unit();
        let area = self.calibration.area(polygon_area(points));
        let perimeter = self.calibration.length(polygon_perimeter(points));
        let label = format!(
            "{} (perimeter {})",
            unit.format_area(area),
            unit.format_length(perimeter)
        );
        (label, area, perimeter)
    }

    fn reset(&mut self) {
        self.tool = Tool::Idle;
        self.points.clear();
    }
}

/// Angle at `vertex` between the rays to `a` and `b`, in degrees within [0, 180].
#[must_use]
pub fn angle_degrees(a: Point, vertex: Point, b: Point) -> f64 {
    let first = (a.y - vertex.y).atan2(a.x - vertex.x);
    let second = (b.y - vertex.y).atan2(b.x - vertex.x);
    let raw = (first - second).abs().to_degrees();
    if raw > 180.0 {
        360.0 - raw
    } else {
        raw
    }
}

/// Shoelace area of a polygon in square pixels.
#[must_use]
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p, q)| p.x * q.y - q.x * p.y)
        .sum();
    twice.abs() / 2.0
}

/// Length of the closed polygon through `points`, in pixels.
#[must_use]
pub fn polygon_perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p, q)| p.distance_to(q))
        .sum()
}

fn format_angle(degrees: f64) -> String {
    format!("{degrees:.1}°")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> MeasureSession {
        MeasureSession::new(Calibration::pixels())
    }

    fn completed(outcome: MeasureOutcome) -> Measurement {
        match outcome {
            MeasureOutcome::Completed(m) => m,
            other => panic!("Expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn test_distance_auto_completes_at_two_points() {
        let mut s = session();
        s.select_tool(Tool::Measure(MeasurementKind::Distance));
        assert_eq!(s.click(Point::new(0.0, 0.0)), MeasureOutcome::Pending { points: 1 });
        let m = completed(s.click(Point::new(3.0, 4.0)));
        assert!((m.value - 5.0).abs() < 1e-12);
        assert_eq!(m.label, "5 px");
        assert_eq!(s.tool(), Tool::Idle);
        assert!(s.points().is_empty());
    }

    #[test]
    fn test_angle_auto_completes_at_three_points() {
        let mut s = session();
        s.select_tool(Tool::Measure(MeasurementKind::Angle));
        s.click(Point::new(1.0, 0.0));
        s.click(Point::new(0.0, 0.0));
        let m = completed(s.click(Point::new(0.0, 1.0)));
        assert!((m.value - 90.0).abs() < 1e-9);
        assert_eq!(m.label, "90.0°");
    }

    #[test]
    fn test_reflex_angle_is_folded() {
        // Raw atan2 difference is 225 degrees.
        let a = Point::new(0.0, 1.0);
        let vertex = Point::new(0.0, 0.0);
        let b = Point::new(-1.0, -1.0);
        let angle = angle_degrees(a, vertex, b);
        assert!((angle - 135.0).abs() < 1e-9);
    }

    #[test]
    fn test_area_needs_manual_completion() {
        let mut s = session();
        s.select_tool(Tool::Measure(MeasurementKind::Area));
        for p in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            assert!(matches!(
                s.click(Point::new(p.0, p.1)),
                MeasureOutcome::Pending { .. }
            ));
        }
        let m = completed(s.key(Key::Enter));
        assert!((m.value - 1.0).abs() < 1e-12);
        assert!((m.perimeter.expect("perimeter") - 4.0).abs() < 1e-12);
        assert_eq!(m.label, "1 px² (perimeter 4 px)");
    }

    #[test]
    fn test_area_with_too_few_points_stays_pending() {
        let mut s = session();
        s.select_tool(Tool::Measure(MeasurementKind::Area));
        s.click(Point::new(0.0, 0.0));
        s.click(Point::new(1.0, 0.0));
        assert_eq!(s.key(Key::Enter), MeasureOutcome::Pending { points: 2 });
        assert_eq!(s.tool(), Tool::Measure(MeasurementKind::Area));
    }

    #[test]
    fn test_refused_area_completion_keeps_points() {
        let mut s = session();
        s.select_tool(Tool::Measure(MeasurementKind::Area));
        s.click(Point::new(0.0, 0.0));
        s.click(Point::new(4.0, 0.0));
        s.click(Point::new(4.0, 0.0));
        assert_eq!(s.key(Key::Enter), MeasureOutcome::Pending { points: 3 });
        assert_eq!(s.points().len(), 3);

        // Undoing the repeated click still leaves the real second vertex.
        assert_eq!(s.key(Key::Backspace), MeasureOutcome::Pending { points: 2 });
        assert_eq!(s.points(), &[Point::new(0.0, 0.0), Point::new(4.0, 0.0)]);
    }

    #[test]
    fn test_double_click_collapses_repeated_point() {
        let mut s = session();
        s.select_tool(Tool::Measure(MeasurementKind::Area));
        s.click(Point::new(0.0, 0.0));
        s.click(Point::new(4.0, 0.0));
        s.click(Point::new(4.0, 3.0));
        s.click(Point::new(4.0, 3.0));
        let m = completed(s.double_click());
        assert_eq!(m.points.len(), 3);
        assert!((m.value - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_backspace_removes_last_point() {
        let mut s = session();
        s.select_tool(Tool::Measure(MeasurementKind::Area));
        s.click(Point::new(0.0, 0.0));
        s.click(Point::new(9.0, 9.0));
        assert_eq!(s.key(Key::Backspace), MeasureOutcome::Pending { points: 1 });
        assert_eq!(s.points(), &[Point::new(0.0, 0.0)]);
    }

    #[test]
    fn test_escape_cancels() {
        let mut s = session();
        s.select_tool(Tool::Measure(MeasurementKind::Angle));
        s.click(Point::new(0.0, 0.0));
        assert_eq!(s.key(Key::Escape), MeasureOutcome::Cancelled);
        assert_eq!(s.tool(), Tool::Idle);
        assert!(s.preview(Point::new(1.0, 1.0)).is_none());
    }

    #[test]
    fn test_idle_ignores_input() {
        let mut s = session();
        assert_eq!(s.click(Point::new(0.0, 0.0)), MeasureOutcome::Ignored);
        assert_eq!(s.key(Key::Enter), MeasureOutcome::Ignored);
    }

    #[test]
    fn test_select_tool_clears_stale_points() {
        let mut s = session();
        s.select_tool(Tool::Measure(MeasurementKind::Area));
        s.click(Point::new(0.0, 0.0));
        s.select_tool(Tool::Measure(MeasurementKind::Distance));
        assert!(s.points().is_empty());
    }

    #[test]
    fn test_preview_does_not_commit() {
        let mut s = session();
        s.select_tool(Tool::Measure(MeasurementKind::Distance));
        s.click(Point::new(0.0, 0.0));
        let preview = s.preview(Point::new(6.0, 8.0)).expect("preview");
        assert_eq!(preview.points.len(), 2);
        assert_eq!(preview.readout.as_deref(), Some("10 px"));
        assert_eq!(s.points().len(), 1);
    }

    #[test]
    fn test_two_point_calibration_then_measure() {
        let mut s = session();
        s.select_tool(Tool::Calibrating);
        s.click(Point::new(0.0, 0.0));
        let outcome = s.click(Point::new(200.0, 0.0));
        assert_eq!(
            outcome,
            MeasureOutcome::ReferenceCaptured { pixel_distance: 200.0 }
        );
        assert_eq!(s.tool(), Tool::Idle);

        let cal = s.apply_known_distance(10.0, Unit::Cm).expect("calibrate");
        assert!((cal.scale() - 0.05).abs() < 1e-12);

        s.select_tool(Tool::Measure(MeasurementKind::Distance));
        s.click(Point::new(10.0, 10.0));
        let m = completed(s.click(Point::new(10.0, 210.0)));
        assert_eq!(m.label, "10.00 cm");
    }

    #[test]
    fn test_invalid_known_distance_keeps_scale_and_reference() {
        let mut s = session();
        s.calibrate_direct(0.5, Unit::Mm).expect("direct");
        s.select_tool(Tool::Calibrating);
        s.click(Point::new(0.0, 0.0));
        s.click(Point::new(0.0, 50.0));

        assert_eq!(
            s.apply_known_distance(0.0, Unit::Cm),
            Err(CalibrationError::NonPositiveKnownDistance(0.0))
        );
        assert!((s.calibration().scale() - 0.5).abs() < 1e-12);
        assert_eq!(s.pending_reference(), Some(50.0));
    }

    #[test]
    fn test_zero_length_reference_is_rejected() {
        let mut s = session();
        s.select_tool(Tool::Calibrating);
        s.click(Point::new(5.0, 5.0));
        s.click(Point::new(5.0, 5.0));
        assert_eq!(
            s.apply_known_distance(10.0, Unit::Cm),
            Err(CalibrationError::NonPositivePixelDistance(0.0))
        );
        assert_eq!(s.calibration(), Calibration::pixels());
    }

    #[test]
    fn test_apply_without_reference_fails() {
        let mut s = session();
        assert_eq!(
            s.apply_known_distance(10.0, Unit::Cm),
            Err(CalibrationError::NoReferenceLine)
        );
    }

    #[test]
    fn test_polygon_helpers_on_degenerate_input() {
        assert!(polygon_area(&[Point::new(0.0, 0.0), Point::new(1.0, 1.0)]).abs() < f64::EPSILON);
        assert!(polygon_perimeter(&[Point::new(0.0, 0.0)]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_measurement_into_object() {
        let m = Measurement {
            kind: MeasurementKind::Distance,
            points: vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0)],
            value: 5.0,
            perimeter: None,
            unit: Unit::Px,
            label: "5 px".to_string(),
        };
        let obj = m.into_object(Style::default());
        assert_eq!(obj.kind_name(), "measurement");
        match obj.shape {
            Shape::Measurement { label, points, .. } => {
                assert_eq!(label, "5 px");
                assert_eq!(points.len(), 2);
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }
}
