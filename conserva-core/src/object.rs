//! Serialized vector objects - the persisted form of every drawn shape.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::measure::MeasurementKind;

/// Identity tag carried by every object.
///
/// Used to correlate live-edit events (text edits, drags) back to the
/// stored object. Legacy objects without a tag receive a fresh one on load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(String);

impl ObjectId {
    /// Create a new unique object ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identity tag.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A point in scene (image pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X position (pixels from left).
    pub x: f64,
    /// Y position (pixels from top).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Whether both coordinates are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Stroke and fill attributes shared by every shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Style {
    /// Stroke color as hex.
    pub stroke: String,
    /// Fill color as hex, if filled.
    pub fill: Option<String>,
    /// Stroke width in pixels.
    pub stroke_width: f64,
    /// Object opacity (0.0 to 1.0), multiplied by the layer opacity on render.
    pub opacity: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke: "#ff0000".to_string(),
            fill: None,
            stroke_width: 2.0,
            opacity: 1.0,
        }
    }
}

/// Clamp an opacity into [0, 1]. NaN becomes fully opaque.
#[must_use]
pub fn clamp_opacity(value: f64) -> f64 {
    if value.is_nan() {
        1.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// The geometry of a drawn object, keyed by shape kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Shape {
    /// A free-hand brush stroke.
    Path {
        /// Sampled stroke points in drawing order.
        points: Vec<Point>,
    },

    /// A straight line segment.
    Line {
        /// Start point.
        from: Point,
        /// End point.
        to: Point,
    },

    /// A line with an arrow head at `to`.
    Arrow {
        /// Tail point.
        from: Point,
        /// Head point.
        to: Point,
        /// Arrow head length in pixels.
        head_size: f64,
    },

    /// An axis-aligned rectangle.
    Rect {
        /// Top-left corner.
        origin: Point,
        /// Width in pixels.
        width: f64,
        /// Height in pixels.
        height: f64,
    },

    /// An ellipse.
    Ellipse {
        /// Center point.
        center: Point,
        /// Horizontal radius.
        rx: f64,
        /// Vertical radius.
        ry: f64,
    },

    /// A text label.
    Text {
        /// Anchor (top-left) of the text box.
        position: Point,
        /// Text content.
        content: String,
        /// Font size in pixels.
        font_size: f64,
    },

    /// A committed measurement annotation.
    Measurement {
        /// What was measured.
        kind: MeasurementKind,
        /// The measured points, in click order.
        points: Vec<Point>,
        /// Rendered readout, e.g. `10.00 cm`.
        label: String,
    },
}

impl Shape {
    /// Short name of the shape kind.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Path { .. } => "path",
            Self::Line { .. } => "line",
            Self::Arrow { .. } => "arrow",
            Self::Rect { .. } => "rect",
            Self::Ellipse { .. } => "ellipse",
            Self::Text { .. } => "text",
            Self::Measurement { .. } => "measurement",
        }
    }

    fn anchor_points(&self) -> Vec<Point> {
        match self {
            Self::Path { points } | Self::Measurement { points, .. } => points.clone(),
            Self::Line { from, to } | Self::Arrow { from, to, .. } => vec![*from, *to],
            Self::Rect {
                origin,
                width,
                height,
            } => vec![*origin, origin.offset(*width, *height)],
            Self::Ellipse { center, rx, ry } => {
                vec![center.offset(-rx, -ry), center.offset(*rx, *ry)]
            }
            Self::Text {
                position,
                content,
                font_size,
            } => {
                // Rough box: 0.6em per glyph, one line high.
                #[allow(clippy::cast_precision_loss)]
                let width = content.chars().count() as f64 * font_size * 0.6;
                vec![*position, position.offset(width, *font_size)]
            }
        }
    }
}

/// One persisted vector object: identity tag, style and geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedObject {
    /// Identity tag used to correlate live edits.
    #[serde(rename = "objectId", default)]
    pub object_id: ObjectId,
    /// Stroke/fill attributes.
    #[serde(flatten)]
    pub style: Style,
    /// Geometry.
    #[serde(flatten)]
    pub shape: Shape,
}

impl SerializedObject {
    /// Create an object with a fresh identity and default style.
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        Self {
            object_id: ObjectId::new(),
            style: Style::default(),
            shape,
        }
    }

    /// Set the style.
    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Set the object opacity.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.style.opacity = opacity;
        self
    }

    /// Copy of this object under a new identity tag.
    #[must_use]
    pub fn with_fresh_id(&self) -> Self {
        Self {
            object_id: ObjectId::new(),
            ..self.clone()
        }
    }

    /// Short name of the shape kind.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        self.shape.kind_name()
    }

    /// Axis-aligned bounding box as `(min, max)` corners.
    ///
    /// Returns `None` for shapes without any points.
    #[must_use]
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let points = self.shape.anchor_points();
        let first = *points.first()?;
        let (min, max) = points.iter().fold((first, first), |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        });
        Some((min, max))
    }

    /// Move the object by the given offset.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match &mut self.shape {
            Shape::Path { points } | Shape::Measurement { points, .. } => {
                for p in points.iter_mut() {
                    *p = p.offset(dx, dy);
                }
            }
            Shape::Line { from, to } | Shape::Arrow { from, to, .. } => {
                *from = from.offset(dx, dy);
                *to = to.offset(dx, dy);
            }
            Shape::Rect { origin, .. } => *origin = origin.offset(dx, dy),
            Shape::Ellipse { center, .. } => *center = center.offset(dx, dy),
            Shape::Text { position, .. } => *position = position.offset(dx, dy),
        }
    }

    /// Check that the geometry can be drawn.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found: empty point lists,
    /// non-finite coordinates, or negative extents.
    pub fn validate(&self) -> Result<(), String> {
        let points = self.shape.anchor_points();
        if points.is_empty() {
            return Err(format!("{} {} has no points", self.kind_name(), self.object_id));
        }
        if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
            return Err(format!(
                "{} {} has non-finite point ({}, {})",
                self.kind_name(),
                self.object_id,
                bad.x,
                bad.y
            ));
        }
        match &self.shape {
            Shape::Rect { width, height, .. } if *width < 0.0 || *height < 0.0 => {
                Err(format!("rect {} has negative size", self.object_id))
            }
            Shape::Ellipse { rx, ry, .. } if *rx < 0.0 || *ry < 0.0 => {
                Err(format!("ellipse {} has negative radius", self.object_id))
            }
            _ => Ok(()),
        }
    }

    /// Check if a point is within this object's bounding box.
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        self.bounds().is_some_and(|(min, max)| {
            point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke() -> SerializedObject {
        SerializedObject::new(Shape::Path {
            points: vec![Point::new(0.0, 0.0), Point::new(10.0, 5.0), Point::new(4.0, 20.0)],
        })
    }

    #[test]
    fn test_json_uses_type_tag_and_camel_case() {
        let obj = SerializedObject::new(Shape::Text {
            position: Point::new(1.0, 2.0),
            content: "crack".to_string(),
            font_size: 14.0,
        });
        let json = serde_json::to_value(&obj).expect("serialize");
        assert_eq!(json["type"], "text");
        assert_eq!(json["fontSize"], 14.0);
        assert_eq!(json["strokeWidth"], 2.0);
        assert_eq!(json["objectId"], obj.object_id.as_str());
    }

    #[test]
    fn test_missing_object_id_and_style_get_defaults() {
        let json = r#"{"type":"line","from":{"x":0,"y":0},"to":{"x":3,"y":4}}"#;
        let obj: SerializedObject = serde_json::from_str(json).expect("parse");
        assert!(!obj.object_id.as_str().is_empty());
        assert_eq!(obj.style, Style::default());
        assert_eq!(obj.kind_name(), "line");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{"type":"hologram","objectId":"a"}"#;
        assert!(serde_json::from_str::<SerializedObject>(json).is_err());
    }

    #[test]
    fn test_bounds_and_contains() {
        let obj = stroke();
        let (min, max) = obj.bounds().expect("bounds");
        assert_eq!(min, Point::new(0.0, 0.0));
        assert_eq!(max, Point::new(10.0, 20.0));
        assert!(obj.contains_point(Point::new(5.0, 5.0)));
        assert!(!obj.contains_point(Point::new(11.0, 5.0)));
    }

    #[test]
    fn test_translate_moves_every_point() {
        let mut obj = stroke();
        obj.translate(2.0, -1.0);
        let (min, _) = obj.bounds().expect("bounds");
        assert_eq!(min, Point::new(2.0, -1.0));
    }

    #[test]
    fn test_validate_rejects_bad_geometry() {
        let empty = SerializedObject::new(Shape::Path { points: vec![] });
        assert!(empty.validate().is_err());

        let nan = SerializedObject::new(Shape::Line {
            from: Point::new(f64::NAN, 0.0),
            to: Point::new(1.0, 1.0),
        });
        assert!(nan.validate().is_err());

        let negative = SerializedObject::new(Shape::Rect {
            origin: Point::default(),
            width: -1.0,
            height: 2.0,
        });
        assert!(negative.validate().is_err());

        assert!(stroke().validate().is_ok());
        assert!(stroke().with_opacity(1.5).validate().is_ok());
    }

    #[test]
    fn test_clamp_opacity() {
        assert!((clamp_opacity(3.0) - 1.0).abs() < f64::EPSILON);
        assert!(clamp_opacity(-0.5).abs() < f64::EPSILON);
        assert!((clamp_opacity(0.25) - 0.25).abs() < f64::EPSILON);
        assert!((clamp_opacity(f64::NAN) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fresh_id_keeps_geometry() {
        let obj = stroke();
        let copy = obj.with_fresh_id();
        assert_ne!(copy.object_id, obj.object_id);
        assert_eq!(copy.shape, obj.shape);
    }
}
