//! Drawing library abstraction.
//!
//! The vector-drawing library owns the actual drawable instances. The sync
//! engine only needs to add, remove and query them, keep the background at
//! the bottom, request repaints, and know whether a free-drawing gesture is
//! in progress.

pub mod memory;

use async_trait::async_trait;
use conserva_core::{LayerId, ObjectId, Point, SerializedObject};

use crate::{SceneResult, Viewport};

/// The artifact photograph painted beneath every layer.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundImage {
    /// Image source URI.
    pub src: String,
    /// Natural width in pixels.
    pub width: f64,
    /// Natural height in pixels.
    pub height: f64,
}

/// A drawable instance materialized from a serialized object.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveObject {
    /// Identity tag copied from the source object.
    pub object_id: ObjectId,
    /// Layer the object was rendered from.
    pub layer_id: Option<LayerId>,
    /// The serialized form this instance was built from.
    pub source: SerializedObject,
    /// Effective opacity (object opacity × layer opacity).
    pub opacity: f64,
    /// Whether the object can be selected.
    pub selectable: bool,
    /// Whether the object receives pointer events.
    pub evented: bool,
}

impl LiveObject {
    /// Build an interactive instance at the object's own opacity.
    #[must_use]
    pub fn from_source(source: SerializedObject) -> Self {
        Self {
            object_id: source.object_id.clone(),
            layer_id: None,
            opacity: source.style.opacity,
            source,
            selectable: true,
            evented: true,
        }
    }

    /// Check if a scene point hits this object.
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        self.source.contains_point(point)
    }
}

/// Turns serialized objects back into live drawable instances.
///
/// Materialization may be I/O or promise bound, so it is asynchronous.
#[async_trait(?Send)]
pub trait Materializer {
    /// Reconstruct a live instance from a serialized object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be drawn.
    async fn enliven(&self, object: &SerializedObject) -> SceneResult<LiveObject>;
}

/// The live, mutable scene of the drawing library.
pub trait SceneBackend {
    /// Non-background objects in paint order.
    fn objects(&self) -> Vec<&LiveObject>;

    /// The background image, if one is set.
    fn background(&self) -> Option<&BackgroundImage>;

    /// Set or clear the background image.
    fn set_background(&mut self, image: Option<BackgroundImage>);

    /// Remove every object except the background. Returns how many were removed.
    fn remove_all_except_background(&mut self) -> usize;

    /// Append objects on top, in order.
    fn add_objects(&mut self, objects: Vec<LiveObject>);

    /// Move the background to the bottom of the paint order.
    fn send_background_to_back(&mut self);

    /// Ask the library to repaint.
    fn request_render(&mut self);

    /// Whether a free-drawing brush gesture mode is active.
    fn is_drawing_mode(&self) -> bool;

    /// Enable or disable free-drawing brush mode.
    fn set_drawing_mode(&mut self, enabled: bool);

    /// The zoom/pan transform.
    fn viewport(&self) -> &Viewport;

    /// Mutable zoom/pan transform.
    fn viewport_mut(&mut self) -> &mut Viewport;

    /// Topmost selectable object under a screen position.
    fn object_at(&self, screen: Point) -> Option<&LiveObject> {
        let scene = self.viewport().screen_to_scene(screen);
        self.objects()
            .into_iter()
            .rev()
            .find(|o| o.selectable && o.contains_point(scene))
    }
}
