//! In-memory scene backend for headless hosts and tests.
//!
//! Keeps the paint order as a flat list with the background image as an
//! ordinary item, so ordering mistakes are observable.

use std::cell::Cell;
use std::collections::HashSet;

use async_trait::async_trait;
use conserva_core::{ObjectId, SerializedObject};

use super::{BackgroundImage, LiveObject, Materializer, SceneBackend};
use crate::{SceneError, SceneResult, Viewport};

#[derive(Debug, Clone, PartialEq)]
enum SceneItem {
    Background(BackgroundImage),
    Object(LiveObject),
}

/// In-memory scene.
#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    items: Vec<SceneItem>,
    drawing_mode: bool,
    viewport: Viewport,
    render_requests: u64,
}

impl MemoryScene {
    /// Create an empty scene with the given viewport size.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            ..Self::default()
        }
    }

    /// Use a preconfigured viewport.
    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Number of repaints requested so far.
    #[must_use]
    pub const fn render_requests(&self) -> u64 {
        self.render_requests
    }

    /// Whether the background is the bottom-most item (or absent).
    #[must_use]
    pub fn background_is_bottom(&self) -> bool {
        let position = self
            .items
            .iter()
            .position(|i| matches!(i, SceneItem::Background(_)));
        !matches!(position, Some(index) if index != 0)
    }

    /// Number of items including the background.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Append an object directly, bypassing layer sync.
    ///
    /// Mirrors a brush stroke the library adds on its own during free drawing.
    pub fn push_object(&mut self, object: LiveObject) {
        self.items.push(SceneItem::Object(object));
    }
}

impl SceneBackend for MemoryScene {
    fn objects(&self) -> Vec<&LiveObject> {
        self.items
            .iter()
            .filter_map(|i| match i {
                SceneItem::Object(o) => Some(o),
                SceneItem::Background(_) => None,
            })
            .collect()
    }

    fn background(&self) -> Option<&BackgroundImage> {
        self.items.iter().find_map(|i| match i {
            SceneItem::Background(b) => Some(b),
            SceneItem::Object(_) => None,
        })
    }

    fn set_background(&mut self, image: Option<BackgroundImage>) {
        self.items.retain(|i| !matches!(i, SceneItem::Background(_)));
        if let Some(image) = image {
            tracing::debug!(src = %image.src, "Background image set");
            self.items.insert(0, SceneItem::Background(image));
        }
    }

    fn remove_all_except_background(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|i| matches!(i, SceneItem::Background(_)));
        before - self.items.len()
    }

    fn add_objects(&mut self, objects: Vec<LiveObject>) {
        self.items.extend(objects.into_iter().map(SceneItem::Object));
    }

    fn send_background_to_back(&mut self) {
        if let Some(index) = self
            .items
            .iter()
            .position(|i| matches!(i, SceneItem::Background(_)))
        {
            let background = self.items.remove(index);
            self.items.insert(0, background);
        }
    }

    fn request_render(&mut self) {
        self.render_requests += 1;
        tracing::trace!(items = self.items.len(), "Repaint requested");
    }

    fn is_drawing_mode(&self) -> bool {
        self.drawing_mode
    }

    fn set_drawing_mode(&mut self, enabled: bool) {
        self.drawing_mode = enabled;
    }

    fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }
}

/// Materializer that validates geometry and builds [`LiveObject`]s.
///
/// Specific objects can be made to fail, to exercise skip-and-log paths.
#[derive(Debug, Default)]
pub struct MemoryMaterializer {
    failing: HashSet<ObjectId>,
    calls: Cell<usize>,
}

impl MemoryMaterializer {
    /// Create a materializer that only rejects invalid geometry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make materialization of the given object fail.
    #[must_use]
    pub fn failing_on(mut self, object_id: ObjectId) -> Self {
        self.failing.insert(object_id);
        self
    }

    /// Number of `enliven` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

#[async_trait(?Send)]
impl Materializer for MemoryMaterializer {
    async fn enliven(&self, object: &SerializedObject) -> SceneResult<LiveObject> {
        self.calls.set(self.calls.get() + 1);
        if self.failing.contains(&object.object_id) {
            return Err(SceneError::Materialize {
                object_id: object.object_id.to_string(),
                kind: object.kind_name(),
                reason: "rejected by materializer".to_string(),
            });
        }
        object.validate().map_err(|reason| SceneError::Materialize {
            object_id: object.object_id.to_string(),
            kind: object.kind_name(),
            reason,
        })?;
        Ok(LiveObject::from_source(object.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conserva_core::{Point, Shape};

    fn live(x: f64) -> LiveObject {
        LiveObject::from_source(SerializedObject::new(Shape::Rect {
            origin: Point::new(x, 0.0),
            width: 10.0,
            height: 10.0,
        }))
    }

    fn background() -> BackgroundImage {
        BackgroundImage {
            src: "artifact.jpg".to_string(),
            width: 800.0,
            height: 600.0,
        }
    }

    #[test]
    fn test_remove_keeps_background() {
        let mut scene = MemoryScene::new(800.0, 600.0);
        scene.set_background(Some(background()));
        scene.add_objects(vec![live(0.0), live(20.0)]);
        assert_eq!(scene.remove_all_except_background(), 2);
        assert!(scene.objects().is_empty());
        assert!(scene.background().is_some());
    }

    #[test]
    fn test_send_background_to_back() {
        let mut scene = MemoryScene::new(800.0, 600.0);
        scene.push_object(live(0.0));
        scene.items.push(SceneItem::Background(background()));
        assert!(!scene.background_is_bottom());
        scene.send_background_to_back();
        assert!(scene.background_is_bottom());
    }

    #[test]
    fn test_object_at_returns_topmost_selectable() {
        let mut scene = MemoryScene::new(800.0, 600.0);
        let bottom = live(0.0);
        let mut top = live(5.0);
        top.selectable = false;
        scene.add_objects(vec![bottom.clone(), top]);
        let hit = scene.object_at(Point::new(7.0, 5.0)).expect("hit");
        assert_eq!(hit.object_id, bottom.object_id);
        assert!(scene.object_at(Point::new(100.0, 100.0)).is_none());
    }

    #[test]
    fn test_object_at_respects_zoom() {
        let mut scene = MemoryScene::new(800.0, 600.0);
        scene.add_objects(vec![live(100.0)]);
        scene.viewport_mut().set_zoom(2.0);
        assert!(scene.object_at(Point::new(210.0, 10.0)).is_some());
        assert!(scene.object_at(Point::new(105.0, 5.0)).is_none());
    }

    #[tokio::test]
    async fn test_materializer_rejects_invalid_and_flagged() {
        let good = SerializedObject::new(Shape::Path {
            points: vec![Point::new(0.0, 0.0)],
        });
        let empty = SerializedObject::new(Shape::Path { points: vec![] });
        let flagged = good.with_fresh_id();
        let m = MemoryMaterializer::new().failing_on(flagged.object_id.clone());

        assert!(m.enliven(&good).await.is_ok());
        assert!(m.enliven(&empty).await.is_err());
        assert!(m.enliven(&flagged).await.is_err());
        assert_eq!(m.calls(), 3);
    }
}
