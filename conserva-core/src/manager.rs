//! Layer & page management.
//!
//! [`LayerManager`] owns the canonical layer state: the current page's
//! layers, its rotation, and the stored state of every other page. All
//! object mutations go through its API so that locked/reference rules and
//! the one-layer floor hold everywhere.

use std::collections::BTreeMap;

use crate::layer::{Layer, LayerId};
use crate::object::{ObjectId, SerializedObject};
use crate::page::{Page, PageData};

/// Canonical layer and page state.
#[derive(Debug, Clone)]
pub struct LayerManager {
    /// Page currently shown.
    current_page: Page,
    /// Layers of the current page, in paint order.
    layers: Vec<Layer>,
    /// Rotation of the current page's image, in degrees.
    rotation: f64,
    /// Stored state of the pages not currently shown.
    pages: BTreeMap<Page, PageData>,
    /// Layer receiving new objects.
    active_layer: Option<LayerId>,
}

impl LayerManager {
    /// Create a manager showing `Before` with a single default layer.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(Page::Before, PageData::fresh(), BTreeMap::new())
    }

    /// Rebuild a manager from loaded state.
    ///
    /// Any entry for `current_page` inside `pages` is ignored in favor of
    /// `current`. Pages with no layers are given a default layer.
    #[must_use]
    pub fn from_parts(
        current_page: Page,
        current: PageData,
        mut pages: BTreeMap<Page, PageData>,
    ) -> Self {
        pages.remove(&current_page);
        for data in pages.values_mut() {
            if data.layers.is_empty() {
                *data = PageData {
                    rotation: data.rotation,
                    ..PageData::fresh()
                };
            }
        }
        let mut manager = Self {
            current_page,
            layers: Vec::new(),
            rotation: normalize_degrees(current.rotation),
            pages,
            active_layer: None,
        };
        manager.replace_layers(current.layers);
        manager
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Layers of the current page, in paint order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Look up a layer of the current page.
    #[must_use]
    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    /// The page currently shown.
    #[must_use]
    pub const fn current_page(&self) -> Page {
        self.current_page
    }

    /// Current image rotation in degrees, within [0, 360).
    #[must_use]
    pub const fn rotation(&self) -> f64 {
        self.rotation
    }

    /// The layer receiving new objects.
    #[must_use]
    pub fn active_layer(&self) -> Option<&Layer> {
        self.active_layer.as_ref().and_then(|id| self.layer(id))
    }

    /// ID of the layer receiving new objects.
    #[must_use]
    pub fn active_layer_id(&self) -> Option<&LayerId> {
        self.active_layer.as_ref()
    }

    /// Find an object on the current page by its identity tag.
    #[must_use]
    pub fn find_object(&self, object_id: &ObjectId) -> Option<(&Layer, &SerializedObject)> {
        self.layers.iter().find_map(|layer| {
            layer
                .objects
                .iter()
                .find(|o| &o.object_id == object_id)
                .map(|o| (layer, o))
        })
    }

    /// State of every page, including the live state of the current one.
    #[must_use]
    pub fn pages_snapshot(&self) -> BTreeMap<Page, PageData> {
        let mut pages = self.pages.clone();
        pages.insert(
            self.current_page,
            PageData {
                layers: self.layers.clone(),
                rotation: self.rotation,
            },
        );
        pages
    }

    // -----------------------------------------------------------------------
    // Layer operations
    // -----------------------------------------------------------------------

    /// Append a new empty layer on top and make it active.
    pub fn add_layer(&mut self) -> LayerId {
        let layer = Layer::new(format!("Layer {}", self.layers.len() + 1));
        let id = layer.id.clone();
        tracing::debug!(layer = %id, name = %layer.name, "Layer added");
        self.layers.push(layer);
        self.active_layer = Some(id.clone());
        id
    }

    /// Insert a copy of a layer directly above it and make the copy active.
    ///
    /// Returns the new layer's ID, or `None` for an unknown ID.
    pub fn duplicate_layer(&mut self, id: &LayerId) -> Option<LayerId> {
        let index = self.index_of(id)?;
        let copy = self.layers[index].duplicate();
        let new_id = copy.id.clone();
        self.layers.insert(index + 1, copy);
        self.active_layer = Some(new_id.clone());
        Some(new_id)
    }

    /// Delete a layer. No-op for the last remaining layer or an unknown ID.
    ///
    /// If the active layer is deleted, the first remaining layer becomes active.
    pub fn delete_layer(&mut self, id: &LayerId) -> bool {
        if self.layers.len() <= 1 {
            tracing::debug!(layer = %id, "Refusing to delete the last layer");
            return false;
        }
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.layers.remove(index);
        if self.active_layer.as_ref() == Some(id) {
            self.active_layer = self.layers.first().map(|l| l.id.clone());
        }
        tracing::debug!(layer = %id, remaining = self.layers.len(), "Layer deleted");
        true
    }

    /// Make a layer active. Returns `false` for an unknown ID.
    pub fn set_active_layer(&mut self, id: &LayerId) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        self.active_layer = Some(id.clone());
        true
    }

    /// Show or hide a layer.
    pub fn toggle_visibility(&mut self, id: &LayerId) -> bool {
        self.with_layer(id, |l| l.visible = !l.visible)
    }

    /// Lock or unlock a layer.
    pub fn toggle_lock(&mut self, id: &LayerId) -> bool {
        self.with_layer(id, |l| l.locked = !l.locked)
    }

    /// Mark or unmark a layer as a reference guide.
    pub fn toggle_reference(&mut self, id: &LayerId) -> bool {
        self.with_layer(id, |l| l.is_reference = !l.is_reference)
    }

    /// Set layer opacity, clamped to [0, 1]. NaN is ignored.
    pub fn set_opacity(&mut self, id: &LayerId, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        self.with_layer(id, |l| l.opacity = value.clamp(0.0, 1.0))
    }

    /// Rename a layer.
    pub fn rename_layer(&mut self, id: &LayerId, name: impl Into<String>) -> bool {
        let name = name.into();
        self.with_layer(id, |l| l.name = name)
    }

    /// Drag-and-drop reorder: remove `id` and insert it at `target`'s index.
    pub fn reorder(&mut self, id: &LayerId, target: &LayerId) -> bool {
        let (Some(from), Some(to)) = (self.index_of(id), self.index_of(target)) else {
            return false;
        };
        if from == to {
            return false;
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to.min(self.layers.len()), layer);
        tracing::debug!(layer = %id, from, to, "Layer reordered");
        true
    }

    /// Remove every object from a layer. Refused for locked/reference layers.
    pub fn clear_layer(&mut self, id: &LayerId) -> bool {
        let Some(layer) = self.editable_layer_mut(id) else {
            return false;
        };
        let had_objects = !layer.objects.is_empty();
        layer.objects.clear();
        had_objects
    }

    /// Install a whole layer array (history restore, staged-edit flush).
    ///
    /// An empty array is replaced by one default layer. The active layer is
    /// kept if it still exists, otherwise the first layer becomes active.
    pub fn replace_layers(&mut self, layers: Vec<Layer>) {
        self.layers = if layers.is_empty() {
            PageData::fresh().layers
        } else {
            layers
        };
        let still_present = self
            .active_layer
            .as_ref()
            .is_some_and(|id| self.index_of(id).is_some());
        if !still_present {
            self.active_layer = self.layers.first().map(|l| l.id.clone());
        }
    }

    // -----------------------------------------------------------------------
    // Object operations
    // -----------------------------------------------------------------------

    /// Append an object to a layer.
    ///
    /// Returns `false` (and drops the object) when the layer is unknown,
    /// locked, or a reference layer.
    pub fn add_object(&mut self, layer_id: &LayerId, object: SerializedObject) -> bool {
        let Some(layer) = self.editable_layer_mut(layer_id) else {
            tracing::warn!(
                layer = %layer_id,
                kind = object.kind_name(),
                "Dropping object for missing or non-editable layer"
            );
            return false;
        };
        layer.objects.push(object);
        true
    }

    /// Append an object to the active layer.
    pub fn add_to_active(&mut self, object: SerializedObject) -> bool {
        match self.active_layer.clone() {
            Some(id) => self.add_object(&id, object),
            None => false,
        }
    }

    /// Edit an object in place, located by identity tag.
    ///
    /// Refused for objects on locked/reference layers. The identity tag is
    /// restored after `f` runs.
    pub fn update_object<F>(&mut self, object_id: &ObjectId, f: F) -> bool
    where
        F: FnOnce(&mut SerializedObject),
    {
        let Some((layer, index)) = self.locate_mut(object_id) else {
            return false;
        };
        if !layer.is_editable() {
            tracing::warn!(object = %object_id, layer = %layer.id, "Refusing edit on non-editable layer");
            return false;
        }
        let object = &mut layer.objects[index];
        f(object);
        object.object_id = object_id.clone();
        true
    }

    /// Remove an object by identity tag. Refused on locked/reference layers.
    pub fn remove_object(&mut self, object_id: &ObjectId) -> bool {
        let Some((layer, index)) = self.locate_mut(object_id) else {
            return false;
        };
        if !layer.is_editable() {
            return false;
        }
        layer.objects.remove(index);
        true
    }

    // -----------------------------------------------------------------------
    // Pages and rotation
    // -----------------------------------------------------------------------

    /// Switch to another treatment page.
    ///
    /// The outgoing page's layers and rotation are stored; the incoming
    /// page's stored state (or a fresh default layer) is loaded. Returns
    /// `true` when the page changed and the scene must be re-rendered.
    pub fn switch_page(&mut self, page: Page) -> bool {
        if page == self.current_page {
            return false;
        }
        let outgoing = PageData {
            layers: std::mem::take(&mut self.layers),
            rotation: self.rotation,
        };
        self.pages.insert(self.current_page, outgoing);

        let incoming = self.pages.remove(&page).unwrap_or_else(PageData::fresh);
        tracing::info!(from = %self.current_page, to = %page, layers = incoming.layers.len(), "Page switched");
        self.current_page = page;
        self.rotation = normalize_degrees(incoming.rotation);
        self.active_layer = None;
        self.replace_layers(incoming.layers);
        true
    }

    /// Set the current page's rotation, normalized to [0, 360).
    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation = normalize_degrees(degrees);
    }

    /// Rotate the current page's image by `degrees`.
    pub fn rotate_by(&mut self, degrees: f64) {
        self.set_rotation(self.rotation + degrees);
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn index_of(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| &l.id == id)
    }

    fn with_layer(&mut self, id: &LayerId, f: impl FnOnce(&mut Layer)) -> bool {
        match self.layers.iter_mut().find(|l| &l.id == id) {
            Some(layer) => {
                f(layer);
                true
            }
            None => false,
        }
    }

    fn editable_layer_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| &l.id == id)
            .filter(|l| l.is_editable())
    }

    fn locate_mut(&mut self, object_id: &ObjectId) -> Option<(&mut Layer, usize)> {
        self.layers.iter_mut().find_map(|layer| {
            let index = layer.position_of(object_id)?;
            Some((layer, index))
        })
    }
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_degrees(degrees: f64) -> f64 {
    if degrees.is_finite() {
        degrees.rem_euclid(360.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Point, Shape};

    fn path(x: f64) -> SerializedObject {
        SerializedObject::new(Shape::Path {
            points: vec![Point::new(x, 0.0), Point::new(x + 1.0, 1.0)],
        })
    }

    fn first_id(m: &LayerManager) -> LayerId {
        m.layers()[0].id.clone()
    }

    #[test]
    fn test_new_manager_has_one_active_layer() {
        let m = LayerManager::new();
        assert_eq!(m.layers().len(), 1);
        assert_eq!(m.current_page(), Page::Before);
        assert_eq!(m.active_layer_id(), Some(&first_id(&m)));
    }

    #[test]
    fn test_add_layer_names_and_activates() {
        let mut m = LayerManager::new();
        let id = m.add_layer();
        assert_eq!(m.layers().len(), 2);
        assert_eq!(m.layer(&id).expect("layer").name, "Layer 2");
        assert_eq!(m.active_layer_id(), Some(&id));
    }

    #[test]
    fn test_delete_last_layer_is_noop() {
        let mut m = LayerManager::new();
        let id = first_id(&m);
        assert!(!m.delete_layer(&id));
        assert_eq!(m.layers().len(), 1);
    }

    #[test]
    fn test_delete_active_layer_reassigns_active() {
        let mut m = LayerManager::new();
        let first = first_id(&m);
        let second = m.add_layer();
        assert!(m.delete_layer(&second));
        assert_eq!(m.active_layer_id(), Some(&first));
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let mut m = LayerManager::new();
        let ghost = LayerId::new();
        assert!(!m.toggle_visibility(&ghost));
        assert!(!m.set_opacity(&ghost, 0.5));
        assert!(!m.rename_layer(&ghost, "x"));
        assert!(!m.reorder(&ghost, &first_id(&m)));
        m.add_layer();
        assert!(!m.delete_layer(&ghost));
        assert_eq!(m.layers().len(), 2);
    }

    #[test]
    fn test_opacity_is_clamped() {
        let mut m = LayerManager::new();
        let id = first_id(&m);
        m.set_opacity(&id, 1.7);
        assert!((m.layers()[0].opacity - 1.0).abs() < f64::EPSILON);
        m.set_opacity(&id, -0.2);
        assert!(m.layers()[0].opacity.abs() < f64::EPSILON);
        assert!(!m.set_opacity(&id, f64::NAN));
    }

    #[test]
    fn test_toggles() {
        let mut m = LayerManager::new();
        let id = first_id(&m);
        m.toggle_visibility(&id);
        m.toggle_lock(&id);
        m.toggle_reference(&id);
        let layer = &m.layers()[0];
        assert!(!layer.visible);
        assert!(layer.locked);
        assert!(layer.is_reference);
    }

    #[test]
    fn test_reorder_moves_to_target_index() {
        let mut m = LayerManager::new();
        let a = first_id(&m);
        let b = m.add_layer();
        let c = m.add_layer();

        assert!(m.reorder(&c, &a));
        let order: Vec<_> = m.layers().iter().map(|l| l.id.clone()).collect();
        assert_eq!(order, vec![c.clone(), a.clone(), b.clone()]);

        assert!(m.reorder(&c, &b));
        let order: Vec<_> = m.layers().iter().map(|l| l.id.clone()).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn test_locked_layer_rejects_objects() {
        let mut m = LayerManager::new();
        let id = first_id(&m);
        m.toggle_lock(&id);
        assert!(!m.add_to_active(path(0.0)));
        assert_eq!(m.layers()[0].object_count(), 0);
    }

    #[test]
    fn test_reference_layer_rejects_edits() {
        let mut m = LayerManager::new();
        let id = first_id(&m);
        let obj = path(0.0);
        let oid = obj.object_id.clone();
        assert!(m.add_object(&id, obj));
        m.toggle_reference(&id);
        assert!(!m.update_object(&oid, |o| o.translate(5.0, 5.0)));
        assert!(!m.remove_object(&oid));
        assert!(!m.clear_layer(&id));
        assert_eq!(m.layers()[0].object_count(), 1);
    }

    #[test]
    fn test_update_object_keeps_identity() {
        let mut m = LayerManager::new();
        let obj = path(0.0);
        let oid = obj.object_id.clone();
        m.add_to_active(obj);
        assert!(m.update_object(&oid, |o| {
            o.translate(1.0, 0.0);
            o.object_id = ObjectId::new();
        }));
        let (_, found) = m.find_object(&oid).expect("still findable");
        assert_eq!(found.bounds().expect("bounds").0, Point::new(1.0, 0.0));
    }

    #[test]
    fn test_duplicate_layer_inserts_above() {
        let mut m = LayerManager::new();
        let a = first_id(&m);
        m.add_to_active(path(0.0));
        let copy = m.duplicate_layer(&a).expect("duplicate");
        assert_eq!(m.layers()[1].id, copy);
        assert_eq!(m.layers()[1].object_count(), 1);
        assert_eq!(m.active_layer_id(), Some(&copy));
    }

    #[test]
    fn test_switch_page_round_trip_keeps_objects() {
        let mut m = LayerManager::new();
        let obj = path(3.0);
        m.add_to_active(obj.clone());
        m.set_rotation(90.0);

        assert!(m.switch_page(Page::During));
        assert_eq!(m.layers().len(), 1);
        assert_eq!(m.layers()[0].object_count(), 0);
        assert!(m.rotation().abs() < f64::EPSILON);

        assert!(m.switch_page(Page::Before));
        assert_eq!(m.layers()[0].objects, vec![obj]);
        assert!((m.rotation() - 90.0).abs() < f64::EPSILON);
        assert!(!m.switch_page(Page::Before));
    }

    #[test]
    fn test_pages_snapshot_includes_current() {
        let mut m = LayerManager::new();
        m.switch_page(Page::After);
        let pages = m.pages_snapshot();
        assert!(pages.contains_key(&Page::Before));
        assert!(pages.contains_key(&Page::After));
        assert!(!pages.contains_key(&Page::During));
    }

    #[test]
    fn test_replace_with_empty_keeps_floor() {
        let mut m = LayerManager::new();
        m.replace_layers(Vec::new());
        assert_eq!(m.layers().len(), 1);
        assert!(m.active_layer().is_some());
    }

    #[test]
    fn test_rotation_normalizes() {
        let mut m = LayerManager::new();
        m.rotate_by(-90.0);
        assert!((m.rotation() - 270.0).abs() < f64::EPSILON);
        m.rotate_by(450.0);
        assert!((m.rotation() - 0.0).abs() < f64::EPSILON);
    }
}
