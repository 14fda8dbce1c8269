//! # Pending-Update Reconciler
//!
//! High-frequency interactive edits (brush strokes, drags, text typing) are
//! staged into a mirror of the layer array instead of the canonical state.
//!
//! ```text
//! interactive edit ──▶ mirror (pending = true)
//!                        │
//!      tick: interval elapsed, not drawing ──┐
//!      save / page switch / undo / structural op ──┤ flush
//!                                             ▼
//!                               LayerManager::replace_layers
//!                                             │
//!                        mirror ◀── resync ───┘
//! ```

use std::time::{Duration, Instant};

use conserva_core::{Layer, LayerId, ObjectId, SerializedObject, Shape};

/// Staging area for interactive edits awaiting reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciler {
    /// Canonical layers plus staged edits.
    mirror: Vec<Layer>,
    /// Whether the mirror holds edits not yet flushed.
    pending: bool,
    /// Minimum time between timed flushes.
    interval: Duration,
    /// When the flush timer last fired.
    last_flush: Instant,
}

impl Reconciler {
    /// Create a reconciler mirroring `layers`.
    #[must_use]
    pub fn new(layers: &[Layer], interval: Duration) -> Self {
        Self {
            mirror: layers.to_vec(),
            pending: false,
            interval,
            last_flush: Instant::now(),
        }
    }

    /// Whether staged edits are waiting.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// The mirror: canonical layers with staged edits applied.
    #[must_use]
    pub fn mirror(&self) -> &[Layer] {
        &self.mirror
    }

    /// Flush interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Stage a newly created object on a layer.
    ///
    /// Returns `false` when the layer is unknown, locked, or a reference layer.
    pub fn stage_object(&mut self, layer_id: &LayerId, object: SerializedObject) -> bool {
        let Some(layer) = self
            .mirror
            .iter_mut()
            .find(|l| &l.id == layer_id && l.is_editable())
        else {
            tracing::warn!(
                layer = %layer_id,
                kind = object.kind_name(),
                "Dropping staged object for missing or non-editable layer"
            );
            return false;
        };
        layer.objects.push(object);
        self.pending = true;
        true
    }

    /// Stage an edit to an existing object, located by identity tag.
    ///
    /// The identity tag is restored after `f` runs. Returns `false` when the
    /// object is unknown or sits on a locked or reference layer.
    pub fn stage_update<F>(&mut self, object_id: &ObjectId, f: F) -> bool
    where
        F: FnOnce(&mut SerializedObject),
    {
        for layer in &mut self.mirror {
            let Some(index) = layer.position_of(object_id) else {
                continue;
            };
            if !layer.is_editable() {
                tracing::debug!(object = %object_id, layer = %layer.id, "Ignoring edit on non-editable layer");
                return false;
            }
            let object = &mut layer.objects[index];
            f(object);
            object.object_id = object_id.clone();
            self.pending = true;
            return true;
        }
        tracing::debug!(object = %object_id, "Edited object not found in any layer");
        false
    }

    /// Stage new content for a text object.
    pub fn stage_text(&mut self, object_id: &ObjectId, text: &str) -> bool {
        let mut is_text = false;
        let staged = self.stage_update(object_id, |object| {
            if let Shape::Text { content, .. } = &mut object.shape {
                text.clone_into(content);
                is_text = true;
            }
        });
        staged && is_text
    }

    /// Timer tick.
    ///
    /// Once the interval has elapsed the timer fires: if edits are pending
    /// and no drawing gesture is in progress, the staged layers are returned
    /// for installation.
    pub fn tick(&mut self, now: Instant, drawing: bool) -> Option<Vec<Layer>> {
        if now.saturating_duration_since(self.last_flush) < self.interval {
            return None;
        }
        if drawing {
            return None;
        }
        self.last_flush = now;
        self.take()
    }

    /// Take the staged layers unconditionally, if any edits are pending.
    pub fn flush(&mut self) -> Option<Vec<Layer>> {
        self.last_flush = Instant::now();
        self.take()
    }

    /// Replace the mirror with a fresh copy of canonical state.
    ///
    /// Any staged edits not yet flushed are discarded.
    pub fn resync(&mut self, layers: &[Layer]) {
        if self.pending {
            tracing::debug!("Discarding staged edits on resync");
        }
        self.mirror = layers.to_vec();
        self.pending = false;
    }

    fn take(&mut self) -> Option<Vec<Layer>> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        tracing::debug!(layers = self.mirror.len(), "Flushing staged edits");
        Some(self.mirror.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conserva_core::Point;

    fn stroke() -> SerializedObject {
        SerializedObject::new(Shape::Path {
            points: vec![Point::new(0.0, 0.0), Point::new(4.0, 4.0)],
        })
    }

    fn text(content: &str) -> SerializedObject {
        SerializedObject::new(Shape::Text {
            position: Point::new(0.0, 0.0),
            content: content.to_string(),
            font_size: 12.0,
        })
    }

    #[test]
    fn test_stage_object_marks_pending() {
        let layer = Layer::new("A");
        let mut r = Reconciler::new(&[layer.clone()], Duration::from_millis(500));
        assert!(!r.is_pending());
        assert!(r.stage_object(&layer.id, stroke()));
        assert!(r.is_pending());
        assert_eq!(r.mirror()[0].objects.len(), 1);
    }

    #[test]
    fn test_stage_refused_on_locked_layer() {
        let mut layer = Layer::new("A");
        layer.locked = true;
        let mut r = Reconciler::new(&[layer.clone()], Duration::from_millis(500));
        assert!(!r.stage_object(&layer.id, stroke()));
        assert!(!r.is_pending());
    }

    #[test]
    fn test_stage_update_keeps_identity() {
        let obj = stroke();
        let id = obj.object_id.clone();
        let layer = Layer::new("A").with_objects(vec![obj]);
        let mut r = Reconciler::new(&[layer], Duration::from_millis(500));

        assert!(r.stage_update(&id, |o| {
            o.translate(10.0, 0.0);
            o.object_id = ObjectId::new();
        }));
        assert_eq!(r.mirror()[0].objects[0].object_id, id);
        assert!(!r.stage_update(&ObjectId::new(), |_| {}));
    }

    #[test]
    fn test_stage_text_only_for_text() {
        let label = text("old");
        let line = stroke();
        let (label_id, line_id) = (label.object_id.clone(), line.object_id.clone());
        let layer = Layer::new("A").with_objects(vec![label, line]);
        let mut r = Reconciler::new(&[layer], Duration::from_millis(500));

        assert!(r.stage_text(&label_id, "new"));
        assert!(matches!(
            &r.mirror()[0].objects[0].shape,
            Shape::Text { content, .. } if content == "new"
        ));
        assert!(!r.stage_text(&line_id, "nope"));
    }

    #[test]
    fn test_tick_waits_for_interval() {
        let layer = Layer::new("A");
        let interval = Duration::from_millis(500);
        let mut r = Reconciler::new(&[layer.clone()], interval);
        let start = r.last_flush;
        r.stage_object(&layer.id, stroke());

        assert!(r.tick(start + Duration::from_millis(100), false).is_none());
        assert!(r.is_pending());
        let flushed = r.tick(start + interval, false).expect("flushed");
        assert_eq!(flushed[0].objects.len(), 1);
        assert!(!r.is_pending());
    }

    #[test]
    fn test_tick_skips_while_drawing() {
        let layer = Layer::new("A");
        let interval = Duration::from_millis(500);
        let mut r = Reconciler::new(&[layer.clone()], interval);
        let start = r.last_flush;
        r.stage_object(&layer.id, stroke());

        assert!(r.tick(start + interval * 3, true).is_none());
        assert!(r.is_pending());
        assert!(r.tick(start + interval * 3, false).is_some());
    }

    #[test]
    fn test_flush_ignores_interval() {
        let layer = Layer::new("A");
        let mut r = Reconciler::new(&[layer.clone()], Duration::from_secs(3600));
        assert!(r.flush().is_none());
        r.stage_object(&layer.id, stroke());
        assert!(r.flush().is_some());
        assert!(r.flush().is_none());
    }

    #[test]
    fn test_resync_discards_staged() {
        let layer = Layer::new("A");
        let mut r = Reconciler::new(&[layer.clone()], Duration::from_millis(500));
        r.stage_object(&layer.id, stroke());
        r.resync(&[layer]);
        assert!(!r.is_pending());
        assert!(r.mirror()[0].objects.is_empty());
    }
}
