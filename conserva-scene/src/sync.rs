//! # Scene Synchronization
//!
//! Projects the canonical layer array onto the live scene by full rebuild.
//!
//! A render runs in three steps so that the asynchronous part never holds
//! the scene:
//!
//! ```text
//! begin()        snapshot layers, assign generation   (deferred while drawing)
//! materialize()  enliven every visible object          (async, no scene access)
//! apply()        clear non-background, insert, background to back, repaint
//! ```
//!
//! Generations make overlapping renders safe: every pass runs to completion,
//! but a pass older than the last applied one is discarded on apply.

use conserva_core::{clamp_opacity, Layer};
use futures::future::join_all;

use crate::backend::{LiveObject, Materializer, SceneBackend};

/// A layer snapshot waiting to be materialized.
#[derive(Debug, Clone)]
pub struct RenderPass {
    generation: u64,
    layers: Vec<Layer>,
}

/// Live objects built from a [`RenderPass`], ready to apply.
#[derive(Debug, Clone)]
pub struct MaterializedPass {
    generation: u64,
    objects: Vec<LiveObject>,
    skipped: usize,
}

/// What a render did to the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// A drawing gesture is in progress; the render is owed.
    Deferred,
    /// The scene was rebuilt.
    Applied {
        /// Generation of the applied pass.
        generation: u64,
        /// Objects inserted.
        rendered: usize,
        /// Objects that failed to materialize and were skipped.
        skipped: usize,
    },
    /// A newer pass was already applied; this one was discarded.
    Superseded {
        /// Generation of the discarded pass.
        generation: u64,
    },
}

impl RenderPass {
    /// Generation number of this pass.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Enliven every object of every visible layer, in paint order.
    ///
    /// Effective opacity is `object opacity × layer opacity`; objects on
    /// locked or reference layers are neither selectable nor evented.
    /// Objects that fail to materialize are logged and skipped.
    pub async fn materialize<M>(self, materializer: &M) -> MaterializedPass
    where
        M: Materializer + ?Sized,
    {
        let jobs = self
            .layers
            .iter()
            .filter(|layer| layer.visible)
            .flat_map(|layer| layer.objects.iter().map(move |object| (layer, object)))
            .map(|(layer, object)| async move {
                (layer, materializer.enliven(object).await)
            });
        let results = join_all(jobs).await;

        let mut objects = Vec::with_capacity(results.len());
        let mut skipped = 0;
        for (layer, result) in results {
            match result {
                Ok(mut live) => {
                    let interactive = layer.is_interactive();
                    live.opacity =
                        clamp_opacity(live.source.style.opacity) * clamp_opacity(layer.opacity);
                    live.selectable = interactive;
                    live.evented = interactive;
                    live.layer_id = Some(layer.id.clone());
                    objects.push(live);
                }
                Err(e) => {
                    tracing::warn!(layer = %layer.id, error = %e, "Skipping object that failed to materialize");
                    skipped += 1;
                }
            }
        }

        MaterializedPass {
            generation: self.generation,
            objects,
            skipped,
        }
    }
}

impl MaterializedPass {
    /// Generation number of the pass this was built from.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Materialized objects in paint order.
    #[must_use]
    pub fn objects(&self) -> &[LiveObject] {
        &self.objects
    }

    /// Number of objects skipped.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Scene synchronization engine.
#[derive(Debug, Default)]
pub struct SceneSync {
    /// Generation of the most recently begun pass.
    latest: u64,
    /// Generation of the most recently applied pass.
    applied: u64,
    /// A render was skipped because a drawing gesture was in progress.
    render_owed: bool,
}

impl SceneSync {
    /// Create an engine that has rendered nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a render from a snapshot of `layers`.
    ///
    /// Returns `None` and marks a render owed while the scene is in
    /// free-drawing mode.
    pub fn begin<B>(&mut self, backend: &B, layers: &[Layer]) -> Option<RenderPass>
    where
        B: SceneBackend + ?Sized,
    {
        if backend.is_drawing_mode() {
            tracing::debug!("Render deferred during drawing gesture");
            self.render_owed = true;
            return None;
        }
        self.latest += 1;
        Some(RenderPass {
            generation: self.latest,
            layers: layers.to_vec(),
        })
    }

    /// Rebuild the scene from a materialized pass.
    pub fn apply<B>(&mut self, backend: &mut B, pass: MaterializedPass) -> RenderOutcome
    where
        B: SceneBackend + ?Sized,
    {
        if pass.generation <= self.applied {
            tracing::debug!(
                generation = pass.generation,
                applied = self.applied,
                "Discarding superseded render"
            );
            return RenderOutcome::Superseded {
                generation: pass.generation,
            };
        }
        if backend.is_drawing_mode() {
            self.render_owed = true;
            return RenderOutcome::Deferred;
        }

        let removed = backend.remove_all_except_background();
        let rendered = pass.objects.len();
        backend.add_objects(pass.objects);
        backend.send_background_to_back();
        backend.request_render();

        self.applied = pass.generation;
        if pass.generation == self.latest {
            self.render_owed = false;
        }
        tracing::debug!(
            generation = pass.generation,
            removed,
            rendered,
            skipped = pass.skipped,
            "Scene rebuilt"
        );
        RenderOutcome::Applied {
            generation: pass.generation,
            rendered,
            skipped: pass.skipped,
        }
    }

    /// Begin, materialize and apply in one call.
    pub async fn render_layers_to_scene<B, M>(
        &mut self,
        backend: &mut B,
        materializer: &M,
        layers: &[Layer],
    ) -> RenderOutcome
    where
        B: SceneBackend + ?Sized,
        M: Materializer + ?Sized,
    {
        let Some(pass) = self.begin(backend, layers) else {
            return RenderOutcome::Deferred;
        };
        let pass = pass.materialize(materializer).await;
        self.apply(backend, pass)
    }

    /// Whether a render was deferred and not yet made up.
    #[must_use]
    pub const fn is_render_owed(&self) -> bool {
        self.render_owed
    }

    /// Clear and return the owed flag.
    pub fn take_render_owed(&mut self) -> bool {
        std::mem::take(&mut self.render_owed)
    }

    /// Generation of the most recently applied pass (0 before any render).
    #[must_use]
    pub const fn applied_generation(&self) -> u64 {
        self.applied
    }
}
