//! # Editor Session
//!
//! [`Editor`] ties the annotation model to a live scene for one artifact:
//!
//! ```text
//!   pointer / key ──▶ MeasureSession ──(completed)──┐
//!   library events ─▶ Reconciler (staged) ──flush───┤
//!   layer panel ────────────────────────────────────┤
//!                                                    ▼
//!                         History ◀─ snapshot ─ LayerManager
//!                                                    │ render
//!                                                    ▼
//!                                   SceneSync ──▶ SceneBackend
//! ```
//!
//! Every structural change flushes staged edits first, records the
//! pre-change layers in [`History`], and marks the scene for a rebuild.
//! Toggles, opacity and renames are not recorded.

use std::time::Instant;

use conserva_core::{
    AnnotationDocument, Calibration, CalibrationPreset, History, Key, Layer, LayerId,
    LayerManager, MeasureOutcome, MeasureSession, Measurement, ObjectId, Page, Point,
    PointerButton, PointerEvent, PointerPhase, Preview, SerializedObject, Style, Tool, Unit,
};
use conserva_scene::{BackgroundImage, Materializer, RenderOutcome, SceneBackend, SceneSync};

use crate::config::EditorConfig;
use crate::error::{EditorError, EditorResult};
use crate::pending::Reconciler;
use crate::rotation::{RotationRequest, RotationService};
use crate::store::AnnotationStore;

/// An annotation editing session for one artifact.
#[derive(Debug)]
pub struct Editor<B, M> {
    artifact_id: String,
    config: EditorConfig,
    manager: LayerManager,
    history: History,
    session: MeasureSession,
    reconciler: Reconciler,
    sync: SceneSync,
    backend: B,
    materializer: M,
    measurement_style: Style,
    cursor: Option<Point>,
    render_needed: bool,
}

impl<B, M> Editor<B, M>
where
    B: SceneBackend,
    M: Materializer,
{
    /// Start a session with one empty layer on the `Before` page.
    #[must_use]
    pub fn new(
        artifact_id: impl Into<String>,
        mut backend: B,
        materializer: M,
        config: EditorConfig,
    ) -> Self {
        let (min_zoom, max_zoom) = config.zoom_limits;
        let viewport = backend.viewport().with_zoom_limits(min_zoom, max_zoom);
        *backend.viewport_mut() = viewport;

        let manager = LayerManager::new();
        Self {
            artifact_id: artifact_id.into(),
            history: History::with_limit(config.history_limit),
            session: MeasureSession::new(config.calibration()),
            reconciler: Reconciler::new(manager.layers(), config.flush_interval),
            sync: SceneSync::new(),
            manager,
            backend,
            materializer,
            measurement_style: Style::default(),
            cursor: None,
            render_needed: true,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Artifact this session annotates.
    #[must_use]
    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Canonical layer and page state.
    #[must_use]
    pub const fn manager(&self) -> &LayerManager {
        &self.manager
    }

    /// Canonical layers of the current page.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        self.manager.layers()
    }

    /// Canonical layers with staged interactive edits applied.
    #[must_use]
    pub fn staged_layers(&self) -> &[Layer] {
        self.reconciler.mirror()
    }

    /// Whether interactive edits are waiting to be flushed.
    #[must_use]
    pub const fn has_pending_edits(&self) -> bool {
        self.reconciler.is_pending()
    }

    /// Undo/redo history of the current page.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Measurement state.
    #[must_use]
    pub const fn measure_session(&self) -> &MeasureSession {
        &self.session
    }

    /// The live scene.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the live scene, e.g. for zoom and pan.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Whether canonical state changed since the last render.
    #[must_use]
    pub const fn is_render_needed(&self) -> bool {
        self.render_needed
    }

    /// The page currently shown.
    #[must_use]
    pub const fn current_page(&self) -> Page {
        self.manager.current_page()
    }

    /// Visual rotation of the current page's image, in degrees.
    #[must_use]
    pub const fn rotation(&self) -> f64 {
        self.manager.rotation()
    }

    /// Set or replace the artifact photograph.
    pub fn set_background(&mut self, image: BackgroundImage) {
        self.backend.set_background(Some(image));
        self.backend.send_background_to_back();
        self.backend.request_render();
    }

    /// Style applied to committed measurement annotations.
    pub fn set_measurement_style(&mut self, style: Style) {
        self.measurement_style = style;
    }

    // -----------------------------------------------------------------------
    // Layer operations
    // -----------------------------------------------------------------------

    /// Append a new empty layer on top and make it active.
    pub fn add_layer(&mut self) -> LayerId {
        self.flush();
        self.history.snapshot(self.manager.layers());
        let id = self.manager.add_layer();
        self.canonical_changed();
        id
    }

    /// Copy a layer directly above itself.
    pub fn duplicate_layer(&mut self, id: &LayerId) -> Option<LayerId> {
        self.edit(true, |m| m.duplicate_layer(id))
    }

    /// Delete a layer. Refused for the last remaining layer.
    pub fn delete_layer(&mut self, id: &LayerId) -> bool {
        self.edit(true, |m| m.delete_layer(id).then_some(())).is_some()
    }

    /// Remove every object from an editable layer.
    pub fn clear_layer(&mut self, id: &LayerId) -> bool {
        self.edit(true, |m| m.clear_layer(id).then_some(())).is_some()
    }

    /// Move a layer to another layer's position.
    pub fn reorder_layer(&mut self, id: &LayerId, target: &LayerId) -> bool {
        self.edit(true, |m| m.reorder(id, target).then_some(())).is_some()
    }

    /// Delete an object from an editable layer.
    pub fn remove_object(&mut self, object_id: &ObjectId) -> bool {
        self.edit(true, |m| m.remove_object(object_id).then_some(()))
            .is_some()
    }

    /// Show or hide a layer.
    pub fn toggle_visibility(&mut self, id: &LayerId) -> bool {
        self.edit(false, |m| m.toggle_visibility(id).then_some(()))
            .is_some()
    }

    /// Lock or unlock a layer.
    pub fn toggle_lock(&mut self, id: &LayerId) -> bool {
        self.edit(false, |m| m.toggle_lock(id).then_some(())).is_some()
    }

    /// Mark or unmark a layer as a reference guide.
    pub fn toggle_reference(&mut self, id: &LayerId) -> bool {
        self.edit(false, |m| m.toggle_reference(id).then_some(()))
            .is_some()
    }

    /// Set a layer's opacity, clamped to [0, 1].
    pub fn set_layer_opacity(&mut self, id: &LayerId, opacity: f64) -> bool {
        self.edit(false, |m| m.set_opacity(id, opacity).then_some(()))
            .is_some()
    }

    /// Rename a layer.
    pub fn rename_layer(&mut self, id: &LayerId, name: impl Into<String>) -> bool {
        let name = name.into();
        self.edit(false, |m| m.rename_layer(id, name).then_some(()))
            .is_some()
    }

    /// Choose the layer that receives new strokes and measurements.
    pub fn set_active_layer(&mut self, id: &LayerId) -> bool {
        self.manager.set_active_layer(id)
    }

    // -----------------------------------------------------------------------
    // Interactive edits
    // -----------------------------------------------------------------------

    /// Enter or leave free-drawing brush mode.
    ///
    /// Leaving it makes up any render that was deferred during the gesture.
    pub fn set_drawing_mode(&mut self, enabled: bool) {
        if enabled && self.session.is_active() {
            self.session.select_tool(Tool::Idle);
            self.cursor = None;
        }
        self.backend.set_drawing_mode(enabled);
        if !enabled && self.sync.take_render_owed() {
            self.render_needed = true;
        }
    }

    /// The drawing library finished a brush stroke.
    ///
    /// The stroke is staged on the active layer. Strokes on a locked or
    /// reference layer are dropped and the scene is marked for a rebuild.
    pub fn on_path_created(&mut self, object: SerializedObject) -> bool {
        let staged = match self.manager.active_layer_id().cloned() {
            Some(layer_id) => self.reconciler.stage_object(&layer_id, object),
            None => false,
        };
        if !staged {
            self.render_needed = true;
        }
        staged
    }

    /// An object was moved, scaled or restyled in the scene.
    pub fn on_object_modified(&mut self, object: SerializedObject) -> bool {
        let object_id = object.object_id.clone();
        let staged = self.reconciler.stage_update(&object_id, |o| *o = object);
        if !staged {
            self.render_needed = true;
        }
        staged
    }

    /// A text object's content was edited in place.
    pub fn on_text_edited(&mut self, object_id: &ObjectId, text: &str) -> bool {
        let staged = self.reconciler.stage_text(object_id, text);
        if !staged {
            self.render_needed = true;
        }
        staged
    }

    /// Drive the flush timer. Returns whether staged edits were installed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.reconciler.tick(now, self.backend.is_drawing_mode()) {
            Some(layers) => {
                self.install_staged(layers);
                true
            }
            None => false,
        }
    }

    /// Install staged edits now. Returns whether any were pending.
    pub fn flush(&mut self) -> bool {
        match self.reconciler.flush() {
            Some(layers) => {
                self.install_staged(layers);
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Measurement
    // -----------------------------------------------------------------------

    /// Choose a measurement tool, discarding any buffered points.
    pub fn select_tool(&mut self, tool: Tool) {
        if tool != Tool::Idle && self.backend.is_drawing_mode() {
            self.set_drawing_mode(false);
        }
        self.session.select_tool(tool);
        self.cursor = None;
    }

    /// The active measurement tool.
    #[must_use]
    pub const fn tool(&self) -> Tool {
        self.session.tool()
    }

    /// Route a pointer event to the measurement session.
    ///
    /// Positions are converted from screen to image coordinates first.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> MeasureOutcome {
        let point = self.backend.viewport().screen_to_scene(event.position);
        let outcome = match event.phase {
            PointerPhase::Move => {
                self.cursor = Some(point);
                return MeasureOutcome::Ignored;
            }
            PointerPhase::Down if event.button == PointerButton::Primary => {
                self.session.click(point)
            }
            PointerPhase::DoubleClick => self.session.double_click(),
            PointerPhase::Down | PointerPhase::Up => MeasureOutcome::Ignored,
        };
        self.resolve(outcome)
    }

    /// Route a key press to the measurement session.
    pub fn handle_key(&mut self, key: Key) -> MeasureOutcome {
        let outcome = self.session.key(key);
        self.resolve(outcome)
    }

    /// Live measurement feedback at the last pointer position.
    #[must_use]
    pub fn preview(&self) -> Option<Preview> {
        self.cursor.and_then(|cursor| self.session.preview(cursor))
    }

    /// The active calibration.
    #[must_use]
    pub const fn calibration(&self) -> Calibration {
        self.session.calibration()
    }

    /// Calibrate by direct entry of scale and unit.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Calibration`] for a non-positive scale; the
    /// previous calibration is kept.
    pub fn calibrate_direct(&mut self, scale: f64, unit: Unit) -> EditorResult<Calibration> {
        Ok(self.session.calibrate_direct(scale, unit)?)
    }

    /// Finish two-point calibration with the real length of the captured line.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Calibration`] if no line was captured or the
    /// distance is not positive; the previous calibration is kept.
    pub fn apply_known_distance(
        &mut self,
        known_distance: f64,
        unit: Unit,
    ) -> EditorResult<Calibration> {
        Ok(self.session.apply_known_distance(known_distance, unit)?)
    }

    /// Calibrate from a preset.
    pub fn apply_preset(&mut self, preset: &CalibrationPreset) -> Calibration {
        self.session.set_calibration(preset.calibration);
        preset.calibration
    }

    // -----------------------------------------------------------------------
    // History and pages
    // -----------------------------------------------------------------------

    /// Restore the layers before the last recorded change.
    pub fn undo(&mut self) -> bool {
        self.flush();
        match self.history.undo(self.manager.layers()) {
            Some(layers) => {
                self.manager.replace_layers(layers);
                self.canonical_changed();
                true
            }
            None => false,
        }
    }

    /// Reapply the last undone change.
    pub fn redo(&mut self) -> bool {
        self.flush();
        match self.history.redo(self.manager.layers()) {
            Some(layers) => {
                self.manager.replace_layers(layers);
                self.canonical_changed();
                true
            }
            None => false,
        }
    }

    /// Show another treatment page.
    ///
    /// History is per page and starts empty on the incoming page.
    pub fn switch_page(&mut self, page: Page) -> bool {
        self.flush();
        if !self.manager.switch_page(page) {
            return false;
        }
        self.history.clear();
        self.session.select_tool(Tool::Idle);
        self.cursor = None;
        self.canonical_changed();
        true
    }

    /// Rotate the current page's image by `degrees`.
    pub fn rotate_by(&mut self, degrees: f64) {
        self.manager.rotate_by(degrees);
    }

    /// Set the current page's image rotation.
    pub fn set_rotation(&mut self, degrees: f64) {
        self.manager.set_rotation(degrees);
    }

    // -----------------------------------------------------------------------
    // Scene
    // -----------------------------------------------------------------------

    /// Rebuild the scene from the layers, including staged edits.
    pub async fn render(&mut self) -> RenderOutcome {
        self.render_needed = false;
        self.sync
            .render_layers_to_scene(
                &mut self.backend,
                &self.materializer,
                self.reconciler.mirror(),
            )
            .await
    }

    /// Rebuild the scene only if something changed since the last render.
    pub async fn render_if_needed(&mut self) -> Option<RenderOutcome> {
        if self.render_needed {
            Some(self.render().await)
        } else {
            None
        }
    }

    // -----------------------------------------------------------------------
    // Persistence and rotation
    // -----------------------------------------------------------------------

    /// Capture the full session state, flushing staged edits first.
    pub fn document(&mut self) -> AnnotationDocument {
        self.flush();
        AnnotationDocument::from_manager(&self.manager)
    }

    /// Encode the full session state as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Document`] if encoding fails.
    pub fn to_json(&mut self) -> EditorResult<String> {
        Ok(self.document().to_json()?)
    }

    /// Save every page through `store`.
    ///
    /// Staged edits are flushed first so the payload includes them.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Store`] if the store fails. Local state is
    /// kept unchanged so the save can be retried.
    pub async fn save<S>(&mut self, store: &S) -> EditorResult<()>
    where
        S: AnnotationStore + ?Sized,
    {
        let document = self.document();
        store.save(&self.artifact_id, &document).await?;
        tracing::info!(
            artifact = %self.artifact_id,
            objects = document.object_count(),
            page = %document.current_page,
            "Annotations saved"
        );
        Ok(())
    }

    /// Replace the session state with the stored document, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Store`] if the store fails or the payload is
    /// unreadable; the current state is kept.
    pub async fn load<S>(&mut self, store: &S) -> EditorResult<bool>
    where
        S: AnnotationStore + ?Sized,
    {
        let Some(document) = store.load(&self.artifact_id).await? else {
            tracing::debug!(artifact = %self.artifact_id, "No saved annotations");
            return Ok(false);
        };
        tracing::info!(
            artifact = %self.artifact_id,
            objects = document.object_count(),
            page = %document.current_page,
            "Annotations loaded"
        );
        self.manager = document.into_manager();
        self.history.clear();
        self.session.select_tool(Tool::Idle);
        self.cursor = None;
        self.canonical_changed();
        Ok(true)
    }

    /// Bake the current page's visual rotation into the stored image.
    ///
    /// Returns `false` when there is no rotation to apply. On success the
    /// visual rotation resets to 0.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoImage`] without a background image, or
    /// [`EditorError::Rotation`] if the service fails. The rotation is kept
    /// so the request can be retried.
    pub async fn bake_rotation<R>(&mut self, service: &R) -> EditorResult<bool>
    where
        R: RotationService + ?Sized,
    {
        let degrees = self.manager.rotation();
        if degrees.abs() < f64::EPSILON {
            return Ok(false);
        }
        let image_path = self
            .backend
            .background()
            .map(|image| image.src.clone())
            .ok_or(EditorError::NoImage)?;
        let request = RotationRequest {
            artifact_id: self.artifact_id.clone(),
            image_path,
            degrees,
        };
        service.rotate(&request).await?;
        self.manager.set_rotation(0.0);
        tracing::info!(artifact = %self.artifact_id, degrees, "Image rotation applied");
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Run a manager operation after flushing staged edits.
    ///
    /// `None` from `op` means nothing changed. Recorded operations push the
    /// pre-change layers onto the undo stack.
    fn edit<R, F>(&mut self, record: bool, op: F) -> Option<R>
    where
        F: FnOnce(&mut LayerManager) -> Option<R>,
    {
        self.flush();
        let before = record.then(|| self.manager.layers().to_vec());
        let result = op(&mut self.manager)?;
        if let Some(before) = before {
            self.history.snapshot(&before);
        }
        self.canonical_changed();
        Some(result)
    }

    fn install_staged(&mut self, layers: Vec<Layer>) {
        self.history.snapshot(self.manager.layers());
        self.manager.replace_layers(layers);
        self.canonical_changed();
    }

    fn canonical_changed(&mut self) {
        self.reconciler.resync(self.manager.layers());
        self.render_needed = true;
    }

    fn resolve(&mut self, outcome: MeasureOutcome) -> MeasureOutcome {
        match &outcome {
            MeasureOutcome::Completed(measurement) => {
                self.commit_measurement(measurement.clone());
                self.cursor = None;
            }
            MeasureOutcome::ReferenceCaptured { .. } | MeasureOutcome::Cancelled => {
                self.cursor = None;
            }
            MeasureOutcome::Ignored | MeasureOutcome::Pending { .. } => {}
        }
        outcome
    }

    fn commit_measurement(&mut self, measurement: Measurement) {
        let label = measurement.label.clone();
        let object = measurement.into_object(self.measurement_style.clone());
        if self
            .edit(true, |m| m.add_to_active(object).then_some(()))
            .is_some()
        {
            tracing::debug!(%label, "Measurement committed");
        }
    }
}
