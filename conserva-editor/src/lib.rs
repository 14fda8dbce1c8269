//! # Conserva Editor
//!
//! An annotation editing session over an artifact photograph: layers,
//! staged interactive edits, undo/redo, measurement and calibration, plus
//! the persistence and image-rotation boundaries.
//!
//! ## Usage
//!
//! ```no_run
//! use conserva_editor::{Editor, EditorConfig, FileStore};
//! use conserva_scene::{MemoryMaterializer, MemoryScene};
//!
//! # async fn run() -> conserva_editor::EditorResult<()> {
//! conserva_editor::telemetry::init_tracing();
//!
//! let store = FileStore::new("./annotations")?;
//! let mut editor = Editor::new(
//!     "ART-0042",
//!     MemoryScene::new(1024.0, 768.0),
//!     MemoryMaterializer::new(),
//!     EditorConfig::from_env(),
//! );
//! editor.load(&store).await?;
//! editor.render().await;
//! editor.save(&store).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod editor;
pub mod error;
pub mod pending;
pub mod rotation;
pub mod store;
pub mod telemetry;

pub use config::{EditorConfig, DEFAULT_FLUSH_INTERVAL};
pub use editor::Editor;
pub use error::{EditorError, EditorResult};
pub use pending::Reconciler;
pub use rotation::{
    HttpRotationClient, HttpRotationConfig, RotationError, RotationRequest, RotationService,
};
pub use store::{AnnotationStore, FileStore, MemoryStore, StoreError};

/// Conserva editor version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
