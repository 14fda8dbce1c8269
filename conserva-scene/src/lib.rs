//! # Conserva Scene
//!
//! Keeps a live drawable scene in step with the annotation layers.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐  begin   ┌─────────────┐  enliven  ┌───────────────────┐
//! │ Layer array  │ ───────▶ │ RenderPass  │ ────────▶ │ MaterializedPass  │
//! │ (canonical)  │          │ (snapshot)  │  (async)  │ (live objects)    │
//! └──────────────┘          └─────────────┘           └─────────┬─────────┘
//!                                                                │ apply
//!                               ┌─────────────────────────────────▼──────┐
//!                               │ SceneBackend: background + objects     │
//!                               │ (last applied generation wins)         │
//!                               └────────────────────────────────────────┘
//! ```
//!
//! The drawing library itself is abstracted behind [`SceneBackend`] and
//! [`Materializer`]; [`MemoryScene`] and [`MemoryMaterializer`] are complete
//! in-memory implementations.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod error;
pub mod sync;
pub mod viewport;

pub use backend::memory::{MemoryMaterializer, MemoryScene};
pub use backend::{BackgroundImage, LiveObject, Materializer, SceneBackend};
pub use error::{SceneError, SceneResult};
pub use sync::{MaterializedPass, RenderOutcome, RenderPass, SceneSync};
pub use viewport::Viewport;
