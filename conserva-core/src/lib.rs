//! # Conserva Core
//!
//! Annotation model for drawing, calibrating and measuring over artifact
//! photographs across treatment phases.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                conserva-core                │
//! ├─────────────────────────────────────────────┤
//! │  Layer Manager   │  Measurement             │
//! │  - Pages         │  - Point state machine   │
//! │  - Layers        │  - Geometry + labels     │
//! │  - Objects       │  - Calibration           │
//! ├─────────────────────────────────────────────┤
//! │  History         │  Document                │
//! │  - Undo / redo   │  - Save payload          │
//! │  - Snapshots     │  - Legacy shapes         │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod calibration;
pub mod document;
pub mod error;
pub mod event;
pub mod history;
pub mod layer;
pub mod manager;
pub mod measure;
pub mod object;
pub mod page;

pub use calibration::{Calibration, CalibrationError, CalibrationPreset, Unit};
pub use document::{AnnotationDocument, DOCUMENT_VERSION};
pub use error::{CoreError, CoreResult};
pub use event::{Key, PointerButton, PointerEvent, PointerPhase};
pub use history::{History, DEFAULT_HISTORY_LIMIT};
pub use layer::{Layer, LayerId};
pub use manager::LayerManager;
pub use measure::{
    MeasureOutcome, MeasureSession, Measurement, MeasurementKind, Preview, Tool,
};
pub use object::{clamp_opacity, ObjectId, Point, SerializedObject, Shape, Style};
pub use page::{Page, PageData};

/// Conserva core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
