//! Error types for editor sessions.

use conserva_core::{CalibrationError, CoreError};
use thiserror::Error;

use crate::rotation::RotationError;
use crate::store::StoreError;

/// Errors surfaced by [`Editor`](crate::Editor) operations.
#[derive(Error, Debug)]
pub enum EditorError {
    /// Saving or loading annotations failed.
    #[error("Persistence failed: {0}")]
    Store(#[from] StoreError),

    /// Baking the image rotation failed.
    #[error("Image rotation failed: {0}")]
    Rotation(#[from] RotationError),

    /// Calibration input was rejected; the previous calibration is kept.
    #[error("Invalid calibration: {0}")]
    Calibration(#[from] CalibrationError),

    /// The annotation document could not be encoded or decoded.
    #[error("Document error: {0}")]
    Document(#[from] CoreError),

    /// An operation needs the artifact image but none is set.
    #[error("No artifact image is set")]
    NoImage,
}

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;
