//! Error types for annotation model operations.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The document matched none of the known payload shapes.
    #[error("Unrecognized document shape: {0}")]
    UnknownShape(String),

    /// The document was written by a newer version than this library reads.
    #[error("Unsupported document version {found} (newest supported is {supported})")]
    UnsupportedVersion {
        /// Version found in the document.
        found: u32,
        /// Newest version this library understands.
        supported: u32,
    },
}
