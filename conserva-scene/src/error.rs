//! Scene error types.

use thiserror::Error;

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors that can occur while projecting layers onto the scene.
#[derive(Debug, Error)]
pub enum SceneError {
    /// A serialized object could not be turned into a live object.
    #[error("Failed to materialize {kind} {object_id}: {reason}")]
    Materialize {
        /// Identity tag of the object.
        object_id: String,
        /// Shape kind of the object.
        kind: &'static str,
        /// Why materialization failed.
        reason: String,
    },

    /// The drawing backend reported a failure.
    #[error("Scene backend error: {0}")]
    Backend(String),
}
