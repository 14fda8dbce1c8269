//! Annotation persistence.
//!
//! The editor hands a complete [`AnnotationDocument`] to an
//! [`AnnotationStore`] at explicit save boundaries and reads one back on
//! load. Documents are keyed by artifact ID.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use conserva_core::{AnnotationDocument, CoreError};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The stored document could not be encoded or decoded.
    #[error("Document error: {0}")]
    Document(#[from] CoreError),
    /// The backing store refused the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence boundary for annotation documents.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Persist the document for an artifact, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be encoded or written.
    async fn save(&self, artifact_id: &str, document: &AnnotationDocument) -> Result<(), StoreError>;

    /// Load the document for an artifact, or `None` if nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored payload cannot be read or decoded.
    async fn load(&self, artifact_id: &str) -> Result<Option<AnnotationDocument>, StoreError>;
}

/// In-memory store holding serialized JSON payloads.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    payloads: Arc<RwLock<HashMap<String, String>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent saves and loads fail, or succeed again.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Raw JSON payload stored for an artifact.
    #[must_use]
    pub fn payload(&self, artifact_id: &str) -> Option<String> {
        self.payloads
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(artifact_id)
            .cloned()
    }

    /// Store a raw JSON payload, e.g. one written by an older release.
    pub fn insert_payload(&self, artifact_id: &str, json: impl Into<String>) {
        self.payloads
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(artifact_id.to_string(), json.into());
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AnnotationStore for MemoryStore {
    async fn save(&self, artifact_id: &str, document: &AnnotationDocument) -> Result<(), StoreError> {
        self.check_available()?;
        let json = document.to_json()?;
        self.insert_payload(artifact_id, json);
        Ok(())
    }

    async fn load(&self, artifact_id: &str) -> Result<Option<AnnotationDocument>, StoreError> {
        self.check_available()?;
        self.payload(artifact_id)
            .map(|json| AnnotationDocument::from_json(&json))
            .transpose()
            .map_err(StoreError::from)
    }
}

/// Store writing one pretty-printed JSON file per artifact.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `data_dir`.
    ///
    /// The directory is created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// The data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the file holding an artifact's annotations.
    #[must_use]
    pub fn path_for(&self, artifact_id: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.json", sanitize_filename(artifact_id)))
    }

    /// IDs (file stems) of every stored document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be read.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Delete an artifact's document. Returns `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be removed.
    pub async fn delete(&self, artifact_id: &str) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(self.path_for(artifact_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl AnnotationStore for FileStore {
    async fn save(&self, artifact_id: &str, document: &AnnotationDocument) -> Result<(), StoreError> {
        let json = document.to_json_pretty()?;
        let path = self.path_for(artifact_id);
        // Write beside the target, then rename over it.
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &path).await?;
        tracing::debug!(artifact = artifact_id, path = %path.display(), "Annotations written");
        Ok(())
    }

    async fn load(&self, artifact_id: &str) -> Result<Option<AnnotationDocument>, StoreError> {
        let path = self.path_for(artifact_id);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(AnnotationDocument::from_json(&json)?))
    }
}

/// Replace anything but alphanumerics, `-` and `_` with `_`.
fn sanitize_filename(artifact_id: &str) -> String {
    artifact_id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
