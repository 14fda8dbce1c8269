//! Layers - ordered, independently toggleable collections of objects.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::object::{ObjectId, SerializedObject};

/// Unique identifier for a layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(String);

impl LayerId {
    /// Create a new unique layer ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A layer of vector objects within one treatment page.
///
/// Objects are kept in paint order. Locked and reference layers still render
/// but refuse new objects and edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Unique identifier.
    #[serde(default)]
    pub id: LayerId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Whether the layer is drawn.
    #[serde(default = "Layer::default_visible")]
    pub visible: bool,
    /// Whether edits are refused.
    #[serde(default)]
    pub locked: bool,
    /// Layer opacity (0.0 to 1.0).
    #[serde(default = "Layer::default_opacity")]
    pub opacity: f64,
    /// Whether this is a fixed visual guide (non-editable).
    #[serde(default)]
    pub is_reference: bool,
    /// Objects in paint order.
    #[serde(default)]
    pub objects: Vec<SerializedObject>,
}

impl Layer {
    /// Create an empty, visible, unlocked layer.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            visible: true,
            locked: false,
            opacity: 1.0,
            is_reference: false,
            objects: Vec::new(),
        }
    }

    /// Add initial objects.
    #[must_use]
    pub fn with_objects(mut self, objects: Vec<SerializedObject>) -> Self {
        self.objects = objects;
        self
    }

    const fn default_visible() -> bool {
        true
    }

    const fn default_opacity() -> f64 {
        1.0
    }

    /// Whether new objects and edits are accepted.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        !self.locked && !self.is_reference
    }

    /// Whether rendered objects of this layer can be selected.
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        self.is_editable()
    }

    /// Number of objects on the layer.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Index of the object with the given identity tag.
    #[must_use]
    pub fn position_of(&self, object_id: &ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| &o.object_id == object_id)
    }

    /// Copy of this layer with a fresh layer ID and fresh object IDs.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            id: LayerId::new(),
            name: format!("{} copy", self.name),
            objects: self.objects.iter().map(SerializedObject::with_fresh_id).collect(),
            ..self.clone()
        }
    }
}
