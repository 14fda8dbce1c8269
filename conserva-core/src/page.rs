//! Treatment-phase pages.

use serde::{Deserialize, Serialize};

use crate::layer::Layer;

/// Name given to the layer every fresh page starts with.
pub const DEFAULT_LAYER_NAME: &str = "Layer 1";

/// One of the three treatment phases, each with its own layers and rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    /// Condition before treatment.
    #[default]
    Before,
    /// Condition during treatment.
    During,
    /// Condition after treatment.
    After,
}

impl Page {
    /// All pages in treatment order.
    pub const ALL: [Page; 3] = [Page::Before, Page::During, Page::After];

    /// Lowercase name as used in documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::During => "during",
            Self::After => "after",
        }
    }
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored state of a page that is not currently shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    /// Layers in paint order.
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// Image rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
}

impl PageData {
    /// A fresh page: one empty default layer, no rotation.
    #[must_use]
    pub fn fresh() -> Self {
        Self {
            layers: vec![Layer::new(DEFAULT_LAYER_NAME)],
            rotation: 0.0,
        }
    }
}
