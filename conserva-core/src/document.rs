//! Canonical save payload and its legacy predecessors.
//!
//! Three shapes are accepted on load:
//!
//! ```text
//! current   { version, layers, pages: { before|during|after: { layers, rotation } },
//!             rotation, currentPage }
//! legacy 2  { layers, rotation? }          single page, no page map
//! legacy 1  [ object, object, ... ]        flat object list, one layer
//! ```
//!
//! Objects are parsed one by one; a malformed object is logged and skipped
//! rather than failing the whole document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};
use crate::layer::Layer;
use crate::manager::LayerManager;
use crate::object::{clamp_opacity, SerializedObject};
use crate::page::{Page, PageData, DEFAULT_LAYER_NAME};

/// Version written by [`AnnotationDocument::from_manager`].
pub const DOCUMENT_VERSION: u32 = 2;

/// The persisted form of an editor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationDocument {
    /// Payload format version.
    pub version: u32,
    /// Layers of the current page.
    pub layers: Vec<Layer>,
    /// Every populated page, including the current one.
    pub pages: BTreeMap<Page, PageData>,
    /// Rotation of the current page, in degrees.
    pub rotation: f64,
    /// Page shown when the document was saved.
    pub current_page: Page,
}

impl AnnotationDocument {
    /// Capture the manager's full state.
    #[must_use]
    pub fn from_manager(manager: &LayerManager) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            layers: manager.layers().to_vec(),
            pages: manager.pages_snapshot(),
            rotation: manager.rotation(),
            current_page: manager.current_page(),
        }
    }

    /// Rebuild a manager showing the saved page.
    #[must_use]
    pub fn into_manager(mut self) -> LayerManager {
        let current = PageData {
            layers: self.layers,
            rotation: self.rotation,
        };
        self.pages.remove(&self.current_page);
        LayerManager::from_parts(self.current_page, current, self.pages)
    }

    /// Total number of objects across every page.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.pages
            .values()
            .flat_map(|p| &p.layers)
            .map(Layer::object_count)
            .sum()
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(CoreError::Serialization)
    }

    /// Serialize to indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> CoreResult<String> {
        serde_json::to_string_pretty(self).map_err(CoreError::Serialization)
    }

    /// Parse any accepted payload shape from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON, matches no known shape, or
    /// carries a newer version.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse any accepted payload shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the value matches no known shape or carries a
    /// newer version.
    pub fn from_value(value: Value) -> CoreResult<Self> {
        match value {
            Value::Array(objects) => {
                tracing::info!(objects = objects.len(), "Loading legacy flat object list");
                let layer = Layer::new(DEFAULT_LAYER_NAME).with_objects(parse_objects(&objects));
                Ok(Self::single_page(Page::Before, vec![layer], 0.0))
            }
            Value::Object(map) => Self::from_map(&map),
            other => Err(CoreError::UnknownShape(format!(
                "expected object or array, got {}",
                type_name(&other)
            ))),
        }
    }

    fn from_map(map: &Map<String, Value>) -> CoreResult<Self> {
        let version = map
            .get("version")
            .and_then(Value::as_u64)
            .map_or(1, |v| u32::try_from(v).unwrap_or(u32::MAX));
        if version > DOCUMENT_VERSION {
            return Err(CoreError::UnsupportedVersion {
                found: version,
                supported: DOCUMENT_VERSION,
            });
        }

        let rotation = map.get("rotation").and_then(Value::as_f64).unwrap_or(0.0);
        let current_page = match map.get("currentPage") {
            Some(v) => serde_json::from_value(v.clone())?,
            None => Page::Before,
        };

        match (map.get("layers"), map.get("pages")) {
            (layers, Some(Value::Object(pages))) => {
                let mut pages = parse_pages(pages)?;
                let layers = match layers {
                    Some(v) => parse_layers(v)?,
                    None => pages
                        .get(&current_page)
                        .map(|p| p.layers.clone())
                        .unwrap_or_default(),
                };
                pages.insert(
                    current_page,
                    PageData {
                        layers: layers.clone(),
                        rotation,
                    },
                );
                Ok(Self {
                    version: DOCUMENT_VERSION,
                    layers,
                    pages,
                    rotation,
                    current_page,
                })
            }
            (Some(layers), None) => {
                tracing::info!("Loading legacy single-page layer list");
                Ok(Self::single_page(current_page, parse_layers(layers)?, rotation))
            }
            _ => Err(CoreError::UnknownShape(
                "object has neither `layers` nor `pages`".to_string(),
            )),
        }
    }

    fn single_page(page: Page, layers: Vec<Layer>, rotation: f64) -> Self {
        let mut pages = BTreeMap::new();
        pages.insert(
            page,
            PageData {
                layers: layers.clone(),
                rotation,
            },
        );
        Self {
            version: DOCUMENT_VERSION,
            layers,
            pages,
            rotation,
            current_page: page,
        }
    }
}

fn parse_pages(pages: &Map<String, Value>) -> CoreResult<BTreeMap<Page, PageData>> {
    let mut parsed = BTreeMap::new();
    for (key, value) in pages {
        let Ok(page) = serde_json::from_value::<Page>(Value::String(key.clone())) else {
            tracing::warn!(page = %key, "Skipping unknown page");
            continue;
        };
        let layers = match value.get("layers") {
            Some(v) => parse_layers(v)?,
            None => Vec::new(),
        };
        let rotation = value.get("rotation").and_then(Value::as_f64).unwrap_or(0.0);
        parsed.insert(page, PageData { layers, rotation });
    }
    Ok(parsed)
}

fn parse_layers(value: &Value) -> CoreResult<Vec<Layer>> {
    let Value::Array(items) = value else {
        return Err(CoreError::UnknownShape(format!(
            "`layers` must be an array, got {}",
            type_name(value)
        )));
    };
    items
        .iter()
        .map(|item| -> CoreResult<Layer> {
            let mut item = item.clone();
            let objects = item
                .as_object_mut()
                .and_then(|m| m.remove("objects"))
                .unwrap_or(Value::Null);
            let mut layer: Layer = serde_json::from_value(item)?;
            layer.opacity = clamp_opacity(layer.opacity);
            if let Value::Array(objects) = objects {
                layer.objects = parse_objects(&objects);
            }
            Ok(layer)
        })
        .collect()
}

fn parse_objects(values: &[Value]) -> Vec<SerializedObject> {
    values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| {
            match serde_json::from_value::<SerializedObject>(value.clone()) {
                Ok(mut object) => {
                    object.style.opacity = clamp_opacity(object.style.opacity);
                    Some(object)
                }
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping malformed object");
                    None
                }
            }
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
