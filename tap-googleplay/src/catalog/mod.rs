//! Stream catalog: discovery output, catalog input and the stream registry.
//!
//! Discovery builds a catalog from the schemas compiled into the binary. A
//! catalog supplied on the command line replaces it and may carry selection
//! metadata per stream.

mod registry;
mod schema;

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, TapError};

pub use registry::{Stream, StreamRegistry};
pub use schema::{FieldSchema, JsonType, StreamSchema};

/// Key properties synthesized for discovered streams.
pub const DEFAULT_KEY_PROPERTIES: [&str; 4] =
    ["date", "package_name", "dimension_name", "dimension_value"];

/// Schemas shipped with the tap, one per supported report type.
const BUILTIN_SCHEMAS: &[(&str, &str)] = &[("installs", include_str!("../../schemas/installs.json"))];

/// One metadata entry attached to a catalog stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Path into the schema; empty for the stream itself
    #[serde(default)]
    pub breadcrumb: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// A single stream declaration in a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    pub tap_stream_id: String,
    pub schema: Value,
    #[serde(default)]
    pub key_properties: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
}

impl CatalogEntry {
    /// Stream-level (empty breadcrumb) metadata, if present.
    pub fn root_metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata
            .iter()
            .find(|entry| entry.breadcrumb.is_empty())
            .map(|entry| &entry.metadata)
    }

    /// Whether the root metadata marks this stream as selected.
    pub fn is_selected(&self) -> bool {
        self.root_metadata()
            .and_then(|metadata| metadata.get("selected"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// The set of streams known to a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    /// Loads a catalog file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TapError::configuration(format!("Cannot read catalog '{}': {e}", path.display()))
        })?;
        let catalog: Self = serde_json::from_str(&raw).map_err(|e| {
            TapError::configuration(format!("Catalog '{}' is not valid: {e}", path.display()))
        })?;
        debug!(path = %path.display(), streams = catalog.streams.len(), "Loaded catalog");
        Ok(catalog)
    }

    pub fn get(&self, tap_stream_id: &str) -> Option<&CatalogEntry> {
        self.streams
            .iter()
            .find(|entry| entry.tap_stream_id == tap_stream_id)
    }

    /// Pretty-printed JSON, as written by discovery mode.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds the catalog from the built-in schemas without touching the network.
pub fn discover() -> Result<Catalog> {
    let streams = BUILTIN_SCHEMAS
        .iter()
        .map(|(name, raw)| {
            let schema: Value = serde_json::from_str(raw).map_err(|e| {
                TapError::Schema(format!("built-in schema '{name}' is invalid: {e}"))
            })?;
            Ok(CatalogEntry {
                stream: Some(name.to_string()),
                tap_stream_id: name.to_string(),
                schema,
                key_properties: DEFAULT_KEY_PROPERTIES.iter().map(|k| k.to_string()).collect(),
                metadata: Vec::new(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Catalog { streams })
}
