//! Read-only lookup of stream declarations for the sync engine.

use std::collections::BTreeMap;

use serde_json::Value;

use super::schema::StreamSchema;
use super::{discover, Catalog};
use crate::error::{Result, TapError};

/// A stream as declared by the catalog. Immutable for the whole run.
#[derive(Debug, Clone)]
pub struct Stream {
    pub id: String,
    /// Schema exactly as it appears in the catalog, re-emitted to the sink
    pub raw_schema: Value,
    pub schema: StreamSchema,
    pub key_properties: Vec<String>,
    pub selected: bool,
}

/// Resolves streams and their selection flags.
#[derive(Debug, Clone, Default)]
pub struct StreamRegistry {
    streams: BTreeMap<String, Stream>,
    /// Catalog order, used when declaring schemas
    order: Vec<String>,
}

impl StreamRegistry {
    /// Builds the registry from a catalog, parsing every stream's schema.
    pub fn from_catalog(catalog: &Catalog) -> Result<Self> {
        let mut registry = Self::default();
        for entry in &catalog.streams {
            let schema = StreamSchema::from_json(&entry.schema).map_err(|e| {
                TapError::Schema(format!("stream '{}': {e}", entry.tap_stream_id))
            })?;
            let stream = Stream {
                id: entry.tap_stream_id.clone(),
                raw_schema: entry.schema.clone(),
                schema,
                key_properties: entry.key_properties.clone(),
                selected: entry.is_selected(),
            };
            if registry
                .streams
                .insert(stream.id.clone(), stream)
                .is_none()
            {
                registry.order.push(entry.tap_stream_id.clone());
            }
        }
        Ok(registry)
    }

    /// Builds the registry from the built-in schemas.
    pub fn builtin() -> Result<Self> {
        Self::from_catalog(&discover()?)
    }

    /// Uses the supplied catalog, or self-populates from the built-in schemas.
    pub fn from_optional_catalog(catalog: Option<&Catalog>) -> Result<Self> {
        match catalog {
            Some(catalog) => Self::from_catalog(catalog),
            None => Self::builtin(),
        }
    }

    pub fn resolve(&self, stream_id: &str) -> Result<&Stream> {
        self.streams
            .get(stream_id)
            .ok_or_else(|| TapError::StreamNotFound(stream_id.to_string()))
    }

    /// Unknown streams count as unselected.
    pub fn is_selected(&self, stream_id: &str) -> bool {
        self.streams
            .get(stream_id)
            .is_some_and(|stream| stream.selected)
    }

    /// Streams in catalog order.
    pub fn streams(&self) -> impl Iterator<Item = &Stream> {
        self.order.iter().filter_map(|id| self.streams.get(id))
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
