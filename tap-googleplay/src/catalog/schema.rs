//! Typed view over a stream's JSON schema.
//!
//! Only the parts needed for coercion are interpreted: each property's
//! declared `type` (a single name or a list) and its optional `format`.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::error::{Result, TapError};

/// A JSON-schema primitive type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Null,
    Integer,
    Number,
    Boolean,
    String,
    Object,
    Array,
}

impl JsonType {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "null" => Ok(Self::Null),
            "integer" => Ok(Self::Integer),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "string" => Ok(Self::String),
            "object" => Ok(Self::Object),
            "array" => Ok(Self::Array),
            other => Err(TapError::Schema(format!("unsupported type '{other}'"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a single property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Allowed types in declaration order. Empty means any value is accepted.
    pub types: Vec<JsonType>,
    /// Optional string format, e.g. `date-time`
    pub format: Option<String>,
}

impl FieldSchema {
    pub fn new(types: Vec<JsonType>) -> Self {
        Self {
            types,
            format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn allows_null(&self) -> bool {
        self.types.is_empty() || self.types.contains(&JsonType::Null)
    }

    pub fn is_date_time(&self) -> bool {
        self.format.as_deref() == Some("date-time")
    }

    /// Human-readable description of the declared type for error messages.
    pub fn describe(&self) -> String {
        let names: Vec<&str> = self.types.iter().map(JsonType::as_str).collect();
        match &self.format {
            Some(format) => format!("{} ({format})", names.join("|")),
            None => names.join("|"),
        }
    }

    fn from_value(name: &str, value: &Value) -> Result<Self> {
        let types = match value.get("type") {
            None => Vec::new(),
            Some(Value::String(single)) => vec![JsonType::parse(single)?],
            Some(Value::Array(list)) => list
                .iter()
                .map(|item| {
                    item.as_str()
                        .ok_or_else(|| {
                            TapError::Schema(format!("property '{name}' has a non-string type"))
                        })
                        .and_then(JsonType::parse)
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(TapError::Schema(format!(
                    "property '{name}' has malformed type {other}"
                )))
            }
        };
        let format = value
            .get("format")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Self { types, format })
    }
}

/// Parsed properties of an object schema, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSchema {
    properties: BTreeMap<String, FieldSchema>,
}

impl StreamSchema {
    /// Interprets a JSON-schema object.
    pub fn from_json(schema: &Value) -> Result<Self> {
        let properties = match schema.get("properties") {
            None => BTreeMap::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(name, field)| Ok((name.clone(), FieldSchema::from_value(name, field)?)))
                .collect::<Result<BTreeMap<_, _>>>()?,
            Some(_) => {
                return Err(TapError::Schema(
                    "'properties' must be an object".to_string(),
                ))
            }
        };
        Ok(Self { properties })
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.properties.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl FromIterator<(String, FieldSchema)> for StreamSchema {
    fn from_iter<I: IntoIterator<Item = (String, FieldSchema)>>(iter: I) -> Self {
        Self {
            properties: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_type_list_and_format() {
        let schema = StreamSchema::from_json(&json!({
            "type": "object",
            "properties": {
                "installs": { "type": ["null", "integer"] },
                "name": { "type": "string" },
                "updated_at": { "type": ["null", "string"], "format": "date-time" },
                "anything": {}
            }
        }))
        .unwrap();

        assert_eq!(schema.len(), 4);
        let installs = schema.field("installs").unwrap();
        assert_eq!(installs.types, vec![JsonType::Null, JsonType::Integer]);
        assert!(installs.allows_null());
        assert!(!schema.field("name").unwrap().allows_null());
        assert!(schema.field("updated_at").unwrap().is_date_time());
        assert!(schema.field("anything").unwrap().types.is_empty());
    }

    #[test]
    fn test_unknown_type_is_schema_error() {
        let err = StreamSchema::from_json(&json!({
            "properties": { "x": { "type": "decimal" } }
        }))
        .unwrap_err();
        assert!(matches!(err, TapError::Schema(_)));
    }

    #[test]
    fn test_describe() {
        let field = FieldSchema::new(vec![JsonType::Null, JsonType::String]).with_format("date-time");
        assert_eq!(field.describe(), "null|string (date-time)");
    }

    #[test]
    fn test_builtin_installs_schema_parses() {
        let raw: Value = serde_json::from_str(include_str!("../../schemas/installs.json")).unwrap();
        let schema = StreamSchema::from_json(&raw).unwrap();
        assert_eq!(
            schema.field("daily_device_installs").unwrap().types,
            vec![JsonType::Null, JsonType::Integer]
        );
        assert!(schema.field("dimension_value").is_some());
    }
}
