//! Maps decoded rows onto a stream schema.

use chrono::{TimeZone, Utc};
use serde_json::{Map, Number, Value};
use tracing::debug;

use super::decoder::DecodedRow;
use crate::catalog::{FieldSchema, JsonType, StreamSchema};
use crate::dates::{format_record_timestamp, parse_timestamp};
use crate::error::{Result, TapError};
use crate::logging::truncate_field;

/// Field receiving the fixed dimension name.
pub const DIMENSION_NAME_FIELD: &str = "dimension_name";

/// Field receiving the row's raw dimension value.
pub const DIMENSION_VALUE_FIELD: &str = "dimension_value";

/// Header position of the dimension column in every report layout.
pub const DIMENSION_COLUMN_INDEX: usize = 2;

/// A schema-conformant record ready to emit.
pub type Record = Map<String, Value>;

const MAX_VALUE_IN_ERROR: usize = 64;

/// Shapes rows of one report into records of one stream.
#[derive(Debug, Clone)]
pub struct RecordShaper<'a> {
    dimension_name: String,
    schema: &'a StreamSchema,
}

impl<'a> RecordShaper<'a> {
    pub fn new(dimension_name: impl Into<String>, schema: &'a StreamSchema) -> Self {
        Self {
            dimension_name: dimension_name.into(),
            schema,
        }
    }

    /// Injects the dimension fields, drops the raw dimension column and
    /// coerces the result against the schema.
    ///
    /// A row without a dimension value gets `dimension_value = null`, which
    /// the schema then accepts or rejects.
    pub fn shape(&self, row: &DecodedRow, header: &[String]) -> Result<Record> {
        let dimension_column = header.get(DIMENSION_COLUMN_INDEX).ok_or_else(|| {
            TapError::decode(format!(
                "report header has {} columns, dimension column expected at position {}",
                header.len(),
                DIMENSION_COLUMN_INDEX
            ))
        })?;

        let mut record: Record = row
            .iter()
            .filter(|(name, _)| *name != dimension_column)
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        record.insert(
            DIMENSION_NAME_FIELD.to_string(),
            Value::String(self.dimension_name.clone()),
        );
        let dimension_value = row
            .get(dimension_column)
            .map(|value| Value::String(value.clone()))
            .unwrap_or(Value::Null);
        record.insert(DIMENSION_VALUE_FIELD.to_string(), dimension_value);

        coerce_record(record, self.schema)
    }
}

/// Coerces every value to its declared type. Fields the schema does not
/// declare are dropped.
pub fn coerce_record(record: Record, schema: &StreamSchema) -> Result<Record> {
    let mut coerced = Map::with_capacity(record.len());
    for (name, value) in record {
        match schema.field(&name) {
            Some(field) => {
                let value = coerce_value(&name, value, field)?;
                coerced.insert(name, value);
            }
            None => debug!(field = %name, "Dropping field not declared in schema"),
        }
    }
    Ok(coerced)
}

/// Coerces a single value, trying the declared types in order.
pub fn coerce_value(name: &str, value: Value, field: &FieldSchema) -> Result<Value> {
    if field.types.is_empty() {
        return Ok(value);
    }

    let raw = match value {
        Value::String(raw) => raw,
        Value::Null if field.allows_null() => return Ok(Value::Null),
        other if already_conforms(&other, field) => return Ok(other),
        other => {
            return Err(TapError::coercion(
                name,
                field.describe(),
                truncate_field(&other.to_string(), MAX_VALUE_IN_ERROR),
            ))
        }
    };

    if raw.is_empty() && field.allows_null() && !field.types.contains(&JsonType::String) {
        return Ok(Value::Null);
    }

    for ty in &field.types {
        let converted = match ty {
            JsonType::Integer => raw.parse::<i64>().ok().map(Value::from),
            JsonType::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            JsonType::Boolean => parse_bool(&raw).map(Value::Bool),
            JsonType::String if field.is_date_time() => {
                parse_date_time(&raw).map(Value::String)
            }
            JsonType::String => Some(Value::String(raw.clone())),
            JsonType::Null | JsonType::Object | JsonType::Array => None,
        };
        if let Some(converted) = converted {
            return Ok(converted);
        }
    }

    Err(TapError::coercion(
        name,
        field.describe(),
        truncate_field(&raw, MAX_VALUE_IN_ERROR),
    ))
}

fn already_conforms(value: &Value, field: &FieldSchema) -> bool {
    field.types.iter().any(|ty| match (ty, value) {
        (JsonType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (JsonType::Number, Value::Number(_)) => true,
        (JsonType::Boolean, Value::Bool(_)) => true,
        (JsonType::Object, Value::Object(_)) => true,
        (JsonType::Array, Value::Array(_)) => true,
        _ => false,
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Epoch seconds first, then any accepted ISO-8601 form.
fn parse_date_time(raw: &str) -> Option<String> {
    let instant = match raw.parse::<i64>() {
        Ok(seconds) => Utc.timestamp_opt(seconds, 0).single()?,
        Err(_) => parse_timestamp(raw).ok()?,
    };
    Some(format_record_timestamp(&instant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn row(pairs: &[(&str, &str)]) -> DecodedRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn installs_schema() -> StreamSchema {
        StreamSchema::from_json(&json!({
            "properties": {
                "date": { "type": ["null", "string"] },
                "package_name": { "type": ["null", "string"] },
                "dimension_name": { "type": ["null", "string"] },
                "dimension_value": { "type": ["null", "string"] },
                "installs": { "type": ["null", "integer"] }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_dimension_remap() {
        let schema = installs_schema();
        let shaper = RecordShaper::new("os_version", &schema);
        let record = shaper
            .shape(
                &row(&[("device", "v10")]),
                &header(&["date", "package_name", "device", "installs"]),
            )
            .unwrap();

        assert_eq!(record["dimension_name"], "os_version");
        assert_eq!(record["dimension_value"], "v10");
        assert!(!record.contains_key("device"));
    }

    #[test]
    fn test_full_row_is_coerced() {
        let schema = installs_schema();
        let shaper = RecordShaper::new("os_version", &schema);
        let record = shaper
            .shape(
                &row(&[
                    ("date", "2019-06-01"),
                    ("package_name", "com.example"),
                    ("android_os_version", "Android 9"),
                    ("installs", "42"),
                ]),
                &header(&["date", "package_name", "android_os_version", "installs"]),
            )
            .unwrap();

        assert_eq!(
            Value::Object(record),
            json!({
                "date": "2019-06-01",
                "package_name": "com.example",
                "dimension_name": "os_version",
                "dimension_value": "Android 9",
                "installs": 42
            })
        );
    }

    #[test]
    fn test_short_row_gets_null_dimension() {
        let schema = installs_schema();
        let shaper = RecordShaper::new("os_version", &schema);
        let record = shaper
            .shape(
                &row(&[("date", "2019-06-01")]),
                &header(&["date", "package_name", "device", "installs"]),
            )
            .unwrap();
        assert_eq!(record["dimension_value"], Value::Null);
        assert!(!record.contains_key("installs"));
    }

    #[test]
    fn test_short_row_with_required_dimension_fails() {
        let schema = StreamSchema::from_json(&json!({
            "properties": { "dimension_value": { "type": "string" } }
        }))
        .unwrap();
        let shaper = RecordShaper::new("os_version", &schema);
        let err = shaper
            .shape(&row(&[("date", "2019-06-01")]), &header(&["date", "package_name", "device"]))
            .unwrap_err();
        assert!(matches!(err, TapError::Coercion { ref field, .. } if field == "dimension_value"));
    }

    #[test]
    fn test_header_without_dimension_column() {
        let schema = installs_schema();
        let shaper = RecordShaper::new("os_version", &schema);
        let err = shaper
            .shape(&row(&[("date", "2019-06-01")]), &header(&["date", "installs"]))
            .unwrap_err();
        assert!(matches!(err, TapError::Decode(_)));
    }

    #[test]
    fn test_bad_integer_is_coercion_error() {
        let schema = installs_schema();
        let shaper = RecordShaper::new("os_version", &schema);
        let err = shaper
            .shape(
                &row(&[("device", "v10"), ("installs", "many")]),
                &header(&["date", "package_name", "device", "installs"]),
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot coerce field 'installs' value 'many' to null|integer"
        );
    }

    #[test]
    fn test_empty_nullable_integer_becomes_null() {
        let field = FieldSchema::new(vec![JsonType::Null, JsonType::Integer]);
        assert_eq!(coerce_value("n", json!(""), &field).unwrap(), Value::Null);

        let required = FieldSchema::new(vec![JsonType::Integer]);
        assert!(coerce_value("n", json!(""), &required).is_err());
    }

    #[test]
    fn test_date_time_from_epoch_seconds() {
        let field = FieldSchema::new(vec![JsonType::Null, JsonType::String]).with_format("date-time");
        assert_eq!(
            coerce_value("ts", json!("1559347200"), &field).unwrap(),
            json!("2019-06-01T00:00:00.000000Z")
        );
        assert_eq!(
            coerce_value("ts", json!("2019-06-01T00:00:00Z"), &field).unwrap(),
            json!("2019-06-01T00:00:00.000000Z")
        );
        assert!(coerce_value("ts", json!("soon"), &field).is_err());
    }

    #[test]
    fn test_number_and_boolean() {
        let number = FieldSchema::new(vec![JsonType::Number]);
        assert_eq!(coerce_value("rating", json!("4.5"), &number).unwrap(), json!(4.5));
        let flag = FieldSchema::new(vec![JsonType::Boolean]);
        assert_eq!(coerce_value("flag", json!("TRUE"), &flag).unwrap(), json!(true));
        assert!(coerce_value("flag", json!("yes"), &flag).is_err());
    }

    #[test]
    fn test_undeclared_fields_dropped() {
        let schema = installs_schema();
        let mut record = Record::new();
        record.insert("installs".into(), json!("3"));
        record.insert("mystery".into(), json!("x"));
        let coerced = coerce_record(record, &schema).unwrap();
        assert_eq!(Value::Object(coerced), json!({ "installs": 3 }));
    }

    #[test]
    fn test_untyped_field_passes_through() {
        let field = FieldSchema::new(Vec::new());
        assert_eq!(coerce_value("any", json!("abc"), &field).unwrap(), json!("abc"));
    }
}
