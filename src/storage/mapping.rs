//! Record splitting and merging for hybrid mode.
//!
//! A logical record is split into the fields a schema owns (typed columns) and
//! extra fields (the `_extras` JSON payload). Reads merge the two back, with
//! extras winning on key collision, and coerce column encodings back to the
//! declared types.

use crate::models::{Record, Value, is_reserved_field};
use crate::schema::SchemaDefinition;
use crate::{Error, Result};

/// A record partitioned by schema ownership.
///
/// Every non-reserved field of the source record lands in exactly one half.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitRecord {
    /// Fields declared in the schema.
    pub schema_fields: Record,
    /// Every other non-reserved field.
    pub extra_fields: Record,
}

/// Splits a record into schema-owned and extra fields.
///
/// Reserved fields are dropped from both halves. Without a schema every
/// field is an extra.
#[must_use]
pub fn split(record: &Record, schema: Option<&SchemaDefinition>) -> SplitRecord {
    let mut out = SplitRecord::default();
    for (field, value) in record.iter().filter(|(f, _)| !is_reserved_field(f)) {
        if schema.is_some_and(|s| s.contains(field)) {
            out.schema_fields.insert(field.clone(), value.clone());
        } else {
            out.extra_fields.insert(field.clone(), value.clone());
        }
    }
    out
}

/// Merges a stored row and its extras payload into one logical record.
///
/// `columns` holds the row's native columns (reserved columns and schema
/// columns, without the raw payload). NULL schema columns are treated as
/// absent fields. The payload is overlaid on top, except for reserved keys,
/// which always come from the columns. Then declared booleans and JSON-typed
/// fields are decoded.
#[must_use]
pub fn merge(columns: Record, extras_payload: Option<&str>, schema: &SchemaDefinition) -> Record {
    let mut merged: Record = columns
        .into_iter()
        .filter(|(field, value)| !(value.is_null() && schema.contains(field)))
        .collect();

    let extras = decode_payload(crate::models::EXTRAS_FIELD, extras_payload);
    merged.extend(extras.into_iter().filter(|(field, _)| !is_reserved_field(field)));

    coerce_declared(&mut merged, schema);
    merged
}

/// Converts column encodings back to the declared types, in place.
///
/// BOOLEAN fields turn `0`/`1` into booleans; JSON-typed fields holding JSON
/// text are parsed. Anything else is left untouched.
pub fn coerce_declared(record: &mut Record, schema: &SchemaDefinition) {
    for (field, descriptor) in schema.iter() {
        let Some(value) = record.get_mut(field) else {
            continue;
        };
        if descriptor.is_boolean() {
            coerce_boolean(value);
        } else if descriptor.is_json_encoded() {
            coerce_json(value);
        }
    }
}

/// Decodes a JSON object payload, failing soft to an empty record.
///
/// A missing or empty payload is an empty record. A corrupt payload is logged
/// as [`Error::ExtrasDecodeFailure`] and also yields an empty record, so one
/// bad row never fails a whole read.
#[must_use]
pub fn decode_payload(column: &'static str, payload: Option<&str>) -> Record {
    let Some(text) = payload.filter(|t| !t.trim().is_empty()) else {
        return Record::new();
    };
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(record)) => record,
        Ok(other) => {
            report_decode_failure(column, format!("expected an object, found {}", other.type_name()));
            Record::new()
        },
        Err(e) => {
            report_decode_failure(column, e.to_string());
            Record::new()
        },
    }
}

/// Serializes a payload record to JSON text.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if a value cannot be encoded.
pub fn encode_payload(operation: &str, record: &Record) -> Result<String> {
    serde_json::to_string(record).map_err(|e| Error::Serialization {
        operation: operation.to_string(),
        cause: e.to_string(),
    })
}

fn report_decode_failure(column: &'static str, cause: String) {
    let err = Error::ExtrasDecodeFailure { column, cause };
    tracing::warn!(error = %err, "Substituting empty payload for undecodable row");
    metrics::counter!("record_payload_decode_failures_total", "column" => column).increment(1);
}

#[allow(clippy::float_cmp)]
fn coerce_boolean(value: &mut Value) {
    let coerced = match value {
        Value::Integer(0) => false,
        Value::Integer(1) => true,
        Value::Real(f) if *f == 0.0 => false,
        Value::Real(f) if *f == 1.0 => true,
        _ => return,
    };
    *value = Value::Bool(coerced);
}

fn coerce_json(value: &mut Value) {
    if let Value::Text(text) = value {
        if let Ok(parsed) = serde_json::from_str::<Value>(text) {
            *value = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CREATED_AT_FIELD, EXTRAS_FIELD, ID_FIELD, UPDATED_AT_FIELD};
    use crate::schema::{FieldType, TypeDescriptor};

    fn schema() -> SchemaDefinition {
        SchemaDefinition::new()
            .with_field("a", FieldType::Number)
            .with_field("b", FieldType::Boolean)
    }

    #[test]
    fn test_split_partitions_by_schema() {
        let record = Record::new()
            .with(ID_FIELD, "x")
            .with(CREATED_AT_FIELD, "t")
            .with("a", 1)
            .with("b", true)
            .with("c", "x");

        let split = split(&record, Some(&schema()));
        assert_eq!(split.schema_fields, Record::new().with("a", 1).with("b", true));
        assert_eq!(split.extra_fields, Record::new().with("c", "x"));
    }

    #[test]
    fn test_split_without_schema_is_all_extras() {
        let record = Record::new().with("a", 1).with(UPDATED_AT_FIELD, "t");
        let split = split(&record, None);
        assert!(split.schema_fields.is_empty());
        assert_eq!(split.extra_fields, Record::new().with("a", 1));
    }

    #[test]
    fn test_split_drops_caller_extras_field() {
        let record = Record::new().with("_extras", "{}").with("c", 1);
        let split = split(&record, Some(&schema()));
        assert_eq!(split.extra_fields, Record::new().with("c", 1));
    }

    #[test]
    fn test_merge_restores_booleans() {
        let columns = Record::new()
            .with(ID_FIELD, "id")
            .with("a", 1.0)
            .with("b", 1);
        let merged = merge(columns, Some(r#"{"c":"x"}"#), &schema());
        assert_eq!(merged.get("b"), Some(&Value::Bool(true)));
        assert_eq!(merged.get("a"), Some(&Value::Integer(1)));
        assert_eq!(merged.get("c"), Some(&Value::from("x")));
        assert_eq!(merged.id(), Some("id"));
    }

    #[test]
    fn test_merge_leaves_other_integers_alone() {
        let merged = merge(Record::new().with("b", 7), None, &schema());
        assert_eq!(merged.get("b"), Some(&Value::Integer(7)));
    }

    #[test]
    fn test_merge_extras_win_on_collision() {
        let columns = Record::new().with("a", 1);
        let merged = merge(columns, Some(r#"{"a":2}"#), &schema());
        assert_eq!(merged.get("a"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_merge_coerces_booleans_from_extras() {
        let merged = merge(Record::new(), Some(r#"{"b":0}"#), &schema());
        assert_eq!(merged.get("b"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_merge_drops_null_schema_columns() {
        let columns = Record::new().with("a", Value::Null).with("b", 0);
        let merged = merge(columns, Some("{}"), &schema());
        assert!(!merged.contains_key("a"));
        assert_eq!(merged.get("b"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_merge_keeps_null_extras() {
        let merged = merge(Record::new(), Some(r#"{"note":null}"#), &schema());
        assert_eq!(merged.get("note"), Some(&Value::Null));
    }

    #[test]
    fn test_merge_fails_soft_on_corrupt_extras() {
        let columns = Record::new().with(ID_FIELD, "id").with("a", 3);
        let merged = merge(columns, Some("{not json"), &schema());
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("a"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_merge_decodes_json_fields() {
        let schema = SchemaDefinition::new().with_field("tags", TypeDescriptor::tag("ARRAY"));
        let merged = merge(Record::new().with("tags", r#"["a","b"]"#), None, &schema);
        assert_eq!(
            merged.get("tags"),
            Some(&Value::Array(vec!["a".into(), "b".into()]))
        );

        let merged = merge(Record::new().with("tags", "plain"), None, &schema);
        assert_eq!(merged.get("tags"), Some(&Value::from("plain")));
    }

    #[test]
    fn test_decode_payload_shapes() {
        assert!(decode_payload("_data", None).is_empty());
        assert!(decode_payload("_data", Some("")).is_empty());
        assert!(decode_payload("_data", Some("[1]")).is_empty());
        assert_eq!(
            decode_payload("_data", Some(r#"{"k":true}"#)),
            Record::new().with("k", true)
        );
    }

    #[test]
    fn test_encode_payload() {
        let json = encode_payload("insert", &Record::new().with("blob", vec![0u8, 255])).unwrap();
        assert_eq!(json, r#"{"blob":{"$bytes":"00ff"}}"#);
    }

    #[test]
    fn test_merge_ignores_reserved_keys_in_extras() {
        let schema = schema();
        let columns = Record::new()
            .with(ID_FIELD, "real")
            .with(CREATED_AT_FIELD, "c")
            .with(UPDATED_AT_FIELD, "u");
        let merged = merge(
            columns,
            Some(r#"{"_id":"forged","_createdAt":"x","_extras":"y","k":1}"#),
            &schema,
        );

        assert_eq!(merged.id(), Some("real"));
        assert_eq!(merged.created_at(), Some("c"));
        assert!(!merged.contains_key(EXTRAS_FIELD));
        assert_eq!(merged.get("k"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_coerce_declared() {
        let schema = SchemaDefinition::new()
            .with_field("b", FieldType::Boolean)
            .with_field("j", TypeDescriptor::tag("JSON"))
            .with_field("s", FieldType::String);
        let mut record = Record::new()
            .with("b", 1)
            .with("j", r#"{"x":[1]}"#)
            .with("s", "1");
        coerce_declared(&mut record, &schema);

        assert_eq!(record.get("b"), Some(&Value::Bool(true)));
        assert_eq!(
            record.get("j"),
            Some(&Value::Object(Record::new().with("x", vec![Value::Integer(1)])))
        );
        assert_eq!(record.get("s"), Some(&Value::from("1")));
    }
}
