//! Dynamically-typed field values.
//!
//! [`Value`] is the tagged variant every record field holds. It converts
//! explicitly at both storage boundaries: JSON (for `_data`/`_extras`
//! payloads) and `SQLite` (for typed columns).

use super::Record;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Key marking a binary blob inside a JSON payload.
pub const BYTES_KEY: &str = "$bytes";

/// Key wrapping a caller object that would otherwise read back as a marker.
pub const OBJECT_KEY: &str = "$object";

/// A dynamically-typed record field value.
///
/// Numbers compare numerically across [`Value::Integer`] and [`Value::Real`]
/// so `1` and `1.0` are equal. No other cross-variant equality exists: `"1"`
/// does not equal `1` and `true` does not equal `1`.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent or explicit null.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// Double-precision float.
    Real(f64),
    /// UTF-8 text, including ISO-8601 dates.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
    /// Ordered list of values.
    Array(Vec<Self>),
    /// Nested mapping.
    Object(Record),
}

impl Value {
    /// Returns a short name of the variant, for logs and error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Returns true for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the text content, if this is a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is an integer value.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the number as a float, for integer or real values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the bytes, if this is a blob value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the nested record, if this is an object value.
    #[must_use]
    pub const fn as_object(&self) -> Option<&Record> {
        match self {
            Self::Object(r) => Some(r),
            _ => None,
        }
    }

    /// Converts a `serde_json` value.
    ///
    /// Objects of the form `{"$bytes": "<hex>"}` decode to [`Value::Blob`].
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| n.as_f64().map_or(Self::Null, Self::Real), Self::Integer),
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from_json).collect())
            },
            serde_json::Value::Object(mut map) => {
                if let Some(bytes) = decode_bytes_marker(&map) {
                    return Self::Blob(bytes);
                }
                if let Some(serde_json::Value::Object(inner)) = take_object_escape(&mut map) {
                    map = inner;
                }
                Self::Object(
                    map.into_iter()
                        .map(|(k, v)| (k, Self::from_json(v)))
                        .collect(),
                )
            },
        }
    }
}

/// Removes the `{"$object": {...}}` wrapper, returning the wrapped object.
fn take_object_escape(
    map: &mut serde_json::Map<String, serde_json::Value>,
) -> Option<serde_json::Value> {
    let is_escape = map.len() == 1 && map.get(OBJECT_KEY).is_some_and(serde_json::Value::is_object);
    if is_escape { map.remove(OBJECT_KEY) } else { None }
}

/// Returns true if a single-key object could be mistaken for a marker on read.
fn needs_object_escape(record: &Record) -> bool {
    record.len() == 1 && (record.contains_key(BYTES_KEY) || record.contains_key(OBJECT_KEY))
}

/// Serializes a record as a JSON object.
///
/// Objects whose only key is `$bytes` or `$object` are wrapped in
/// `{"$object": {...}}` so they never decode as a blob.
pub(crate) fn serialize_record<S: Serializer>(
    record: &Record,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    struct Entries<'a>(&'a Record);

    impl Serialize for Entries<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_map(self.0.iter())
        }
    }

    if needs_object_escape(record) {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(OBJECT_KEY, &Entries(record))?;
        map.end()
    } else {
        Entries(record).serialize(serializer)
    }
}

/// Decodes `{"$bytes": "<hex>"}`; any other shape is a plain object.
fn decode_bytes_marker(map: &serde_json::Map<String, serde_json::Value>) -> Option<Vec<u8>> {
    if map.len() != 1 {
        return None;
    }
    map.get(BYTES_KEY)
        .and_then(serde_json::Value::as_str)
        .and_then(|encoded| hex::decode(encoded).ok())
}

impl PartialEq for Value {
    #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a == b,
            (Self::Integer(i), Self::Real(r)) | (Self::Real(r), Self::Integer(i)) => {
                *i as f64 == *r
            },
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Blob(a), Self::Blob(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Real(f) => serializer.serialize_f64(*f),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Blob(bytes) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(BYTES_KEY, &hex::encode(bytes))?;
                map.end()
            },
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            },
            Self::Object(record) => serialize_record(record, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from_json)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as SqlValue;

        let output = match self {
            Self::Null => ToSqlOutput::Owned(SqlValue::Null),
            Self::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Self::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Self::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Self::Array(_) | Self::Object(_) => {
                let json = serde_json::to_string(self)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                ToSqlOutput::Owned(SqlValue::Text(json))
            },
        };
        Ok(output)
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(f) => Self::Real(f),
            ValueRef::Text(t) => Self::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Self::Blob(b.to_vec()),
        })
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Real(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Blob(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self::Blob(bytes.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Object(record)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Text(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Self::from_json(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Value::Integer(1), Value::Real(1.0), true ; "integer equals integral real")]
    #[test_case(Value::Real(2.5), Value::Integer(2), false ; "fractional real differs")]
    #[test_case(Value::Text("1".into()), Value::Integer(1), false ; "text never equals number")]
    #[test_case(Value::Bool(true), Value::Integer(1), false ; "bool never equals number")]
    #[test_case(Value::Null, Value::Null, true ; "null equals null")]
    #[test_case(Value::Null, Value::Text(String::new()), false ; "null differs from empty text")]
    fn test_equality(a: Value, b: Value, expected: bool) {
        assert_eq!(a == b, expected);
        assert_eq!(b == a, expected);
    }

    #[test]
    fn test_blob_json_encoding() {
        let value = Value::Blob(vec![0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"$bytes":"deadbeef"}"#);

        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_bytes_marker_requires_single_key() {
        let back: Value = serde_json::from_str(r#"{"$bytes":"00","other":1}"#).unwrap();
        assert!(matches!(back, Value::Object(_)));

        let back: Value = serde_json::from_str(r#"{"$bytes":"not hex"}"#).unwrap();
        assert!(matches!(back, Value::Object(_)));
    }

    #[test_case(r#"{"$bytes":"abcd"}"# ; "bytes shaped")]
    #[test_case(r#"{"$bytes":"zz"}"# ; "bytes key with non hex")]
    #[test_case(r#"{"$object":{"a":1}}"# ; "object escape shaped")]
    #[test_case(r#"{"$object":"text"}"# ; "object key with text")]
    fn test_marker_shaped_objects_round_trip(json: &str) {
        let inner: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json).unwrap();
        let value = Value::Object(
            inner
                .into_iter()
                .map(|(k, v)| (k, Value::from_json(v)))
                .collect(),
        );
        let encoded = serde_json::to_string(&value).unwrap();
        assert!(encoded.starts_with(r#"{"$object":"#));

        let back: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_plain_objects_are_not_escaped() {
        let value = Value::Object(Record::new().with("$bytes", "abcd").with("n", 1));
        let encoded = serde_json::to_string(&value).unwrap();
        assert_eq!(encoded, r#"{"$bytes":"abcd","n":1}"#);
        assert_eq!(serde_json::from_str::<Value>(&encoded).unwrap(), value);
    }

    #[test]
    fn test_json_numbers() {
        let value: Value = serde_json::from_str("42").unwrap();
        assert!(matches!(value, Value::Integer(42)));

        let value: Value = serde_json::from_str("4.5").unwrap();
        assert!(matches!(value, Value::Real(f) if (f - 4.5).abs() < f64::EPSILON));

        let value: Value = serde_json::from_str("18446744073709551615").unwrap();
        assert!(matches!(value, Value::Real(_)));
    }

    #[test]
    fn test_nested_json() {
        let value: Value = serde_json::from_str(r#"{"tags":["a","b"],"meta":{"n":1}}"#).unwrap();
        let record = value.as_object().unwrap();
        assert_eq!(
            record.get("tags"),
            Some(&Value::Array(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            record.get("meta").and_then(Value::as_object).and_then(|m| m.get("n")),
            Some(&Value::Integer(1))
        );
    }

    #[test]
    fn test_sql_round_trip() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let values = [
            Value::Null,
            Value::Integer(-7),
            Value::Real(0.25),
            Value::Text("hello".into()),
            Value::Blob(vec![1, 2, 3]),
        ];
        for value in values {
            let back: Value = conn
                .query_row("SELECT ?1", [&value], |row| row.get(0))
                .unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_sql_encodes_bool_and_nested() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let back: Value = conn
            .query_row("SELECT ?1", [&Value::Bool(true)], |row| row.get(0))
            .unwrap();
        assert_eq!(back, Value::Integer(1));

        let nested = Value::Array(vec![Value::Integer(1), Value::Text("x".into())]);
        let back: Value = conn
            .query_row("SELECT ?1", [&nested], |row| row.get(0))
            .unwrap();
        assert_eq!(back, Value::Text(r#"[1,"x"]"#.into()));
    }

    #[test]
    fn test_from_datetime() {
        let ts = chrono::TimeZone::timestamp_opt(&Utc, 0, 0).single().unwrap();
        assert_eq!(Value::from(ts), Value::Text("1970-01-01T00:00:00.000Z".into()));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }
}
