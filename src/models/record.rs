//! Logical records and their identifiers.

use super::Value;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// Primary key field, assigned on insert and never modified.
pub const ID_FIELD: &str = "_id";
/// Creation timestamp field (ISO-8601), set once on insert.
pub const CREATED_AT_FIELD: &str = "_createdAt";
/// Modification timestamp field (ISO-8601), refreshed on every update.
pub const UPDATED_AT_FIELD: &str = "_updatedAt";
/// Internal extras payload column in hybrid mode. Never exposed on records.
pub const EXTRAS_FIELD: &str = "_extras";
/// Opaque payload column in schema-less mode. Never exposed on records.
pub const DATA_FIELD: &str = "_data";

/// Fields managed by the store that callers cannot set.
pub const RESERVED_FIELDS: [&str; 4] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD, EXTRAS_FIELD];

/// Returns true if `name` is a store-managed field.
#[must_use]
pub fn is_reserved_field(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// Unique identifier for a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates an identifier from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh identifier.
    ///
    /// Uses UUID v7, so identifiers generated later sort after earlier ones.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Self::Text(id.0)
    }
}

impl From<&RecordId> for Value {
    fn from(id: &RecordId) -> Self {
        Self::Text(id.0.clone())
    }
}

/// A logical record: field name to dynamically-typed value.
///
/// Fields are kept in key order so serialized payloads are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field, builder style.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns a mutable field value.
    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.fields.get_mut(field)
    }

    /// Removes a field.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Returns true if the field is present (even if null).
    #[must_use]
    pub fn contains_key(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    /// Iterates field names in key order.
    pub fn keys(&self) -> btree_map::Keys<'_, String, Value> {
        self.fields.keys()
    }

    /// The `_id` field, if present and textual.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD).and_then(Value::as_str)
    }

    /// The `_createdAt` field, if present and textual.
    #[must_use]
    pub fn created_at(&self) -> Option<&str> {
        self.get(CREATED_AT_FIELD).and_then(Value::as_str)
    }

    /// The `_updatedAt` field, if present and textual.
    #[must_use]
    pub fn updated_at(&self) -> Option<&str> {
        self.get(UPDATED_AT_FIELD).and_then(Value::as_str)
    }

    /// Overlays every non-reserved field of `patch` onto this record.
    pub fn apply_patch(&mut self, patch: &Self) {
        for (field, value) in patch.iter().filter(|(f, _)| !is_reserved_field(f)) {
            self.fields.insert(field.clone(), value.clone());
        }
    }

    /// Returns a copy without the store-managed fields.
    #[must_use]
    pub fn without_reserved(&self) -> Self {
        self.iter()
            .filter(|(f, _)| !is_reserved_field(f))
            .map(|(f, v)| (f.clone(), v.clone()))
            .collect()
    }

    /// Consumes the record, returning the underlying map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.fields
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        super::value::serialize_record(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(record) => Ok(record),
            other => Err(D::Error::custom(format!(
                "expected an object, found {}",
                other.type_name()
            ))),
        }
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Record {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.fields
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_generate_unique() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_record_id_generate_is_v7() {
        let id = RecordId::generate();
        let parsed = uuid::Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn test_reserved_accessors() {
        let record = Record::new()
            .with(ID_FIELD, "abc")
            .with(CREATED_AT_FIELD, "2024-01-01T00:00:00.000Z")
            .with(UPDATED_AT_FIELD, "2024-01-02T00:00:00.000Z")
            .with("name", "x");
        assert_eq!(record.id(), Some("abc"));
        assert_eq!(record.created_at(), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(record.updated_at(), Some("2024-01-02T00:00:00.000Z"));
    }

    #[test]
    fn test_apply_patch_skips_reserved() {
        let mut record = Record::new()
            .with(ID_FIELD, "keep")
            .with(CREATED_AT_FIELD, "then")
            .with("name", "old");
        let patch = Record::new()
            .with(ID_FIELD, "other")
            .with(CREATED_AT_FIELD, "now")
            .with(EXTRAS_FIELD, "{}")
            .with("name", "new")
            .with("extra", 1);

        record.apply_patch(&patch);

        assert_eq!(record.id(), Some("keep"));
        assert_eq!(record.created_at(), Some("then"));
        assert!(!record.contains_key(EXTRAS_FIELD));
        assert_eq!(record.get("name"), Some(&Value::from("new")));
        assert_eq!(record.get("extra"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_without_reserved() {
        let record = Record::new()
            .with(ID_FIELD, "a")
            .with(UPDATED_AT_FIELD, "b")
            .with("kept", true);
        let stripped = record.without_reserved();
        assert_eq!(stripped.len(), 1);
        assert!(stripped.contains_key("kept"));
    }

    #[test]
    fn test_serde_as_plain_object() {
        let record = Record::new().with("b", 2).with("a", "x");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"a":"x","b":2}"#);
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_serde_single_bytes_key_stays_a_record() {
        let record = Record::new().with("$bytes", "abcd");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"$object":{"$bytes":"abcd"}}"#);
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);

        assert!(serde_json::from_str::<Record>("[1]").is_err());
    }
}
