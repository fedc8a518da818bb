//! Schema definitions: ordered field name to type descriptor mappings.

use super::types::TypeDescriptor;
use crate::models::RESERVED_FIELDS;
use crate::{Error, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Names `SQLite` resolves to the implicit row id that orders query results.
const ROW_ID_ALIASES: [&str; 3] = ["rowid", "oid", "_rowid_"];

/// Ordered mapping from field name to declared type.
///
/// Field order is the column order of the hybrid table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDefinition {
    fields: Vec<(String, TypeDescriptor)>,
}

impl SchemaDefinition {
    /// Creates an empty schema.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds a field, builder style.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, descriptor: impl Into<TypeDescriptor>) -> Self {
        self.insert(name, descriptor);
        self
    }

    /// Declares a field. Redeclaring a field replaces its type in place.
    pub fn insert(&mut self, name: impl Into<String>, descriptor: impl Into<TypeDescriptor>) {
        let name = name.into();
        let descriptor = descriptor.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = descriptor,
            None => self.fields.push((name, descriptor)),
        }
    }

    /// Returns the declared type of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.fields
            .iter()
            .find_map(|(n, d)| (n == name).then_some(d))
    }

    /// Returns true if the field is schema-owned.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeDescriptor)> {
        self.fields.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Iterates field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parses a schema from a JSON object of `field: descriptor` entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the text is not such an object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidInput(format!("schema: {e}")))
    }

    /// Checks that every field can become a column.
    ///
    /// Column names are case-insensitive, so collisions are checked ignoring
    /// ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for empty names, names that collide with
    /// store-managed fields or `SQLite`'s implicit row id, and duplicate names.
    pub fn validate(&self) -> Result<()> {
        for (index, (name, _)) in self.fields.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(Error::InvalidInput(
                    "schema field names must not be empty".to_string(),
                ));
            }
            if RESERVED_FIELDS
                .iter()
                .chain(ROW_ID_ALIASES.iter())
                .any(|reserved| reserved.eq_ignore_ascii_case(name))
            {
                return Err(Error::InvalidInput(format!(
                    "schema field '{name}' collides with a reserved field"
                )));
            }
            if let Some((other, _)) = self.fields[..index]
                .iter()
                .find(|(other, _)| other.eq_ignore_ascii_case(name))
            {
                return Err(Error::InvalidInput(format!(
                    "schema fields '{other}' and '{name}' map to the same column"
                )));
            }
        }
        Ok(())
    }
}

/// Anything that can describe the fields of a schema.
///
/// Implemented by [`SchemaDefinition`] itself and by plain maps, so callers can
/// attach whatever schema representation they already have.
pub trait FieldDefinitions {
    /// Returns the field definitions as an ordered mapping.
    fn field_definitions(&self) -> SchemaDefinition;
}

impl FieldDefinitions for SchemaDefinition {
    fn field_definitions(&self) -> SchemaDefinition {
        self.clone()
    }
}

impl<D: Clone + Into<TypeDescriptor>> FieldDefinitions for BTreeMap<String, D> {
    fn field_definitions(&self) -> SchemaDefinition {
        self.iter()
            .fold(SchemaDefinition::new(), |schema, (name, d)| {
                schema.with_field(name.clone(), d.clone())
            })
    }
}

/// Hash maps have no order; fields are sorted by name for a stable layout.
impl<D: Clone + Into<TypeDescriptor>> FieldDefinitions for HashMap<String, D> {
    fn field_definitions(&self) -> SchemaDefinition {
        let mut names: Vec<&String> = self.keys().collect();
        names.sort();
        names.into_iter().fold(SchemaDefinition::new(), |schema, name| {
            let descriptor = self[name].clone();
            schema.with_field(name.clone(), descriptor)
        })
    }
}

impl<S: AsRef<str>, D: Clone + Into<TypeDescriptor>> FieldDefinitions for [(S, D)] {
    fn field_definitions(&self) -> SchemaDefinition {
        self.iter()
            .fold(SchemaDefinition::new(), |schema, (name, d)| {
                schema.with_field(name.as_ref(), d.clone())
            })
    }
}

impl<S: AsRef<str>, D: Clone + Into<TypeDescriptor>> FieldDefinitions for Vec<(S, D)> {
    fn field_definitions(&self) -> SchemaDefinition {
        self.as_slice().field_definitions()
    }
}

impl Serialize for SchemaDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, descriptor) in &self.fields {
            map.serialize_entry(name, descriptor)?;
        }
        map.end()
    }
}

struct SchemaVisitor;

impl<'de> Visitor<'de> for SchemaVisitor {
    type Value = SchemaDefinition;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of field names to type descriptors")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut schema = SchemaDefinition::new();
        while let Some((name, descriptor)) = access.next_entry::<String, TypeDescriptor>()? {
            schema.insert(name, descriptor);
        }
        Ok(schema)
    }
}

impl<'de> Deserialize<'de> for SchemaDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(SchemaVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use crate::schema::types::ColumnType;
    use test_case::test_case;

    #[test]
    fn test_insert_preserves_order_and_replaces() {
        let mut schema = SchemaDefinition::new()
            .with_field("b", FieldType::String)
            .with_field("a", FieldType::Number);
        schema.insert("b", FieldType::Boolean);

        let names: Vec<&str> = schema.field_names().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(schema.get("b").unwrap().is_boolean());
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn test_json_parse_keeps_declaration_order() {
        let schema = SchemaDefinition::from_json_str(
            r#"{"zeta":"STRING","alpha":{"type":"NUMBER_INT","indexed":true},"mid":"BOOLEAN"}"#,
        )
        .unwrap();
        let names: Vec<&str> = schema.field_names().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(schema.get("alpha").unwrap().column_type(), ColumnType::Integer);
    }

    #[test]
    fn test_json_parse_rejects_non_object() {
        assert!(matches!(
            SchemaDefinition::from_json_str("[1,2]"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_serialize_round_trip() {
        let schema = SchemaDefinition::new()
            .with_field("name", FieldType::String)
            .with_field("meta", TypeDescriptor::structured("JSON"));
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r#"{"name":"STRING","meta":{"type":"JSON"}}"#);
        assert_eq!(SchemaDefinition::from_json_str(&json).unwrap(), schema);
    }

    #[test]
    fn test_validate_rejects_reserved_names() {
        for reserved in ["_id", "_createdAt", "_updatedAt", "_extras"] {
            let schema = SchemaDefinition::new().with_field(reserved, FieldType::String);
            assert!(matches!(schema.validate(), Err(Error::InvalidInput(_))));
        }
        let schema = SchemaDefinition::new().with_field(" ", FieldType::String);
        assert!(schema.validate().is_err());
        let schema = SchemaDefinition::new().with_field("ok", FieldType::String);
        assert!(schema.validate().is_ok());
    }

    #[test_case("_ID" ; "id upper")]
    #[test_case("_CreatedAt" ; "created at mixed case")]
    #[test_case("_UPDATEDAT" ; "updated at upper")]
    #[test_case("_EXTRAS" ; "extras upper")]
    #[test_case("rowid" ; "rowid")]
    #[test_case("ROWID" ; "rowid upper")]
    #[test_case("oid" ; "oid")]
    #[test_case("_RowId_" ; "rowid underscored")]
    fn test_validate_rejects_reserved_names_ignoring_case(name: &str) {
        let schema = SchemaDefinition::new().with_field(name, FieldType::NumberInt);
        assert!(matches!(schema.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_validate_rejects_case_insensitive_duplicates() {
        let schema = SchemaDefinition::new()
            .with_field("Name", FieldType::String)
            .with_field("name", FieldType::String);
        assert_eq!(schema.len(), 2);
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("'Name' and 'name'"));
    }

    #[test]
    fn test_field_definitions_from_maps() {
        let mut btree = BTreeMap::new();
        btree.insert("b".to_string(), FieldType::Boolean);
        btree.insert("a".to_string(), FieldType::Number);
        let names: Vec<String> = btree
            .field_definitions()
            .field_names()
            .map(str::to_string)
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        let mut hash = HashMap::new();
        hash.insert("y".to_string(), "STRING");
        hash.insert("x".to_string(), "DATE");
        let schema = hash.field_definitions();
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["x", "y"]);

        let pairs = vec![("first", FieldType::Date), ("second", FieldType::Blob)];
        let schema = pairs.field_definitions();
        assert_eq!(schema.get("second").unwrap().column_type(), ColumnType::Blob);
    }
}
