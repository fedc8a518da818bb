//! Field type descriptors and their storage column types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Storage column type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// `TEXT` column.
    Text,
    /// `INTEGER` column.
    Integer,
    /// `REAL` column.
    Real,
    /// `BLOB` column.
    Blob,
}

impl ColumnType {
    /// Returns the SQL type name.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Well-known field type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Text.
    String,
    /// Floating-point number.
    Number,
    /// Integer number.
    NumberInt,
    /// Boolean, stored as `0/1`.
    Boolean,
    /// ISO-8601 date string.
    Date,
    /// Binary data.
    Blob,
}

impl FieldType {
    /// Returns the tag string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::NumberInt => "NUMBER_INT",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Blob => "BLOB",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a schema field.
///
/// Either a bare tag (`"STRING"`) or a structured descriptor carrying a `type`
/// tag plus arbitrary metadata (`{"type": "STRING", "required": true}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDescriptor {
    /// Bare type tag.
    Tag(String),
    /// Structured descriptor.
    Structured {
        /// The type tag.
        #[serde(rename = "type")]
        kind: String,
        /// Any other descriptor keys. Opaque to the store.
        #[serde(flatten)]
        metadata: BTreeMap<String, serde_json::Value>,
    },
}

impl TypeDescriptor {
    /// Creates a bare-tag descriptor.
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    /// Creates a structured descriptor with no metadata.
    #[must_use]
    pub fn structured(kind: impl Into<String>) -> Self {
        Self::Structured {
            kind: kind.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Returns the type tag, unwrapping structured descriptors.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Tag(tag) => tag,
            Self::Structured { kind, .. } => kind,
        }
    }

    /// Returns the storage column type for this descriptor.
    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        column_type_for(self)
    }

    /// Returns true if values are stored as `0/1` and read back as booleans.
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        classify(self.type_tag()) == TagClass::Boolean
    }

    /// Returns true if values are stored as JSON text and parsed back on read.
    #[must_use]
    pub fn is_json_encoded(&self) -> bool {
        if classify(self.type_tag()) != TagClass::Fallback {
            return false;
        }
        let tag = normalize(self.type_tag());
        ["JSON", "OBJECT", "ARRAY"].iter().any(|k| tag.contains(k))
    }
}

impl From<FieldType> for TypeDescriptor {
    fn from(field_type: FieldType) -> Self {
        Self::Tag(field_type.as_str().to_string())
    }
}

impl From<&str> for TypeDescriptor {
    fn from(tag: &str) -> Self {
        Self::Tag(tag.to_string())
    }
}

impl From<String> for TypeDescriptor {
    fn from(tag: String) -> Self {
        Self::Tag(tag)
    }
}

/// Which resolution rule a tag lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagClass {
    Text,
    Integer,
    Real,
    Boolean,
    Date,
    Blob,
    Fallback,
}

fn normalize(tag: &str) -> String {
    tag.trim().to_uppercase()
}

/// Rules are checked in order; the first match wins.
fn classify(tag: &str) -> TagClass {
    let tag = normalize(tag);
    let has = |needle: &str| tag.contains(needle);

    if ["STRING", "TEXT", "EMAIL", "URL", "UUID", "CHAR"]
        .iter()
        .any(|k| has(k))
    {
        TagClass::Text
    } else if has("NUMBER") {
        if has("INT") {
            TagClass::Integer
        } else {
            TagClass::Real
        }
    } else if has("BOOLEAN") {
        TagClass::Boolean
    } else if has("DATE") {
        TagClass::Date
    } else if has("BLOB") || has("BUFFER") {
        TagClass::Blob
    } else {
        TagClass::Fallback
    }
}

/// Maps a field type descriptor to its storage column type.
///
/// Matching is a case-insensitive substring test on the type tag. Unknown tags
/// fall back to `TEXT`; this never fails.
///
/// # Examples
///
/// ```
/// use recordstore::schema::{ColumnType, TypeDescriptor, column_type_for};
///
/// assert_eq!(column_type_for(&"STRING".into()), ColumnType::Text);
/// assert_eq!(column_type_for(&"NUMBER".into()), ColumnType::Real);
/// assert_eq!(column_type_for(&TypeDescriptor::structured("NUMBER_INT")), ColumnType::Integer);
/// assert_eq!(column_type_for(&"BOOLEAN".into()), ColumnType::Integer);
/// assert_eq!(column_type_for(&"UNKNOWN_TAG".into()), ColumnType::Text);
/// ```
#[must_use]
pub fn column_type_for(descriptor: &TypeDescriptor) -> ColumnType {
    match classify(descriptor.type_tag()) {
        TagClass::Text | TagClass::Date | TagClass::Fallback => ColumnType::Text,
        TagClass::Integer | TagClass::Boolean => ColumnType::Integer,
        TagClass::Real => ColumnType::Real,
        TagClass::Blob => ColumnType::Blob,
    }
}
