//! Exact-match record filters.

use super::record::ID_FIELD;
use super::{Record, Value};
use std::collections::BTreeMap;

/// Exact-match filter: every entry must equal the record's field.
///
/// Equality is strict (see [`Value`]); a record missing a filtered field never
/// matches. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: BTreeMap<String, Value>,
}

impl Filter {
    /// Creates an empty filter, matching every record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            conditions: BTreeMap::new(),
        }
    }

    /// Alias of [`Filter::new`] that reads better at call sites.
    #[must_use]
    pub const fn all() -> Self {
        Self::new()
    }

    /// Filter on the primary key.
    #[must_use]
    pub fn by_id(id: impl Into<Value>) -> Self {
        Self::new().with(ID_FIELD, id)
    }

    /// Adds an equality condition, builder style.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.into(), value.into());
        self
    }

    /// Returns true if the filter has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Iterates conditions in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.conditions.iter()
    }

    /// Returns true if every condition equals the record's field.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| record.get(field) == Some(expected))
    }

    /// Returns the looked-up key when the filter is exactly `{_id: v}`.
    #[must_use]
    pub fn id_lookup(&self) -> Option<&Value> {
        if self.conditions.len() == 1 {
            self.conditions.get(ID_FIELD)
        } else {
            None
        }
    }
}

impl From<Record> for Filter {
    fn from(record: Record) -> Self {
        Self {
            conditions: record.into_inner(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            conditions: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::new()
            .with(ID_FIELD, "r1")
            .with("role", "admin")
            .with("age", 30)
            .with("note", Value::Null)
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(Filter::all().matches(&sample()));
        assert!(Filter::all().matches(&Record::new()));
    }

    #[test]
    fn test_strict_equality() {
        let record = sample();
        assert!(Filter::new().with("role", "admin").matches(&record));
        assert!(!Filter::new().with("role", "user").matches(&record));
        assert!(!Filter::new().with("age", "30").matches(&record));
        assert!(Filter::new().with("age", 30.0).matches(&record));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let record = sample();
        assert!(!Filter::new().with("missing", Value::Null).matches(&record));
        assert!(Filter::new().with("note", Value::Null).matches(&record));
    }

    #[test]
    fn test_all_conditions_required() {
        let record = sample();
        let filter = Filter::new().with("role", "admin").with("age", 31);
        assert!(!filter.matches(&record));
    }

    #[test]
    fn test_id_lookup_shape() {
        assert_eq!(Filter::by_id("r1").id_lookup(), Some(&Value::from("r1")));
        assert!(Filter::by_id("r1").with("role", "admin").id_lookup().is_none());
        assert!(Filter::new().with("role", "admin").id_lookup().is_none());
        assert!(Filter::all().id_lookup().is_none());
    }
}
