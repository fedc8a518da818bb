//! Property-based tests for type mapping, record splitting and storage.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Type mapping is deterministic and falls back to TEXT
//! - Splitting partitions non-reserved fields totally and disjointly
//! - Schema-less records round-trip through the store unchanged
//! - Filters select exactly the strictly-equal subset

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use recordstore::schema::{ColumnType, FieldType, TypeDescriptor, column_type_for};
use recordstore::storage::split;
use recordstore::{Filter, Record, RecordDriver, SchemaDefinition, SqliteRecordStore, StoreConfig, Value};

fn field_name() -> impl Strategy<Value = String> {
    prop_oneof![
        8 => "[a-z][a-z0-9_]{0,11}",
        1 => Just("$bytes".to_string()),
        1 => Just("$object".to_string()),
    ]
}

/// Leaf values that survive JSON unchanged.
fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9..1.0e9f64).prop_map(Value::Real),
        "[ -~]{0,24}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Blob),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf_value().prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(field_name(), inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn record() -> impl Strategy<Value = Record> {
    prop::collection::btree_map(field_name(), value(), 0..8).prop_map(|m| m.into_iter().collect())
}

// ============================================================================
// Type mapping
// ============================================================================

proptest! {
    /// Property: mapping the same descriptor twice yields the same column type.
    #[test]
    fn prop_type_mapping_is_deterministic(tag in "[A-Z_]{0,16}") {
        let descriptor = TypeDescriptor::tag(tag.clone());
        prop_assert_eq!(column_type_for(&descriptor), column_type_for(&descriptor));
        prop_assert_eq!(
            column_type_for(&descriptor),
            column_type_for(&TypeDescriptor::structured(tag))
        );
    }

    /// Property: tags matching no rule map to TEXT.
    #[test]
    fn prop_unknown_tags_fall_back_to_text(tag in "[QWXYZ]{1,12}") {
        prop_assert_eq!(column_type_for(&TypeDescriptor::tag(tag)), ColumnType::Text);
    }
}

// ============================================================================
// Splitting
// ============================================================================

proptest! {
    /// Property: every non-reserved field lands in exactly one half, unchanged.
    #[test]
    fn prop_split_is_total_and_disjoint(
        input in record(),
        schema_fields in prop::collection::btree_set(field_name(), 0..6),
    ) {
        let schema = schema_fields
            .iter()
            .fold(SchemaDefinition::new(), |s, name| s.with_field(name.as_str(), FieldType::String));
        let out = split(&input, Some(&schema));

        prop_assert_eq!(out.schema_fields.len() + out.extra_fields.len(), input.len());
        for (field, value) in input.iter() {
            let in_schema = out.schema_fields.get(field);
            let in_extras = out.extra_fields.get(field);
            prop_assert!(in_schema.is_some() != in_extras.is_some());
            prop_assert_eq!(in_schema.is_some(), schema.contains(field));
            prop_assert_eq!(in_schema.or(in_extras), Some(value));
        }
    }

    /// Property: without a schema every field is an extra.
    #[test]
    fn prop_split_without_schema_keeps_everything_extra(input in record()) {
        let out = split(&input, None);
        prop_assert!(out.schema_fields.is_empty());
        prop_assert_eq!(out.extra_fields, input);
    }
}

// ============================================================================
// Store
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: schema-less records read back equal to what was inserted.
    #[test]
    fn prop_schemaless_round_trip(input in record()) {
        let store = SqliteRecordStore::open(StoreConfig::in_memory()).unwrap();
        let created = store.insert(input.clone()).unwrap();
        let read = store
            .query_one(&Filter::by_id(created.id().unwrap()))
            .unwrap()
            .unwrap();

        prop_assert_eq!(read.without_reserved(), input);
        prop_assert_eq!(read.len(), created.len());
    }

    /// Property: filtering selects exactly the strictly-equal subset.
    #[test]
    fn prop_filter_selects_equal_subset(roles in prop::collection::vec(prop::option::of("[ab]"), 1..12)) {
        let store = SqliteRecordStore::open(StoreConfig::in_memory()).unwrap();
        for role in &roles {
            let mut record = Record::new();
            if let Some(role) = role {
                record.insert("role", role.as_str());
            }
            store.insert(record).unwrap();
        }

        let expected = roles.iter().filter(|r| r.as_deref() == Some("a")).count();
        let filter = Filter::new().with("role", "a");
        prop_assert_eq!(store.query(&filter).unwrap().len(), expected);
        prop_assert_eq!(store.count(&filter).unwrap(), expected);
        prop_assert_eq!(store.exists(&filter).unwrap(), expected > 0);
    }
}
