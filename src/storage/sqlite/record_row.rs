//! Conversion between table rows and logical records.
//!
//! Rows are read in [`column_names`](super::sql::column_names) order. Writes
//! produce parameter lists in the same order, so the statement builders and
//! this module must agree on the layout.

use crate::models::{
    CREATED_AT_FIELD, DATA_FIELD, ID_FIELD, Record, RecordId, UPDATED_AT_FIELD, Value,
};
use crate::schema::SchemaDefinition;
use crate::storage::mapping::{self, SplitRecord};
use crate::Result;
use rusqlite::Row;

/// Materializes one row into a logical record.
///
/// # Errors
///
/// Returns a `rusqlite` error if a column cannot be read. Corrupt payloads do
/// not error; see [`mapping::decode_payload`].
pub fn read_record(row: &Row<'_>, schema: Option<&SchemaDefinition>) -> rusqlite::Result<Record> {
    let id: String = row.get(0)?;
    match schema {
        Some(schema) => {
            let mut columns = Record::new().with(ID_FIELD, id);
            for (offset, name) in schema.field_names().enumerate() {
                let value: Value = row.get(offset + 1)?;
                columns.insert(name, value);
            }
            let base = schema.len() + 1;
            let extras: Option<String> = row.get(base)?;
            columns.insert(CREATED_AT_FIELD, row.get::<_, String>(base + 1)?);
            columns.insert(UPDATED_AT_FIELD, row.get::<_, String>(base + 2)?);
            Ok(mapping::merge(columns, extras.as_deref(), schema))
        },
        None => {
            let data: Option<String> = row.get(1)?;
            let mut record = mapping::decode_payload(DATA_FIELD, data.as_deref()).without_reserved();
            record.insert(ID_FIELD, id);
            record.insert(CREATED_AT_FIELD, row.get::<_, String>(2)?);
            record.insert(UPDATED_AT_FIELD, row.get::<_, String>(3)?);
            Ok(record)
        },
    }
}

/// Builds the payload columns shared by inserts and updates.
///
/// Hybrid: one value per schema field (NULL when absent) then the extras JSON.
/// Schema-less: the JSON of every non-reserved field.
fn payload_params(
    operation: &str,
    split: &SplitRecord,
    schema: Option<&SchemaDefinition>,
) -> Result<Vec<Value>> {
    match schema {
        Some(schema) => {
            let mut params: Vec<Value> = schema
                .field_names()
                .map(|name| split.schema_fields.get(name).cloned().unwrap_or_default())
                .collect();
            params.push(Value::Text(mapping::encode_payload(
                operation,
                &split.extra_fields,
            )?));
            Ok(params)
        },
        None => Ok(vec![Value::Text(mapping::encode_payload(
            operation,
            &split.extra_fields,
        )?)]),
    }
}

/// Parameters for [`insert_sql`](super::sql::insert_sql).
///
/// # Errors
///
/// Returns [`crate::Error::Serialization`] if the payload cannot be encoded.
pub fn insert_params(
    id: &RecordId,
    split: &SplitRecord,
    schema: Option<&SchemaDefinition>,
    timestamp: &str,
) -> Result<Vec<Value>> {
    let mut params = vec![Value::from(id)];
    params.extend(payload_params("encode_insert", split, schema)?);
    params.push(Value::from(timestamp));
    params.push(Value::from(timestamp));
    Ok(params)
}

/// Parameters for [`update_sql`](super::sql::update_sql).
///
/// # Errors
///
/// Returns [`crate::Error::Serialization`] if the payload cannot be encoded.
pub fn update_params(
    id: &str,
    split: &SplitRecord,
    schema: Option<&SchemaDefinition>,
    timestamp: &str,
) -> Result<Vec<Value>> {
    let mut params = payload_params("encode_update", split, schema)?;
    params.push(Value::from(timestamp));
    params.push(Value::from(id));
    Ok(params)
}

/// Assembles the logical record a write produced, as a read would return it.
///
/// Schema fields get the same read-time coercion as [`mapping::merge`].
#[must_use]
pub fn written_record(
    id: &str,
    split: SplitRecord,
    schema: Option<&SchemaDefinition>,
    created_at: &str,
    updated_at: &str,
) -> Record {
    let mut record: Record = split
        .schema_fields
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .collect();
    for (field, value) in split.extra_fields {
        record.insert(field, value);
    }
    record.insert(ID_FIELD, id);
    record.insert(CREATED_AT_FIELD, created_at);
    record.insert(UPDATED_AT_FIELD, updated_at);
    if let Some(schema) = schema {
        mapping::coerce_declared(&mut record, schema);
    }
    record
}
