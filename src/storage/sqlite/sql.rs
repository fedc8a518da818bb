//! SQL statement builders for record tables.
//!
//! Column layout, in order:
//!
//! - schema-less: `_id, _data, _createdAt, _updatedAt`
//! - hybrid: `_id, <schema fields...>, _extras, _createdAt, _updatedAt`
//!
//! Every identifier that comes from a schema is double-quoted; table names are
//! validated up front by [`validate_table_name`].

use crate::models::{CREATED_AT_FIELD, DATA_FIELD, EXTRAS_FIELD, ID_FIELD, UPDATED_AT_FIELD};
use crate::schema::SchemaDefinition;
use crate::{Error, Result};

/// Quotes an identifier for use in SQL, doubling embedded quotes.
///
/// # Examples
///
/// ```
/// use recordstore::storage::sqlite::quote_identifier;
///
/// assert_eq!(quote_identifier("name"), "\"name\"");
/// assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
/// ```
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Checks that a table name is a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`).
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] otherwise.
pub fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("invalid table name '{table}'")))
    }
}

/// Returns the names of the two timestamp indexes.
#[must_use]
pub fn index_names(table: &str) -> [String; 2] {
    [
        format!("idx_{table}_createdAt"),
        format!("idx_{table}_updatedAt"),
    ]
}

/// Builds the `CREATE TABLE IF NOT EXISTS` statement.
#[must_use]
pub fn create_table_sql(table: &str, schema: Option<&SchemaDefinition>) -> String {
    let mut columns = vec![format!("{} TEXT PRIMARY KEY", quote_identifier(ID_FIELD))];
    match schema {
        Some(schema) => {
            columns.extend(schema.iter().map(|(name, descriptor)| {
                format!("{} {}", quote_identifier(name), descriptor.column_type())
            }));
            columns.push(format!("{} TEXT", quote_identifier(EXTRAS_FIELD)));
        },
        None => columns.push(format!("{} TEXT NOT NULL", quote_identifier(DATA_FIELD))),
    }
    columns.push(format!("{} TEXT NOT NULL", quote_identifier(CREATED_AT_FIELD)));
    columns.push(format!("{} TEXT NOT NULL", quote_identifier(UPDATED_AT_FIELD)));

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_identifier(table),
        columns.join(", ")
    )
}

/// Builds the `CREATE INDEX IF NOT EXISTS` statements for both timestamps.
#[must_use]
pub fn create_index_sql(table: &str) -> [String; 2] {
    let [created, updated] = index_names(table);
    [
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}({})",
            quote_identifier(&created),
            quote_identifier(table),
            quote_identifier(CREATED_AT_FIELD)
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}({})",
            quote_identifier(&updated),
            quote_identifier(table),
            quote_identifier(UPDATED_AT_FIELD)
        ),
    ]
}

/// Builds the statements removing the table and its indexes.
#[must_use]
pub fn drop_sql(table: &str) -> Vec<String> {
    let mut statements: Vec<String> = index_names(table)
        .iter()
        .map(|index| format!("DROP INDEX IF EXISTS {}", quote_identifier(index)))
        .collect();
    statements.push(format!("DROP TABLE IF EXISTS {}", quote_identifier(table)));
    statements
}

/// Returns the ordered column list of a table layout.
#[must_use]
pub fn column_names(schema: Option<&SchemaDefinition>) -> Vec<&str> {
    let mut names = vec![ID_FIELD];
    match schema {
        Some(schema) => {
            names.extend(schema.field_names());
            names.push(EXTRAS_FIELD);
        },
        None => names.push(DATA_FIELD),
    }
    names.push(CREATED_AT_FIELD);
    names.push(UPDATED_AT_FIELD);
    names
}

fn quoted_columns(schema: Option<&SchemaDefinition>) -> Vec<String> {
    column_names(schema)
        .into_iter()
        .map(quote_identifier)
        .collect()
}

/// Builds a full-table `SELECT` in insertion order.
#[must_use]
pub fn select_all_sql(table: &str, schema: Option<&SchemaDefinition>) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY rowid",
        quoted_columns(schema).join(", "),
        quote_identifier(table)
    )
}

/// Builds a primary-key `SELECT` with the key bound to `?1`.
#[must_use]
pub fn select_by_id_sql(table: &str, schema: Option<&SchemaDefinition>) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = ?1",
        quoted_columns(schema).join(", "),
        quote_identifier(table),
        quote_identifier(ID_FIELD)
    )
}

/// Builds the `INSERT` statement; parameters follow [`column_names`] order.
#[must_use]
pub fn insert_sql(table: &str, schema: Option<&SchemaDefinition>) -> String {
    let columns = quoted_columns(schema);
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Builds the `UPDATE` statement for one row.
///
/// Parameters: every column after `_id` except `_createdAt`, in
/// [`column_names`] order, then the `_id` last.
#[must_use]
pub fn update_sql(table: &str, schema: Option<&SchemaDefinition>) -> String {
    let assignments: Vec<String> = column_names(schema)
        .into_iter()
        .filter(|c| *c != ID_FIELD && *c != CREATED_AT_FIELD)
        .enumerate()
        .map(|(i, c)| format!("{} = ?{}", quote_identifier(c), i + 1))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {} = ?{}",
        quote_identifier(table),
        assignments.join(", "),
        quote_identifier(ID_FIELD),
        assignments.len() + 1
    )
}

/// Builds the primary-key `DELETE` statement.
#[must_use]
pub fn delete_by_id_sql(table: &str) -> String {
    format!(
        "DELETE FROM {} WHERE {} = ?1",
        quote_identifier(table),
        quote_identifier(ID_FIELD)
    )
}

/// Builds the statement deleting every row.
#[must_use]
pub fn clear_sql(table: &str) -> String {
    format!("DELETE FROM {}", quote_identifier(table))
}

/// Builds the `COUNT(*)` statement.
#[must_use]
pub fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_identifier(table))
}
