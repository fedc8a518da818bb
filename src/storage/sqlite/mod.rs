//! `SQLite` record store.
//!
//! ## Module Structure
//!
//! - [`connection`]: opening the database and applying pragmas
//! - [`sql`]: identifier quoting and statement builders for both table layouts
//! - [`record_row`]: row to record conversion and write parameters
//! - [`metrics`]: operation metrics helpers
//! - [`store`]: [`SqliteRecordStore`], the [`RecordDriver`](crate::storage::RecordDriver) implementation
//!
//! ## Table Layouts
//!
//! | Mode | Columns |
//! |------|---------|
//! | Schema-less | `_id`, `_data`, `_createdAt`, `_updatedAt` |
//! | Hybrid | `_id`, one column per schema field, `_extras`, `_createdAt`, `_updatedAt` |
//!
//! Both layouts index `_createdAt` and `_updatedAt`.

mod connection;
mod metrics;
mod record_row;
mod sql;
mod store;

pub use connection::{configure_connection, open_connection};
pub use metrics::{record_operation_metrics, record_rows_affected};
pub use record_row::{insert_params, read_record, update_params, written_record};
pub use sql::{
    clear_sql, column_names, count_sql, create_index_sql, create_table_sql, delete_by_id_sql,
    drop_sql, index_names, insert_sql, quote_identifier, select_all_sql, select_by_id_sql,
    update_sql, validate_table_name,
};
pub use store::{SqliteRecordStore, StorageMode, StoreStats};
