//! `SQLite`-backed record store.
//!
//! One table per store. Without a schema each row holds the record as a JSON
//! blob in `_data`; with a schema, declared fields get typed columns and the
//! rest goes to `_extras`. Queries materialize rows and filter them in memory,
//! except primary-key lookups, which go straight to the index.

use super::connection::{configure_connection, open_connection};
use super::metrics::{record_operation_metrics, record_rows_affected};
use super::record_row::{insert_params, read_record, update_params, written_record};
use super::sql;
use crate::config::StoreConfig;
use crate::models::{Filter, Record, RecordId, Value};
use crate::schema::{FieldDefinitions, SchemaDefinition};
use crate::storage::mapping;
use crate::storage::traits::RecordDriver;
use crate::{Error, Result, current_timestamp};
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// How records are laid out in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// One JSON blob per row (`_data`).
    Blob,
    /// Typed columns for schema fields plus a JSON `_extras` payload.
    Hybrid,
}

impl StorageMode {
    /// Returns the mode name used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database statistics for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Storage mode of the table.
    pub mode: StorageMode,
    /// Number of rows in the table.
    pub row_count: u64,
    /// Pages in the database file.
    pub page_count: u64,
    /// Page size in bytes.
    pub page_size: u64,
    /// Total database size in bytes.
    pub db_size_bytes: u64,
}

enum ConnectionState {
    Disconnected,
    Connected(Connection),
}

/// `SQLite`-backed implementation of [`RecordDriver`].
///
/// # Concurrency Model
///
/// The store owns its connection outright and adds no locking. Every
/// operation completes before returning, so one store never interleaves two
/// operations. Sharing a database file across stores or processes relies on
/// `SQLite`'s own file locking (WAL plus `busy_timeout`).
///
/// # Examples
///
/// ```no_run
/// use recordstore::{Filter, Record, RecordDriver, SqliteRecordStore, StoreConfig};
///
/// let mut store = SqliteRecordStore::new(StoreConfig::new("./data/records.db"));
/// store.connect()?;
/// let created = store.insert(Record::new().with("role", "admin"))?;
/// let found = store.query_one(&Filter::by_id(created.id().unwrap_or_default()))?;
/// assert!(found.is_some());
/// # Ok::<(), recordstore::Error>(())
/// ```
pub struct SqliteRecordStore {
    config: StoreConfig,
    schema: Option<SchemaDefinition>,
    state: ConnectionState,
}

impl SqliteRecordStore {
    /// Creates a disconnected, schema-less store.
    #[must_use]
    pub const fn new(config: StoreConfig) -> Self {
        Self {
            config,
            schema: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Creates a store and connects it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let mut store = Self::new(config);
        store.connect()?;
        Ok(store)
    }

    /// Creates a store with a schema attached, then connects it.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is invalid or the database cannot be
    /// opened or initialized.
    pub fn open_with_schema(config: StoreConfig, schema: &dyn FieldDefinitions) -> Result<Self> {
        let mut store = Self::new(config);
        store.set_schema(schema)?;
        store.connect()?;
        Ok(store)
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.config.table
    }

    /// Returns the storage mode the schema state selects.
    #[must_use]
    pub const fn mode(&self) -> StorageMode {
        if self.schema.is_some() {
            StorageMode::Hybrid
        } else {
            StorageMode::Blob
        }
    }

    fn conn(&self) -> Result<&Connection> {
        match &self.state {
            ConnectionState::Connected(conn) => Ok(conn),
            ConnectionState::Disconnected => Err(Error::NotConnected),
        }
    }

    /// Runs `f` against the open connection and records operation metrics.
    fn observe<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let start = Instant::now();
        let result = self.conn().and_then(f);
        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics(self.mode().as_str(), operation, start, status);
        result
    }

    /// Opens the database and creates the table and indexes if absent.
    fn open_and_initialize(&self) -> Result<Connection> {
        sql::validate_table_name(&self.config.table)?;
        if let Some(schema) = &self.schema {
            schema.validate()?;
        }

        let conn = open_connection(&self.config)?;
        configure_connection(&conn, &self.config)?;

        let schema = self.schema.as_ref();
        conn.execute(&sql::create_table_sql(&self.config.table, schema), [])
            .map_err(Error::engine_op("create_table"))?;
        for statement in sql::create_index_sql(&self.config.table) {
            conn.execute(&statement, [])
                .map_err(Error::engine_op("create_index"))?;
        }
        self.verify_layout(&conn)?;

        Ok(conn)
    }

    /// Rejects a pre-existing table whose columns do not fit the current mode.
    fn verify_layout(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn
            .prepare(&format!(
                "PRAGMA table_info({})",
                sql::quote_identifier(&self.config.table)
            ))
            .map_err(Error::engine_op("prepare_table_info"))?;
        let existing: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(Error::engine_op("table_info"))?
            .collect::<rusqlite::Result<_>>()
            .map_err(Error::engine_op("table_info_row"))?;

        let missing: Vec<&str> = sql::column_names(self.schema.as_ref())
            .into_iter()
            .filter(|column| !existing.iter().any(|e| e == column))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "table '{}' exists without the {} columns [{}]",
                self.config.table,
                self.mode(),
                missing.join(", ")
            )))
        }
    }

    /// Materializes rows in insertion order, keeping those the filter matches.
    fn scan(&self, conn: &Connection, filter: &Filter, limit: Option<usize>) -> Result<Vec<Record>> {
        let schema = self.schema.as_ref();
        let mut stmt = conn
            .prepare_cached(&sql::select_all_sql(&self.config.table, schema))
            .map_err(Error::engine_op("prepare_scan"))?;
        let rows = stmt
            .query_map([], |row| read_record(row, schema))
            .map_err(Error::engine_op("scan"))?;

        let mut matches = Vec::new();
        for row in rows {
            let record = row.map_err(Error::engine_op("scan_row"))?;
            if filter.matches(&record) {
                matches.push(record);
                if limit.is_some_and(|n| matches.len() >= n) {
                    break;
                }
            }
        }
        Ok(matches)
    }

    /// Primary-key lookup. Non-text keys can never match a stored `_id`.
    fn fetch_by_id(&self, conn: &Connection, id: &Value) -> Result<Option<Record>> {
        let Value::Text(id) = id else {
            return Ok(None);
        };
        let schema = self.schema.as_ref();
        let mut stmt = conn
            .prepare_cached(&sql::select_by_id_sql(&self.config.table, schema))
            .map_err(Error::engine_op("prepare_get_by_id"))?;
        stmt.query_row(params![id], |row| read_record(row, schema))
            .optional()
            .map_err(Error::engine_op("get_by_id"))
    }

    /// Inserts several records inside one transaction.
    ///
    /// Joins the caller's transaction if one is already open.
    ///
    /// # Errors
    ///
    /// Returns the first insert error; no record from this call is kept then.
    #[instrument(skip(self, records), fields(operation = "insert_many", table = %self.config.table))]
    pub fn insert_many(&self, records: impl IntoIterator<Item = Record>) -> Result<Vec<Record>> {
        self.transaction(|store| records.into_iter().map(|r| store.insert(r)).collect())
    }

    /// Runs `f` inside a transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// When a transaction is already open, `f` simply runs inside it and the
    /// outer owner decides the outcome.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or from beginning/committing.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        if !self.conn()?.is_autocommit() {
            return f(self);
        }

        self.begin_transaction()?;
        match f(self) {
            Ok(value) => {
                if let Err(e) = self.commit() {
                    if let Err(rollback_err) = self.rollback() {
                        warn!(error = %rollback_err, "Rollback after failed commit also failed");
                    }
                    return Err(e);
                }
                Ok(value)
            },
            Err(e) => {
                if let Err(rollback_err) = self.rollback() {
                    warn!(error = %rollback_err, "Rollback after failed transaction also failed");
                }
                Err(e)
            },
        }
    }

    /// Returns database statistics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] or an engine error.
    pub fn stats(&self) -> Result<StoreStats> {
        self.observe("stats", |conn| {
            let row_count: i64 = conn
                .query_row(&sql::count_sql(&self.config.table), [], |row| row.get(0))
                .map_err(Error::engine_op("stats_count"))?;
            let page_count: i64 = conn
                .pragma_query_value(None, "page_count", |row| row.get(0))
                .map_err(Error::engine_op("stats_page_count"))?;
            let page_size: i64 = conn
                .pragma_query_value(None, "page_size", |row| row.get(0))
                .map_err(Error::engine_op("stats_page_size"))?;

            Ok(StoreStats {
                mode: self.mode(),
                row_count: u64::try_from(row_count).unwrap_or(0),
                page_count: u64::try_from(page_count).unwrap_or(0),
                page_size: u64::try_from(page_size).unwrap_or(0),
                db_size_bytes: u64::try_from(page_count.saturating_mul(page_size)).unwrap_or(0),
            })
        })
    }

    /// Executes one raw statement, returning the number of changed rows.
    ///
    /// Bypasses every record invariant; the caller owns the consequences.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`], or the engine error unmodified.
    pub fn execute_raw(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize> {
        self.observe("execute_raw", |conn| {
            conn.execute(sql, params)
                .map_err(Error::engine_op("execute_raw"))
        })
    }

    /// Executes a batch of raw `;`-separated statements without parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`], or the engine error unmodified.
    pub fn execute_batch_raw(&self, sql: &str) -> Result<()> {
        self.observe("execute_batch_raw", |conn| {
            conn.execute_batch(sql)
                .map_err(Error::engine_op("execute_batch_raw"))
        })
    }

    /// Runs a raw query, returning each row as a record keyed by column name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`], or the engine error unmodified.
    pub fn query_raw(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Record>> {
        self.observe("query_raw", |conn| {
            let mut stmt = conn.prepare(sql).map_err(Error::engine_op("prepare_raw"))?;
            let names: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            let rows = stmt
                .query_map(params, |row| {
                    let mut record = Record::new();
                    for (index, name) in names.iter().enumerate() {
                        record.insert(name.clone(), row.get::<_, Value>(index)?);
                    }
                    Ok(record)
                })
                .map_err(Error::engine_op("query_raw"))?;
            let records: Vec<Record> = rows
                .collect::<rusqlite::Result<_>>()
                .map_err(Error::engine_op("query_raw_row"))?;
            Ok(records)
        })
    }

    /// Hands the open connection to `f`, e.g. to prepare custom statements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`], or the engine error from `f`.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        f(self.conn()?).map_err(Error::engine_op("with_connection"))
    }

    fn execute_control(&self, operation: &'static str, statement: &str) -> Result<()> {
        self.observe(operation, |conn| {
            conn.execute_batch(statement)
                .map_err(Error::engine_op(operation))
        })
    }
}

impl RecordDriver for SqliteRecordStore {
    #[instrument(skip(self), fields(operation = "connect", table = %self.config.table))]
    fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let start = Instant::now();
        let result = self.open_and_initialize();
        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics(self.mode().as_str(), "connect", start, status);

        self.state = ConnectionState::Connected(result?);
        info!(
            mode = self.mode().as_str(),
            path = %self.config.path.display(),
            "Connected record store"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(operation = "disconnect", table = %self.config.table))]
    fn disconnect(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, ConnectionState::Disconnected) {
            ConnectionState::Connected(conn) => {
                conn.close().map_err(|(_, e)| Error::engine("close", e))?;
                info!("Disconnected record store");
                Ok(())
            },
            ConnectionState::Disconnected => Ok(()),
        }
    }

    fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    fn set_schema(&mut self, schema: &dyn FieldDefinitions) -> Result<()> {
        if self.is_connected() {
            return Err(Error::InvalidInput(
                "schema cannot change while connected".to_string(),
            ));
        }
        let definition = schema.field_definitions();
        definition.validate()?;
        debug!(fields = definition.len(), "Attached schema");
        self.schema = Some(definition);
        Ok(())
    }

    fn schema(&self) -> Option<&SchemaDefinition> {
        self.schema.as_ref()
    }

    #[instrument(skip(self, data), fields(operation = "insert", table = %self.config.table))]
    fn insert(&self, data: Record) -> Result<Record> {
        self.observe("insert", |conn| {
            let schema = self.schema.as_ref();
            let id = RecordId::generate();
            let now = current_timestamp();
            let split = mapping::split(&data, schema);
            let params = insert_params(&id, &split, schema, &now)?;

            conn.execute(
                &sql::insert_sql(&self.config.table, schema),
                params_from_iter(params.iter()),
            )
            .map_err(Error::engine_op("insert_record"))?;

            debug!(record.id = %id, "Inserted record");
            Ok(written_record(id.as_str(), split, schema, &now, &now))
        })
    }

    #[instrument(skip(self, filter), fields(operation = "query", table = %self.config.table, filter.len = filter.len()))]
    fn query(&self, filter: &Filter) -> Result<Vec<Record>> {
        self.observe("query", |conn| self.scan(conn, filter, None))
    }

    #[instrument(skip(self, filter), fields(operation = "query_one", table = %self.config.table, filter.len = filter.len()))]
    fn query_one(&self, filter: &Filter) -> Result<Option<Record>> {
        self.observe("query_one", |conn| match filter.id_lookup() {
            Some(id) => self.fetch_by_id(conn, id),
            None => Ok(self.scan(conn, filter, Some(1))?.into_iter().next()),
        })
    }

    #[instrument(skip(self, filter, patch), fields(operation = "update", table = %self.config.table))]
    fn update(&self, filter: &Filter, patch: &Record) -> Result<usize> {
        self.observe("update", |conn| {
            let schema = self.schema.as_ref();
            let statement = sql::update_sql(&self.config.table, schema);
            let mut updated = 0;

            for mut record in self.scan(conn, filter, None)? {
                let Some(id) = record.id().map(str::to_string) else {
                    continue;
                };
                record.apply_patch(patch);
                let now = current_timestamp();
                let split = mapping::split(&record, schema);
                let params = update_params(&id, &split, schema, &now)?;
                updated += conn
                    .execute(&statement, params_from_iter(params.iter()))
                    .map_err(Error::engine_op("update_record"))?;
            }

            record_rows_affected(self.mode().as_str(), "update", updated);
            debug!(updated, "Updated records");
            Ok(updated)
        })
    }

    #[instrument(skip(self, filter), fields(operation = "delete", table = %self.config.table))]
    fn delete(&self, filter: &Filter) -> Result<usize> {
        self.observe("delete", |conn| {
            let statement = sql::delete_by_id_sql(&self.config.table);
            let mut deleted = 0;

            for record in self.scan(conn, filter, None)? {
                if let Some(id) = record.id() {
                    deleted += conn
                        .execute(&statement, params![id])
                        .map_err(Error::engine_op("delete_record"))?;
                }
            }

            record_rows_affected(self.mode().as_str(), "delete", deleted);
            debug!(deleted, "Deleted records");
            Ok(deleted)
        })
    }

    #[instrument(skip(self, filter), fields(operation = "count", table = %self.config.table))]
    fn count(&self, filter: &Filter) -> Result<usize> {
        self.observe("count", |conn| {
            if !filter.is_empty() {
                return Ok(self.scan(conn, filter, None)?.len());
            }
            let count: i64 = conn
                .query_row(&sql::count_sql(&self.config.table), [], |row| row.get(0))
                .map_err(Error::engine_op("count"))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }

    #[instrument(skip(self), fields(operation = "clear", table = %self.config.table))]
    fn clear(&self) -> Result<()> {
        self.observe("clear", |conn| {
            let removed = conn
                .execute(&sql::clear_sql(&self.config.table), [])
                .map_err(Error::engine_op("clear"))?;
            debug!(removed, "Cleared table");
            Ok(())
        })
    }

    #[instrument(skip(self), fields(operation = "drop", table = %self.config.table))]
    fn drop_table(&self) -> Result<()> {
        self.observe("drop", |conn| {
            for statement in sql::drop_sql(&self.config.table) {
                conn.execute(&statement, [])
                    .map_err(Error::engine_op("drop"))?;
            }
            info!("Dropped table");
            Ok(())
        })
    }

    #[instrument(skip(self), fields(operation = "vacuum"))]
    fn vacuum(&self) -> Result<()> {
        self.execute_control("vacuum", "VACUUM")
    }

    #[instrument(skip(self), fields(operation = "analyze"))]
    fn analyze(&self) -> Result<()> {
        self.execute_control("analyze", "ANALYZE")
    }

    fn begin_transaction(&self) -> Result<()> {
        self.execute_control("begin_transaction", "BEGIN")
    }

    fn commit(&self) -> Result<()> {
        self.execute_control("commit", "COMMIT")
    }

    fn rollback(&self) -> Result<()> {
        self.execute_control("rollback", "ROLLBACK")
    }
}
