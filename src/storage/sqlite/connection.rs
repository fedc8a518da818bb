//! Connection opening and configuration for record stores.

use crate::config::StoreConfig;
use crate::{Error, Result};
use rusqlite::Connection;
use std::time::Duration;

/// Opens the connection described by `config`.
///
/// File databases get their parent directory created first. `:memory:`
/// opens a private in-memory database.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the parent directory cannot be
/// created, or an engine error if the database cannot be opened.
pub fn open_connection(config: &StoreConfig) -> Result<Connection> {
    if config.is_in_memory() {
        return Connection::open_in_memory().map_err(Error::engine_op("open_sqlite_in_memory"));
    }

    if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_store_dir".to_string(),
            cause: format!("{}: {e}", parent.display()),
        })?;
    }

    Connection::open(&config.path).map_err(Error::engine_op("open_sqlite"))
}

/// Applies pragmas to a freshly opened connection.
///
/// # Configuration Applied
///
/// - **WAL mode** (file databases, when enabled): concurrent readers with a single writer
/// - **NORMAL synchronous**: durable at checkpoints without an fsync per commit
/// - **`busy_timeout`**: waits for locks held by other processes instead of failing at once
///
/// The store adds no locking of its own; file access is serialized by `SQLite`.
///
/// # Errors
///
/// Returns an engine error if a pragma is rejected.
pub fn configure_connection(conn: &Connection, config: &StoreConfig) -> Result<()> {
    if config.journal_wal && !config.is_in_memory() {
        // journal_mode answers with the resulting mode, so it has to be read back.
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(Error::engine_op("pragma_journal_mode"))?;
        if !mode.eq_ignore_ascii_case("wal") {
            tracing::warn!(mode = %mode, "SQLite refused WAL journal mode");
        }
    }
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(Error::engine_op("pragma_synchronous"))?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(Error::engine_op("busy_timeout"))?;

    Ok(())
}
