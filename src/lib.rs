//! # Recordstore
//!
//! An embedded, single-file record store with two storage modes behind one
//! driver interface.
//!
//! - **Schema-less mode**: every record is stored as one opaque JSON blob.
//! - **Hybrid mode**: fields declared in a schema live in typed `SQLite`
//!   columns, every other field is folded into a JSON `_extras` payload.
//!
//! The schema is attached before connecting and stays fixed for the lifetime
//! of the connection. Reads merge the typed columns and the extras payload back
//! into one logical [`Record`], coercing `0/1` back to booleans for fields
//! declared `BOOLEAN`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use recordstore::{Filter, Record, RecordDriver, SchemaDefinition, SqliteRecordStore, StoreConfig};
//! use recordstore::schema::FieldType;
//!
//! let mut store = SqliteRecordStore::new(StoreConfig::in_memory().with_table("users"));
//! let schema = SchemaDefinition::new()
//!     .with_field("name", FieldType::String)
//!     .with_field("admin", FieldType::Boolean);
//! store.set_schema(&schema)?;
//! store.connect()?;
//!
//! let created = store.insert(Record::new().with("name", "ada").with("admin", true).with("team", "core"))?;
//! let admins = store.query(&Filter::new().with("admin", true))?;
//! assert_eq!(admins.len(), 1);
//! assert_eq!(admins[0].id(), created.id());
//! # Ok::<(), recordstore::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod models;
pub mod observability;
pub mod schema;
pub mod storage;

pub use config::StoreConfig;
pub use models::{Filter, Record, RecordId, Value};
pub use schema::{ColumnType, FieldDefinitions, SchemaDefinition, TypeDescriptor};
pub use storage::{RecordDriver, SqliteRecordStore, StorageMode, StoreStats};

/// Error type for record store operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `NotConnected` | Any driver operation before `connect()` or after `disconnect()` |
/// | `InvalidInput` | Reserved or empty schema field names, bad table names, schema change while connected |
/// | `ExtrasDecodeFailure` | Corrupt `_extras`/`_data` payload (logged and recovered, never returned by reads) |
/// | `ConstraintViolation` | `SQLite` reports a constraint error (e.g. duplicate `_id`) |
/// | `Backend` | Any other `SQLite` error, including raw statement failures |
/// | `Serialization` | A value cannot be encoded as JSON on write |
/// | `OperationFailed` | Filesystem or configuration I/O fails |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The store has no open connection.
    #[error("record store is not connected")]
    NotConnected,

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A stored JSON payload could not be decoded.
    ///
    /// Reads recover from this locally by substituting an empty mapping; the
    /// variant exists so the recovery can be logged with a structured cause.
    #[error("failed to decode '{column}' payload: {cause}")]
    ExtrasDecodeFailure {
        /// The column holding the payload (`_extras` or `_data`).
        column: &'static str,
        /// The underlying parse error.
        cause: String,
    },

    /// The backing engine rejected a write with a constraint error.
    #[error("constraint violation during '{operation}': {source}")]
    ConstraintViolation {
        /// The operation that failed.
        operation: String,
        /// The unmodified engine error.
        #[source]
        source: rusqlite::Error,
    },

    /// The backing engine failed.
    #[error("backing engine failure during '{operation}': {source}")]
    Backend {
        /// The operation that failed.
        operation: String,
        /// The unmodified engine error.
        #[source]
        source: rusqlite::Error,
    },

    /// A value could not be serialized.
    #[error("serialization failed during '{operation}': {cause}")]
    Serialization {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// An operation failed outside the backing engine.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Wraps an engine error, classifying constraint failures separately.
    pub fn engine(operation: impl Into<String>, source: rusqlite::Error) -> Self {
        let operation = operation.into();
        let is_constraint = matches!(
            source.sqlite_error_code(),
            Some(rusqlite::ErrorCode::ConstraintViolation)
        );
        if is_constraint {
            Self::ConstraintViolation { operation, source }
        } else {
            Self::Backend { operation, source }
        }
    }

    /// Returns a closure suitable for `map_err` that wraps engine errors.
    pub fn engine_op(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::engine(operation, source)
    }

    /// Returns true if this error is [`Error::NotConnected`].
    #[must_use]
    pub const fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }
}

/// Result type alias for record store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current UTC time as an ISO-8601 string with millisecond precision.
///
/// The fixed-width format (`2024-01-02T03:04:05.678Z`) sorts lexically in
/// chronological order, which the `_createdAt`/`_updatedAt` indexes rely on.
///
/// # Examples
///
/// ```rust
/// use recordstore::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts.ends_with('Z'));
/// assert_eq!(ts.len(), 24);
/// ```
#[must_use]
pub fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
