//! Storage-agnostic record driver contract.

use crate::Result;
use crate::models::{Filter, Record};
use crate::schema::{FieldDefinitions, SchemaDefinition};

/// The contract a record store exposes to a data-access layer.
///
/// A driver is either disconnected or connected. Every operation other than
/// the lifecycle and schema methods requires a connection and fails with
/// [`Error::NotConnected`](crate::Error::NotConnected), without side effects,
/// otherwise.
///
/// Operations run to completion synchronously. Multi-row updates and deletes
/// are a read followed by independent single-row writes; wrap them in
/// [`begin_transaction`](Self::begin_transaction)/[`commit`](Self::commit) for
/// all-or-nothing behaviour.
pub trait RecordDriver: Send {
    /// Opens the backing file and ensures the table and indexes exist.
    ///
    /// Idempotent: connecting twice, or reconnecting to an existing file, does
    /// not error or duplicate anything.
    fn connect(&mut self) -> Result<()>;

    /// Releases the connection. A no-op when already disconnected.
    fn disconnect(&mut self) -> Result<()>;

    /// Returns true while connected.
    fn is_connected(&self) -> bool;

    /// Attaches a schema, switching the store to hybrid mode.
    ///
    /// Only valid while disconnected; the schema applies from the next connect.
    fn set_schema(&mut self, schema: &dyn FieldDefinitions) -> Result<()>;

    /// Returns the attached schema, if any.
    fn schema(&self) -> Option<&SchemaDefinition>;

    /// Inserts a record, assigning `_id`, `_createdAt` and `_updatedAt`.
    ///
    /// Caller-supplied reserved fields are ignored. Returns the stored record.
    fn insert(&self, data: Record) -> Result<Record>;

    /// Returns every record matching the filter.
    fn query(&self, filter: &Filter) -> Result<Vec<Record>>;

    /// Returns the first record matching the filter.
    fn query_one(&self, filter: &Filter) -> Result<Option<Record>> {
        Ok(self.query(filter)?.into_iter().next())
    }

    /// Overlays `patch` on every matching record. Returns the number updated.
    ///
    /// `_id` and `_createdAt` are preserved; `_updatedAt` is refreshed.
    fn update(&self, filter: &Filter, patch: &Record) -> Result<usize>;

    /// Deletes every matching record. Returns the number deleted.
    fn delete(&self, filter: &Filter) -> Result<usize>;

    /// Returns true if any record matches.
    fn exists(&self, filter: &Filter) -> Result<bool> {
        Ok(self.query_one(filter)?.is_some())
    }

    /// Counts matching records.
    fn count(&self, filter: &Filter) -> Result<usize> {
        Ok(self.query(filter)?.len())
    }

    /// Deletes every row, keeping the table and indexes.
    fn clear(&self) -> Result<()>;

    /// Removes the table and its indexes.
    fn drop_table(&self) -> Result<()>;

    /// Rebuilds the database file, reclaiming free pages.
    fn vacuum(&self) -> Result<()>;

    /// Refreshes the query planner statistics.
    fn analyze(&self) -> Result<()>;

    /// Starts a transaction.
    fn begin_transaction(&self) -> Result<()>;

    /// Commits the open transaction.
    fn commit(&self) -> Result<()>;

    /// Rolls back the open transaction.
    fn rollback(&self) -> Result<()>;
}
