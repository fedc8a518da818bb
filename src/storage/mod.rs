//! Storage layer.
//!
//! - [`traits`]: the [`RecordDriver`] contract
//! - [`mapping`]: splitting records into schema columns and extras, and back
//! - [`sqlite`]: the `SQLite` implementation

pub mod mapping;
pub mod sqlite;
pub mod traits;

pub use mapping::{SplitRecord, coerce_declared, merge, split};
pub use sqlite::{SqliteRecordStore, StorageMode, StoreStats};
pub use traits::RecordDriver;
