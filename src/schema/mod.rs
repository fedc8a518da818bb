//! Schemas for hybrid mode.
//!
//! A schema maps field names to [`TypeDescriptor`]s. Attaching one to a store
//! switches it to hybrid mode: declared fields get typed columns (see
//! [`column_type_for`]) and everything else goes to the extras payload.

mod definition;
mod types;

pub use definition::{FieldDefinitions, SchemaDefinition};
pub use types::{ColumnType, FieldType, TypeDescriptor, column_type_for};
