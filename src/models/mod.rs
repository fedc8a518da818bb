//! Data models for records, values, and filters.

mod filter;
mod record;
mod value;

pub use filter::Filter;
pub use record::{
    CREATED_AT_FIELD, DATA_FIELD, EXTRAS_FIELD, ID_FIELD, RESERVED_FIELDS, Record, RecordId,
    UPDATED_AT_FIELD, is_reserved_field,
};
pub use value::{BYTES_KEY, OBJECT_KEY, Value};
