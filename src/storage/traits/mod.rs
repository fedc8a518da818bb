//! Storage backend traits.

mod driver;

pub use driver::RecordDriver;
