// Content tables: typed rows, schema codecs and the record store port.

pub mod content_models;
pub mod content_schema;
pub mod record_store;

pub use content_models::*;
pub use content_schema::{schema_for, SchemaError, Table, TableRow};
pub use record_store::{RecordStore, Records, StoreError};
