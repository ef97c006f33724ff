//! Schema subsystem for relstore
//!
//! Schemas are fixed when a table is created and enforced on every write.
//!
//! # Design Principles
//!
//! - Validation happens before any mutation
//! - Violations reject the write, nothing is coerced
//! - `null` is never a value of a declared type
//! - Deterministic validation (schema order)

mod errors;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaResult};
pub use types::{json_type_name, table_schema, FieldKind, FieldSchema, TableSchema, ID_FIELD};
pub use validator::{validate_table_schema, SchemaValidator};
