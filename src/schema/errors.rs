//! Schema validation errors
//!
//! Every variant is a REJECT: the record is refused and nothing is mutated.

use thiserror::Error;

/// Result type for schema validation
pub type SchemaResult<T> = Result<T, SchemaError>;

/// A record or schema that violates the table definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("required field '{0}' is missing")]
    RequiredFieldMissing(String),

    #[error("field '{field}': expected {expected}, got {actual}")]
    InvalidFieldType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("field '{0}' is not declared in the schema")]
    UnknownField(String),

    #[error("field '{0}' is reserved and cannot be declared")]
    ReservedField(String),
}

impl SchemaError {
    /// Returns the offending field name
    pub fn field(&self) -> &str {
        match self {
            SchemaError::RequiredFieldMissing(f)
            | SchemaError::UnknownField(f)
            | SchemaError::ReservedField(f) => f,
            SchemaError::InvalidFieldType { field, .. } => field,
        }
    }
}
