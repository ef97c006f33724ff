//! Engine error type
//!
//! Error codes:
//! - RELSTORE_TABLE_NOT_FOUND (REJECT)
//! - RELSTORE_RECORD_NOT_FOUND (REJECT)
//! - RELSTORE_REQUIRED_FIELD_MISSING (REJECT)
//! - RELSTORE_INVALID_FIELD_TYPE (REJECT)
//! - RELSTORE_UNKNOWN_FIELD (REJECT)
//! - RELSTORE_RESERVED_FIELD (REJECT)
//! - RELSTORE_INVALID_TABLE_NAME (REJECT)
//! - RELSTORE_NOT_INITIALIZED (REJECT)
//! - RELSTORE_PERSISTENCE_FAILURE (ERROR, in-memory state is ahead of disk)
//! - RELSTORE_CORRUPT_SNAPSHOT (ERROR)
//! - RELSTORE_UNSUPPORTED_FORMAT (ERROR)
//! - RELSTORE_LOCK_POISONED (ERROR)
//! - RELSTORE_CONFIG (ERROR)

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::schema::SchemaError;

/// Result type for engine operations
pub type DbResult<T> = Result<T, DbError>;

/// Errors reported by [`crate::RelationalDb`]
#[derive(Debug, Clone, Error)]
pub enum DbError {
    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("record {id} not found in table '{table}'")]
    RecordNotFound { table: String, id: u64 },

    #[error("required field '{0}' is missing")]
    RequiredFieldMissing(String),

    #[error("invalid type for field '{field}': expected {expected}, got {actual}")]
    InvalidFieldType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{0}' is reserved")]
    ReservedField(String),

    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("table '{0}' has no ids left to assign")]
    IdSpaceExhausted(String),

    #[error("database '{0}' is not initialized")]
    NotInitialized(String),

    /// The in-memory mutation was applied but could not be written out.
    #[error("failed to persist snapshot {path}: {source}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("corrupt snapshot {path}: {reason}")]
    CorruptSnapshot { path: PathBuf, reason: String },

    #[error("snapshot {path} has format version {found}, newest supported is {supported}")]
    UnsupportedFormatVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DbError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DbError::PersistenceFailure {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DbError::CorruptSnapshot {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            DbError::TableNotFound(_) => "RELSTORE_TABLE_NOT_FOUND",
            DbError::RecordNotFound { .. } => "RELSTORE_RECORD_NOT_FOUND",
            DbError::RequiredFieldMissing(_) => "RELSTORE_REQUIRED_FIELD_MISSING",
            DbError::InvalidFieldType { .. } => "RELSTORE_INVALID_FIELD_TYPE",
            DbError::UnknownField(_) => "RELSTORE_UNKNOWN_FIELD",
            DbError::ReservedField(_) => "RELSTORE_RESERVED_FIELD",
            DbError::InvalidTableName(_) => "RELSTORE_INVALID_TABLE_NAME",
            DbError::IdSpaceExhausted(_) => "RELSTORE_ID_SPACE_EXHAUSTED",
            DbError::NotInitialized(_) => "RELSTORE_NOT_INITIALIZED",
            DbError::PersistenceFailure { .. } => "RELSTORE_PERSISTENCE_FAILURE",
            DbError::CorruptSnapshot { .. } => "RELSTORE_CORRUPT_SNAPSHOT",
            DbError::UnsupportedFormatVersion { .. } => "RELSTORE_UNSUPPORTED_FORMAT",
            DbError::LockPoisoned(_) => "RELSTORE_LOCK_POISONED",
            DbError::Config(_) => "RELSTORE_CONFIG",
        }
    }

    /// True when the request was refused and nothing changed
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DbError::TableNotFound(_)
                | DbError::RecordNotFound { .. }
                | DbError::RequiredFieldMissing(_)
                | DbError::InvalidFieldType { .. }
                | DbError::UnknownField(_)
                | DbError::ReservedField(_)
                | DbError::InvalidTableName(_)
                | DbError::IdSpaceExhausted(_)
                | DbError::NotInitialized(_)
        )
    }

    /// True when memory holds a change the snapshot does not.
    /// Calling [`crate::RelationalDb::save`] retries the write.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, DbError::PersistenceFailure { .. })
    }
}

impl From<SchemaError> for DbError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::RequiredFieldMissing(f) => DbError::RequiredFieldMissing(f),
            SchemaError::InvalidFieldType {
                field,
                expected,
                actual,
            } => DbError::InvalidFieldType {
                field,
                expected,
                actual,
            },
            SchemaError::UnknownField(f) => DbError::UnknownField(f),
            SchemaError::ReservedField(f) => DbError::ReservedField(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_errors_convert() {
        let err: DbError = SchemaError::RequiredFieldMissing("name".into()).into();
        assert!(matches!(err, DbError::RequiredFieldMissing(ref f) if f == "name"));
        assert_eq!(err.code(), "RELSTORE_REQUIRED_FIELD_MISSING");
        assert!(err.is_rejection());
    }

    #[test]
    fn test_persistence_failure_is_distinguishable() {
        let err = DbError::persistence(
            "/tmp/x.db.json",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_persistence_failure());
        assert!(!err.is_rejection());
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_codes_are_unique() {
        let errors = vec![
            DbError::TableNotFound("t".into()),
            DbError::RecordNotFound { table: "t".into(), id: 1 },
            DbError::RequiredFieldMissing("f".into()),
            DbError::UnknownField("f".into()),
            DbError::ReservedField("id".into()),
            DbError::InvalidTableName(String::new()),
            DbError::IdSpaceExhausted("t".into()),
            DbError::NotInitialized("db".into()),
            DbError::LockPoisoned("tables"),
            DbError::Config("bad".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
