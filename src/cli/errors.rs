//! CLI-specific error types

use thiserror::Error;

use crate::errors::DbError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("no snapshot at {0}")]
    MissingSnapshot(String),

    #[error("[{}] {0}", .0.code())]
    Db(#[from] DbError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
