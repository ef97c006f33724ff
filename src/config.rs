//! Database configuration
//!
//! Loaded from a JSON file or built in code:
//!
//! ```json
//! {
//!   "name": "shop",
//!   "data_dir": "/var/lib/shop",
//!   "allow_undeclared_fields": false,
//!   "fsync": true
//! }
//! ```
//!
//! The snapshot lives at `<data_dir>/<name>.db.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{DbError, DbResult};
use crate::snapshot::SNAPSHOT_EXTENSION;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    /// Database name, also the snapshot file stem
    pub name: String,

    /// Directory holding the snapshot
    pub data_dir: PathBuf,

    /// Accept record fields that the schema does not declare
    #[serde(default)]
    pub allow_undeclared_fields: bool,

    /// fsync snapshot writes
    #[serde(default = "default_fsync")]
    pub fsync: bool,
}

fn default_fsync() -> bool {
    true
}

impl DbConfig {
    /// Strict, fsync-enabled configuration
    pub fn new(name: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            data_dir: data_dir.into(),
            allow_undeclared_fields: false,
            fsync: true,
        }
    }

    pub fn with_undeclared_fields(mut self, allow: bool) -> Self {
        self.allow_undeclared_fields = allow;
        self
    }

    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> DbResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DbError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: DbConfig = serde_json::from_str(&content)
            .map_err(|e| DbError::Config(format!("invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// The name must be a plain file stem.
    pub fn validate(&self) -> DbResult<()> {
        if self.name.trim().is_empty() {
            return Err(DbError::Config("name must not be empty".into()));
        }
        if self.name.contains(['/', '\\']) || self.name == "." || self.name == ".." {
            return Err(DbError::Config(format!(
                "name '{}' must not contain path separators",
                self.name
            )));
        }
        Ok(())
    }

    /// Full path of the snapshot file
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", self.name, SNAPSHOT_EXTENSION))
    }
}
