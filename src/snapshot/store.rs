//! Snapshot file I/O
//!
//! Writes follow this sequence:
//!
//! 1. Write the encoded bytes to `<snapshot>.tmp`
//! 2. fsync the temp file
//! 3. Rename the temp file over the snapshot (atomic on POSIX)
//! 4. fsync the parent directory (best effort)
//!
//! A crash at any point leaves either the previous snapshot or the new one,
//! never a truncated or mixed file.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::format::{decode_snapshot, Snapshot};
use crate::errors::{DbError, DbResult};

/// Location of one database snapshot on disk
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    temp_path: PathBuf,
    fsync: bool,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, fsync: bool) -> Self {
        let path = path.into();
        let mut temp = OsString::from(path.as_os_str());
        temp.push(".tmp");
        Self {
            path,
            temp_path: PathBuf::from(temp),
            fsync,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads and decodes the snapshot.
    pub fn load(&self) -> DbResult<Snapshot> {
        let bytes = fs::read(&self.path).map_err(|e| DbError::persistence(&self.path, e))?;
        decode_snapshot(&self.path, &bytes)
    }

    /// Atomically replaces the snapshot with `bytes`.
    ///
    /// On failure the temp file is removed and the previous snapshot is left
    /// untouched.
    pub fn write_atomic(&self, bytes: &[u8]) -> DbResult<()> {
        let result = self.write_temp_and_rename(bytes);
        if result.is_err() {
            let _ = fs::remove_file(&self.temp_path);
        }
        result.map_err(|e| DbError::persistence(&self.path, e))
    }

    fn write_temp_and_rename(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.temp_path)?;
        file.write_all(bytes)?;
        if self.fsync {
            file.sync_all()?;
        }
        drop(file);

        fs::rename(&self.temp_path, &self.path)?;

        if self.fsync {
            if let Some(parent) = self.path.parent() {
                if let Ok(dir) = File::open(parent) {
                    let _ = dir.sync_all();
                }
            }
        }

        Ok(())
    }
}
