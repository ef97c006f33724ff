//! Snapshot encoding
//!
//! A snapshot is one JSON object:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "database": "shop",
//!   "saved_at": "2026-10-19T10:00:00Z",
//!   "checksum": "crc32:1a2b3c4d",
//!   "tables": {
//!     "users": {
//!       "schema": {"name": {"type": "string", "required": true}},
//!       "rows": [{"id": 1, "name": "Ana"}],
//!       "next_id": 2
//!     }
//!   }
//! }
//! ```
//!
//! The checksum covers the exact bytes of the `tables` value. Unknown
//! envelope keys are ignored and `saved_at`/`checksum` are optional, so older
//! readers accept newer files as long as `format_version` is supported.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use super::checksum::{compute_checksum, format_checksum, parse_checksum};
use crate::errors::{DbError, DbResult};
use crate::table::Table;

/// Newest format this build reads and the one it writes
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    format_version: u32,
    database: &'a str,
    saved_at: String,
    checksum: String,
    tables: &'a RawValue,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    format_version: u32,
    #[serde(default)]
    database: String,
    #[serde(default)]
    saved_at: Option<String>,
    #[serde(default)]
    checksum: Option<String>,
    tables: Box<RawValue>,
}

/// Decoded snapshot contents
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub database: String,
    pub saved_at: Option<String>,
    pub tables: HashMap<String, Table>,
}

/// Encodes `tables` as a snapshot of `database`.
///
/// Tables are written in name order so identical state gives identical
/// payload bytes.
pub fn encode_snapshot<'t, I>(database: &str, tables: I) -> serde_json::Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'t str, &'t Table)>,
{
    let ordered: BTreeMap<&str, &Table> = tables.into_iter().collect();
    let payload = serde_json::to_string(&ordered)?;
    let checksum = format_checksum(compute_checksum(payload.as_bytes()));
    let raw = RawValue::from_string(payload)?;

    let envelope = EnvelopeOut {
        format_version: FORMAT_VERSION,
        database,
        saved_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        checksum,
        tables: &raw,
    };

    let mut bytes = serde_json::to_vec(&envelope)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decodes snapshot bytes read from `path`.
///
/// # Errors
///
/// - `UnsupportedFormatVersion` if the file is newer than this build
/// - `CorruptSnapshot` on malformed JSON, checksum mismatch, or a table
///   whose rows contradict its id counter
pub fn decode_snapshot(path: &Path, bytes: &[u8]) -> DbResult<Snapshot> {
    let envelope: EnvelopeIn =
        serde_json::from_slice(bytes).map_err(|e| DbError::corrupt(path, e))?;

    if envelope.format_version == 0 || envelope.format_version > FORMAT_VERSION {
        return Err(DbError::UnsupportedFormatVersion {
            path: path.to_path_buf(),
            found: envelope.format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload = envelope.tables.get();
    if let Some(stored) = &envelope.checksum {
        let expected = parse_checksum(stored)
            .ok_or_else(|| DbError::corrupt(path, format!("malformed checksum '{}'", stored)))?;
        let actual = compute_checksum(payload.as_bytes());
        if expected != actual {
            return Err(DbError::corrupt(
                path,
                format!(
                    "checksum mismatch: stored {}, computed {}",
                    stored,
                    format_checksum(actual)
                ),
            ));
        }
    }

    let tables: HashMap<String, Table> =
        serde_json::from_str(payload).map_err(|e| DbError::corrupt(path, e))?;
    for (name, table) in &tables {
        table
            .check_consistency()
            .map_err(|reason| DbError::corrupt(path, format!("table '{}': {}", name, reason)))?;
    }

    Ok(Snapshot {
        database: envelope.database,
        saved_at: envelope.saved_at,
        tables,
    })
}
