//! Snapshot subsystem for relstore
//!
//! The whole table set of a database is persisted to one snapshot file after
//! every mutation.
//!
//! # Design Principles
//!
//! - Versioned, self-describing JSON (portable across implementations)
//! - Integrity checked with CRC32 on load
//! - Atomic replacement (temp file + rename)
//! - Zero partial success

mod checksum;
mod format;
mod store;

pub use checksum::{compute_checksum, format_checksum, parse_checksum};
pub use format::{decode_snapshot, encode_snapshot, Snapshot, FORMAT_VERSION};
pub use store::SnapshotStore;

/// File extension of snapshot files
pub const SNAPSHOT_EXTENSION: &str = "db.json";
