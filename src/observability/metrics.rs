//! Engine counters
//!
//! - Counters only, monotonic
//! - Reset only when the database is constructed
//! - Relaxed atomics; exact once all operations have returned

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    tables_created: AtomicU64,
    rows_inserted: AtomicU64,
    rows_updated: AtomicU64,
    rows_deleted: AtomicU64,
    selects: AtomicU64,
    joins: AtomicU64,
    writes_rejected: AtomicU64,
    snapshots_written: AtomicU64,
    snapshot_failures: AtomicU64,
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub tables_created: u64,
    pub rows_inserted: u64,
    pub rows_updated: u64,
    pub rows_deleted: u64,
    pub selects: u64,
    pub joins: u64,
    pub writes_rejected: u64,
    pub snapshots_written: u64,
    pub snapshot_failures: u64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_tables_created(&self) {
        self.tables_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rows_inserted(&self) {
        self.rows_inserted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rows_updated(&self) {
        self.rows_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rows_deleted(&self) {
        self.rows_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_selects(&self) {
        self.selects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_joins(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_writes_rejected(&self) {
        self.writes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_snapshots_written(&self) {
        self.snapshots_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_snapshot_failures(&self) {
        self.snapshot_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tables_created: self.tables_created.load(Ordering::Relaxed),
            rows_inserted: self.rows_inserted.load(Ordering::Relaxed),
            rows_updated: self.rows_updated.load(Ordering::Relaxed),
            rows_deleted: self.rows_deleted.load(Ordering::Relaxed),
            selects: self.selects.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            writes_rejected: self.writes_rejected.load(Ordering::Relaxed),
            snapshots_written: self.snapshots_written.load(Ordering::Relaxed),
            snapshot_failures: self.snapshot_failures.load(Ordering::Relaxed),
        }
    }

    /// All counters as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}
