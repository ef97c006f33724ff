//! Observable engine events

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Existing snapshot loaded by init
    InitLoaded,
    /// No snapshot found, empty one written by init
    InitCreated,

    // Writes
    TableCreated,
    RowInserted,
    RowUpdated,
    RowDeleted,
    /// A write was refused before any mutation
    ValidationRejected,

    // Persistence
    SnapshotSaved,
    /// Memory is ahead of disk until the next successful save
    SnapshotFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::InitLoaded => "INIT_LOADED",
            Event::InitCreated => "INIT_CREATED",
            Event::TableCreated => "TABLE_CREATED",
            Event::RowInserted => "ROW_INSERTED",
            Event::RowUpdated => "ROW_UPDATED",
            Event::RowDeleted => "ROW_DELETED",
            Event::ValidationRejected => "VALIDATION_REJECTED",
            Event::SnapshotSaved => "SNAPSHOT_SAVED",
            Event::SnapshotFailed => "SNAPSHOT_FAILED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
