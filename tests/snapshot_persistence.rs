//! Snapshot Persistence Tests
//!
//! - Reload reproduces the table map exactly
//! - Rejected writes leave the snapshot file untouched
//! - A failed save surfaces as PersistenceFailure and can be retried
//! - Damaged snapshots are refused on init

use std::fs;

use relstore::{table_schema, DbConfig, DbError, FieldSchema, Record, RelationalDb};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn config(tmp: &TempDir) -> DbConfig {
    DbConfig::new("shop", tmp.path()).with_fsync(false)
}

fn populated(tmp: &TempDir) -> RelationalDb {
    let db = RelationalDb::open(config(tmp)).unwrap();
    db.create_table(
        "users",
        table_schema([
            ("name", FieldSchema::required_string()),
            ("age", FieldSchema::optional_number()),
            ("score", FieldSchema::optional_number()),
        ]),
    )
    .unwrap();
    db.create_table(
        "orders",
        table_schema([
            ("user_id", FieldSchema::required_number()),
            ("item", FieldSchema::required_string()),
        ]),
    )
    .unwrap();
    db.insert("users", record(json!({"name": "Ana", "age": 30, "score": 0.1})))
        .unwrap();
    db.insert("users", record(json!({"name": "Bo"}))).unwrap();
    db.insert("users", record(json!({"name": "Cy", "score": -2.5e10})))
        .unwrap();
    db.delete("users", 2).unwrap();
    db.insert("orders", record(json!({"user_id": 1, "item": "pen"})))
        .unwrap();
    db
}

// =============================================================================
// Reload
// =============================================================================

/// Closing and reopening gives back schema order, rows, and next_id.
#[test]
fn test_reload_reproduces_tables() {
    let tmp = TempDir::new().unwrap();
    let db = populated(&tmp);

    let names = db.table_names().unwrap();
    let before: Vec<_> = names
        .iter()
        .map(|t| {
            (
                db.schema(t).unwrap(),
                db.select(t, &Record::new()).unwrap(),
                db.next_id(t).unwrap(),
            )
        })
        .collect();
    drop(db);

    let reopened = RelationalDb::open(config(&tmp)).unwrap();
    assert_eq!(reopened.table_names().unwrap(), names);
    for (name, (schema, rows, next_id)) in names.iter().zip(before) {
        assert_eq!(reopened.schema(name).unwrap(), schema);
        assert_eq!(reopened.select(name, &Record::new()).unwrap(), rows);
        assert_eq!(reopened.next_id(name).unwrap(), next_id);
    }

    let fields: Vec<_> = reopened.schema("users").unwrap().keys().cloned().collect();
    assert_eq!(fields, vec!["name", "age", "score"]);
    assert_eq!(reopened.next_id("users").unwrap(), 4);
}

/// Ids continue from the persisted counter, not from the row count.
#[test]
fn test_reload_continues_ids() {
    let tmp = TempDir::new().unwrap();
    drop(populated(&tmp));

    let db = RelationalDb::open(config(&tmp)).unwrap();
    let row = db.insert("users", record(json!({"name": "Di"}))).unwrap();
    assert_eq!(row["id"], 4);
}

/// The file on disk is a readable JSON document.
#[test]
fn test_snapshot_is_self_describing() {
    let tmp = TempDir::new().unwrap();
    let db = populated(&tmp);

    let text = fs::read_to_string(db.snapshot_path()).unwrap();
    let doc: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["format_version"], 1);
    assert_eq!(doc["database"], "shop");
    assert!(doc["checksum"].as_str().unwrap().starts_with("crc32:"));
    assert_eq!(
        doc["tables"]["users"]["schema"]["name"],
        json!({"type": "string", "required": true})
    );
    assert_eq!(doc["tables"]["orders"]["next_id"], 2);
    assert_eq!(db.snapshot_path(), tmp.path().join("shop.db.json"));
}

// =============================================================================
// Failed Writes
// =============================================================================

/// A rejected insert leaves the snapshot bytes exactly as they were.
#[test]
fn test_rejected_write_leaves_snapshot_unchanged() {
    let tmp = TempDir::new().unwrap();
    let db = populated(&tmp);
    let before = fs::read(db.snapshot_path()).unwrap();

    assert!(matches!(
        db.insert("users", record(json!({"age": 5}))),
        Err(DbError::RequiredFieldMissing(_))
    ));
    assert!(matches!(
        db.update("users", 1, record(json!({"nick": "a"}))),
        Err(DbError::UnknownField(_))
    ));
    assert!(matches!(db.delete("users", 2), Err(DbError::RecordNotFound { .. })));

    assert_eq!(fs::read(db.snapshot_path()).unwrap(), before);
}

/// Reads never touch the file.
#[test]
fn test_reads_do_not_save() {
    let tmp = TempDir::new().unwrap();
    let db = populated(&tmp);
    let before = fs::read(db.snapshot_path()).unwrap();
    let saves = db.metrics().snapshots_written;

    db.select("users", &record(json!({"name": "Ana"}))).unwrap();
    db.join("orders", "users", "user_id").unwrap();

    assert_eq!(fs::read(db.snapshot_path()).unwrap(), before);
    assert_eq!(db.metrics().snapshots_written, saves);
}

/// When the snapshot cannot be replaced, the mutation stays in memory and a
/// later save() brings the disk back in line.
#[test]
fn test_persistence_failure_then_retry() {
    let tmp = TempDir::new().unwrap();
    let db = populated(&tmp);
    let path = db.snapshot_path().to_path_buf();

    // A non-empty directory in place of the file makes the rename fail
    fs::remove_file(&path).unwrap();
    fs::create_dir(&path).unwrap();
    fs::write(path.join("blocker"), b"x").unwrap();

    let err = db
        .insert("users", record(json!({"name": "Di"})))
        .unwrap_err();
    assert!(err.is_persistence_failure());
    assert!(matches!(err, DbError::PersistenceFailure { .. }));
    assert_eq!(db.count("users").unwrap(), 3);
    assert_eq!(db.metrics().snapshot_failures, 1);

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    assert!(!std::path::Path::new(&tmp_name).exists());

    fs::remove_dir_all(&path).unwrap();
    db.save().unwrap();
    drop(db);

    let reopened = RelationalDb::open(config(&tmp)).unwrap();
    assert_eq!(reopened.count("users").unwrap(), 3);
    assert_eq!(
        reopened.select("users", &record(json!({"name": "Di"}))).unwrap()[0]["id"],
        4
    );
}

// =============================================================================
// Damaged Snapshots
// =============================================================================

#[test]
fn test_init_refuses_garbage() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("shop.db.json"), b"not json at all").unwrap();

    let err = RelationalDb::open(config(&tmp)).err().unwrap();
    assert!(matches!(err, DbError::CorruptSnapshot { .. }));
    assert_eq!(err.code(), "RELSTORE_CORRUPT_SNAPSHOT");
}

/// Editing a row by hand breaks the checksum.
#[test]
fn test_init_detects_tampering() {
    let tmp = TempDir::new().unwrap();
    let path = populated(&tmp).snapshot_path().to_path_buf();

    let text = fs::read_to_string(&path).unwrap();
    fs::write(&path, text.replace("\"Ana\"", "\"Eve\"")).unwrap();

    let err = RelationalDb::open(config(&tmp)).err().unwrap();
    assert!(matches!(err, DbError::CorruptSnapshot { .. }));
}

#[test]
fn test_init_refuses_newer_format() {
    let tmp = TempDir::new().unwrap();
    let doc = json!({"format_version": 99, "database": "shop", "tables": {}});
    fs::write(tmp.path().join("shop.db.json"), doc.to_string()).unwrap();

    let err = RelationalDb::open(config(&tmp)).err().unwrap();
    assert!(matches!(
        err,
        DbError::UnsupportedFormatVersion { found: 99, supported: 1, .. }
    ));
}

/// A file without a checksum and with extra keys still loads.
#[test]
fn test_init_accepts_minimal_envelope() {
    let tmp = TempDir::new().unwrap();
    let doc = json!({
        "format_version": 1,
        "written_by": "hand",
        "tables": {
            "notes": {
                "schema": {"text": {"type": "string", "required": true}},
                "rows": [{"id": 3, "text": "hi"}],
                "next_id": 4
            }
        }
    });
    fs::write(tmp.path().join("shop.db.json"), doc.to_string()).unwrap();

    let db = RelationalDb::open(config(&tmp)).unwrap();
    assert_eq!(db.table_names().unwrap(), vec!["notes"]);
    assert_eq!(db.insert("notes", record(json!({"text": "yo"}))).unwrap()["id"], 4);
}

/// A counter at its maximum loads, refuses further inserts, and the file
/// stays loadable.
#[test]
fn test_exhausted_id_counter() {
    let tmp = TempDir::new().unwrap();
    let doc = json!({
        "format_version": 1,
        "database": "shop",
        "tables": {
            "notes": {
                "schema": {"text": {"type": "string", "required": true}},
                "rows": [{"id": 7, "text": "hi"}],
                "next_id": u64::MAX
            }
        }
    });
    fs::write(tmp.path().join("shop.db.json"), doc.to_string()).unwrap();

    let db = RelationalDb::open(config(&tmp)).unwrap();
    let err = db
        .insert("notes", record(json!({"text": "more"})))
        .unwrap_err();
    assert!(matches!(err, DbError::IdSpaceExhausted(ref t) if t == "notes"));
    assert_eq!(err.code(), "RELSTORE_ID_SPACE_EXHAUSTED");
    assert_eq!(db.count("notes").unwrap(), 1);
    assert_eq!(db.next_id("notes").unwrap(), u64::MAX);

    // Other writes still work and the saved file reloads
    db.update("notes", 7, record(json!({"text": "edited"}))).unwrap();
    drop(db);
    let reopened = RelationalDb::open(config(&tmp)).unwrap();
    assert_eq!(reopened.next_id("notes").unwrap(), u64::MAX);
    assert_eq!(
        reopened.select("notes", &Record::new()).unwrap()[0]["text"],
        "edited"
    );
}

/// init creates a missing data directory.
#[test]
fn test_init_creates_data_dir() {
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("a").join("b");
    let db = RelationalDb::open(DbConfig::new("shop", &nested).with_fsync(false)).unwrap();
    assert!(nested.join("shop.db.json").exists());
    assert!(db.table_names().unwrap().is_empty());
}
