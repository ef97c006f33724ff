//! The relational engine
//!
//! Write path (strict order):
//!
//! 1. Resolve the table (TableNotFound)
//! 2. Take the table's write lock
//! 3. Validate against the schema (nothing mutated on failure)
//! 4. Apply the change in memory
//! 5. Release the table lock
//! 6. Save every table to the snapshot
//!
//! If step 6 fails the caller gets `PersistenceFailure`: the in-memory state
//! is authoritative and ahead of disk until the next successful save.
//!
//! # Locking
//!
//! - registry: `RwLock<HashMap<name, Arc<RwLock<Table>>>>`
//! - one `RwLock` per table; mutations hold one write lock, reads hold read
//!   locks, so reads never observe a half-applied mutation
//! - `save_lock` serializes saves; each save captures all tables under read
//!   locks at once, so consecutive snapshot files only move forward
//! - whoever holds several table locks at once takes them in name order

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::DbConfig;
use crate::errors::{DbError, DbResult};
use crate::observability::{Event, Logger, MetricsRegistry, MetricsSnapshot};
use crate::schema::{validate_table_schema, SchemaError, SchemaValidator, TableSchema};
use crate::snapshot::{encode_snapshot, SnapshotStore};
use crate::table::{Record, Row, Table};

use super::filters::{ConditionFilter, JoinLookup};

type TableHandle = Arc<RwLock<Table>>;
type Registry = HashMap<String, TableHandle>;

/// An embedded database of schema-validated tables.
///
/// Construct with [`RelationalDb::new`], then call [`RelationalDb::init`]
/// once (or use [`RelationalDb::open`] for both). `init` takes `&mut self`,
/// so it cannot overlap any other operation; after it, the database can be
/// shared across threads behind an `Arc`.
pub struct RelationalDb {
    config: DbConfig,
    store: SnapshotStore,
    tables: RwLock<Registry>,
    save_lock: Mutex<()>,
    metrics: MetricsRegistry,
    initialized: bool,
}

impl RelationalDb {
    /// Creates an uninitialized database. Nothing is read or written yet.
    pub fn new(config: DbConfig) -> DbResult<Self> {
        config.validate()?;
        let store = SnapshotStore::new(config.snapshot_path(), config.fsync);
        Ok(Self {
            config,
            store,
            tables: RwLock::new(HashMap::new()),
            save_lock: Mutex::new(()),
            metrics: MetricsRegistry::new(),
            initialized: false,
        })
    }

    /// `new` followed by `init`
    pub fn open(config: DbConfig) -> DbResult<Self> {
        let mut db = Self::new(config)?;
        db.init()?;
        Ok(db)
    }

    /// Loads the snapshot if it exists, replacing the in-memory tables;
    /// otherwise writes an empty snapshot.
    ///
    /// # Errors
    ///
    /// - `CorruptSnapshot` / `UnsupportedFormatVersion` if the file cannot be
    ///   decoded
    /// - `PersistenceFailure` if the file cannot be read or written
    pub fn init(&mut self) -> DbResult<()> {
        let path = self.store.path().display().to_string();

        if self.store.exists() {
            let snapshot = self.store.load()?;
            if !snapshot.database.is_empty() && snapshot.database != self.config.name {
                Logger::warn(
                    "SNAPSHOT_NAME_MISMATCH",
                    &[
                        ("expected", self.config.name.as_str()),
                        ("found", snapshot.database.as_str()),
                        ("path", path.as_str()),
                    ],
                );
            }

            let count = snapshot.tables.len().to_string();
            let registry: Registry = snapshot
                .tables
                .into_iter()
                .map(|(name, table)| (name, Arc::new(RwLock::new(table))))
                .collect();
            *self
                .tables
                .get_mut()
                .map_err(|_| DbError::LockPoisoned("table registry"))? = registry;

            self.initialized = true;
            Logger::info(
                Event::InitLoaded.as_str(),
                &[
                    ("database", self.config.name.as_str()),
                    ("path", path.as_str()),
                    ("tables", count.as_str()),
                ],
            );
        } else {
            self.persist()?;
            self.initialized = true;
            Logger::info(
                Event::InitCreated.as_str(),
                &[("database", self.config.name.as_str()), ("path", path.as_str())],
            );
        }

        Ok(())
    }

    /// Creates an empty table. Returns `false` without saving if `name`
    /// already exists.
    ///
    /// # Errors
    ///
    /// - `InvalidTableName` for a blank name
    /// - `ReservedField` if the schema declares `id`
    /// - `PersistenceFailure` if the save fails; the table stays created
    pub fn create_table(&self, name: &str, schema: TableSchema) -> DbResult<bool> {
        self.ensure_initialized()?;
        if name.trim().is_empty() {
            return Err(self.reject(name, DbError::InvalidTableName(name.to_string())));
        }

        {
            let mut registry = self.write_registry()?;
            if registry.contains_key(name) {
                return Ok(false);
            }
            validate_table_schema(&schema).map_err(|e| self.reject_schema(name, e))?;
            registry.insert(name.to_string(), Arc::new(RwLock::new(Table::new(schema))));
        }

        self.metrics.increment_tables_created();
        Logger::info(Event::TableCreated.as_str(), &[("table", name)]);
        self.persist()?;
        Ok(true)
    }

    /// Validates and stores `record`, returning the stored row with its id.
    ///
    /// # Errors
    ///
    /// - `TableNotFound`
    /// - `RequiredFieldMissing`, `InvalidFieldType`, `UnknownField`
    /// - `IdSpaceExhausted` once the table's id counter is at its maximum
    /// - `PersistenceFailure` (the row is stored in memory)
    pub fn insert(&self, table: &str, record: Record) -> DbResult<Row> {
        self.ensure_initialized()?;
        let handle = self.handle(table)?;

        let row = {
            let mut guard = write_table(&handle)?;
            SchemaValidator::new(guard.schema())
                .allow_undeclared(self.config.allow_undeclared_fields)
                .validate_insert(&record)
                .map_err(|e| self.reject_schema(table, e))?;
            guard
                .append(record)
                .ok_or_else(|| self.reject(table, DbError::IdSpaceExhausted(table.to_string())))?
        };

        self.metrics.increment_rows_inserted();
        if let Some(id) = crate::table::row_id(&row) {
            Logger::trace(
                Event::RowInserted.as_str(),
                &[("id", id.to_string().as_str()), ("table", table)],
            );
        }
        self.persist()?;
        Ok(row)
    }

    /// Returns every row equal to `conditions` on all given fields.
    pub fn select(&self, table: &str, conditions: &Record) -> DbResult<Vec<Row>> {
        self.ensure_initialized()?;
        let handle = self.handle(table)?;
        let guard = read_table(&handle)?;

        self.metrics.increment_selects();
        Ok(guard
            .rows()
            .iter()
            .filter(|row| ConditionFilter::matches(row, conditions))
            .cloned()
            .collect())
    }

    /// Merges `updates` into row `id` and returns the merged row.
    ///
    /// # Errors
    ///
    /// - `TableNotFound`, `RecordNotFound`
    /// - `UnknownField` for undeclared keys, including `id`
    /// - `InvalidFieldType`
    /// - `PersistenceFailure` (the update is applied in memory)
    pub fn update(&self, table: &str, id: u64, updates: Record) -> DbResult<Row> {
        self.ensure_initialized()?;
        let handle = self.handle(table)?;

        let merged = {
            let mut guard = write_table(&handle)?;
            let index = guard.position_of(id).ok_or_else(|| {
                self.reject(
                    table,
                    DbError::RecordNotFound {
                        table: table.to_string(),
                        id,
                    },
                )
            })?;
            SchemaValidator::new(guard.schema())
                .validate_update(&updates)
                .map_err(|e| self.reject_schema(table, e))?;

            let mut merged = guard.rows()[index].clone();
            for (field, value) in updates {
                merged.insert(field, value);
            }
            guard.replace(index, merged.clone());
            merged
        };

        self.metrics.increment_rows_updated();
        Logger::trace(
            Event::RowUpdated.as_str(),
            &[("id", id.to_string().as_str()), ("table", table)],
        );
        self.persist()?;
        Ok(merged)
    }

    /// Removes row `id`.
    ///
    /// # Errors
    ///
    /// - `TableNotFound`, `RecordNotFound`
    /// - `PersistenceFailure` (the row is removed from memory)
    pub fn delete(&self, table: &str, id: u64) -> DbResult<()> {
        self.ensure_initialized()?;
        let handle = self.handle(table)?;

        {
            let mut guard = write_table(&handle)?;
            let index = guard.position_of(id).ok_or_else(|| {
                self.reject(
                    table,
                    DbError::RecordNotFound {
                        table: table.to_string(),
                        id,
                    },
                )
            })?;
            guard.remove(index);
        }

        self.metrics.increment_rows_deleted();
        Logger::trace(
            Event::RowDeleted.as_str(),
            &[("id", id.to_string().as_str()), ("table", table)],
        );
        self.persist()
    }

    /// Left-outer join: each row of `left` plus a field named `right` holding
    /// the first row of `right` whose `id` equals the row's `foreign_key`,
    /// or `null`. The result has exactly as many rows as `left`.
    pub fn join(&self, left: &str, right: &str, foreign_key: &str) -> DbResult<Vec<Row>> {
        self.ensure_initialized()?;
        let (left_handle, right_handle) = {
            let registry = self.read_registry()?;
            match (registry.get(left), registry.get(right)) {
                (Some(l), Some(r)) => (Arc::clone(l), Arc::clone(r)),
                (None, _) => return Err(DbError::TableNotFound(left.to_string())),
                (_, None) => return Err(DbError::TableNotFound(right.to_string())),
            }
        };

        // Read locks are taken in name order, as in `persist`. A second read
        // lock on the same table from one thread may deadlock.
        let (left_guard, right_guard) = if Arc::ptr_eq(&left_handle, &right_handle) {
            (read_table(&left_handle)?, None)
        } else if left < right {
            let left_guard = read_table(&left_handle)?;
            (left_guard, Some(read_table(&right_handle)?))
        } else {
            let right_guard = read_table(&right_handle)?;
            (read_table(&left_handle)?, Some(right_guard))
        };
        let right_rows = right_guard.as_ref().unwrap_or(&left_guard).rows();

        self.metrics.increment_joins();
        Ok(left_guard
            .rows()
            .iter()
            .map(|row| JoinLookup::attach(row, right_rows, foreign_key, right))
            .collect())
    }

    /// Writes the current state to the snapshot. Use after a
    /// `PersistenceFailure` to bring the disk back in line with memory.
    pub fn save(&self) -> DbResult<()> {
        self.ensure_initialized()?;
        self.persist()
    }

    /// Table names in sorted order
    pub fn table_names(&self) -> DbResult<Vec<String>> {
        self.ensure_initialized()?;
        let mut names: Vec<String> = self.read_registry()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn schema(&self, table: &str) -> DbResult<TableSchema> {
        self.ensure_initialized()?;
        let handle = self.handle(table)?;
        let guard = read_table(&handle)?;
        Ok(guard.schema().clone())
    }

    /// Number of rows in `table`
    pub fn count(&self, table: &str) -> DbResult<usize> {
        self.ensure_initialized()?;
        let handle = self.handle(table)?;
        let guard = read_table(&handle)?;
        Ok(guard.len())
    }

    /// Id the next insert into `table` will receive
    pub fn next_id(&self, table: &str) -> DbResult<u64> {
        self.ensure_initialized()?;
        let handle = self.handle(table)?;
        let guard = read_table(&handle)?;
        Ok(guard.next_id())
    }

    /// Human-readable dump of every table's schema and rows, followed by
    /// this handle's counters
    pub fn describe(&self) -> DbResult<String> {
        self.ensure_initialized()?;
        let mut out = String::new();
        let _ = writeln!(out, "Database: {}", self.config.name);

        for (name, handle) in self.sorted_handles()? {
            let guard = read_table(&handle)?;
            let schema = guard
                .schema()
                .iter()
                .map(|(field, def)| format!("\"{}\":{}", field, def))
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(out, "Table: {}", name);
            let _ = writeln!(out, "Schema: {{{}}}", schema);
            let _ = writeln!(out, "Next id: {}", guard.next_id());
            let _ = writeln!(out, "Data: {}", serde_json::Value::from(guard.rows().to_vec()));
        }
        let _ = writeln!(out, "Metrics: {}", self.metrics.to_json());

        Ok(out)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn snapshot_path(&self) -> &Path {
        self.store.path()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn persist(&self) -> DbResult<()> {
        let _writer = self
            .save_lock
            .lock()
            .map_err(|_| DbError::LockPoisoned("snapshot writer"))?;

        let handles = self.sorted_handles()?;
        let guards = handles
            .iter()
            .map(|(name, handle)| read_table(handle).map(|guard| (name.as_str(), guard)))
            .collect::<DbResult<Vec<_>>>()?;

        let encoded = encode_snapshot(
            &self.config.name,
            guards.iter().map(|(name, guard)| (*name, &**guard)),
        );
        drop(guards);

        let result = encoded
            .map_err(|e| DbError::persistence(self.store.path(), e.into()))
            .and_then(|bytes| self.store.write_atomic(&bytes));

        let path = self.store.path().display().to_string();
        match &result {
            Ok(()) => {
                self.metrics.increment_snapshots_written();
                Logger::trace(Event::SnapshotSaved.as_str(), &[("path", path.as_str())]);
            }
            Err(e) => {
                self.metrics.increment_snapshot_failures();
                Logger::error(
                    Event::SnapshotFailed.as_str(),
                    &[("error", e.to_string().as_str()), ("path", path.as_str())],
                );
            }
        }
        result
    }

    fn ensure_initialized(&self) -> DbResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(DbError::NotInitialized(self.config.name.clone()))
        }
    }

    fn reject(&self, table: &str, err: DbError) -> DbError {
        self.metrics.increment_writes_rejected();
        Logger::info(
            Event::ValidationRejected.as_str(),
            &[("code", err.code()), ("reason", err.to_string().as_str()), ("table", table)],
        );
        err
    }

    /// Like `reject`, also naming the offending field
    fn reject_schema(&self, table: &str, err: SchemaError) -> DbError {
        self.metrics.increment_writes_rejected();
        let field = err.field().to_string();
        let err = DbError::from(err);
        Logger::info(
            Event::ValidationRejected.as_str(),
            &[
                ("code", err.code()),
                ("field", field.as_str()),
                ("reason", err.to_string().as_str()),
                ("table", table),
            ],
        );
        err
    }

    fn handle(&self, table: &str) -> DbResult<TableHandle> {
        self.read_registry()?
            .get(table)
            .cloned()
            .ok_or_else(|| DbError::TableNotFound(table.to_string()))
    }

    fn sorted_handles(&self) -> DbResult<Vec<(String, TableHandle)>> {
        let mut handles: Vec<_> = self
            .read_registry()?
            .iter()
            .map(|(name, handle)| (name.clone(), Arc::clone(handle)))
            .collect();
        handles.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(handles)
    }

    fn read_registry(&self) -> DbResult<RwLockReadGuard<'_, Registry>> {
        self.tables
            .read()
            .map_err(|_| DbError::LockPoisoned("table registry"))
    }

    fn write_registry(&self) -> DbResult<RwLockWriteGuard<'_, Registry>> {
        self.tables
            .write()
            .map_err(|_| DbError::LockPoisoned("table registry"))
    }
}

fn read_table(handle: &TableHandle) -> DbResult<RwLockReadGuard<'_, Table>> {
    handle.read().map_err(|_| DbError::LockPoisoned("table"))
}

fn write_table(handle: &TableHandle) -> DbResult<RwLockWriteGuard<'_, Table>> {
    handle.write().map_err(|_| DbError::LockPoisoned("table"))
}
