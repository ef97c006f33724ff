//! In-memory table
//!
//! A table is a passive holder of its schema, its rows and the id counter.
//! Validation and id assignment belong to the engine; the mutators here are
//! crate-private so only [`crate::RelationalDb`] can call them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{TableSchema, ID_FIELD};

/// One record, keyed by field name
pub type Record = Map<String, Value>;

/// A stored record. Always carries an integer `id`.
pub type Row = Record;

/// Returns the engine-assigned id of a row, if it has one
pub fn row_id(row: &Row) -> Option<u64> {
    row.get(ID_FIELD).and_then(Value::as_u64)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    schema: TableSchema,
    rows: Vec<Row>,
    next_id: u64,
}

impl Table {
    /// Creates an empty table. The first row gets id 1.
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            next_id: 1,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Id the next insert will receive
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the row with `id`
    pub fn position_of(&self, id: u64) -> Option<usize> {
        self.rows.iter().position(|row| row_id(row) == Some(id))
    }

    /// Stores `record` under the next id and returns the stored row.
    ///
    /// The row starts with `id`, followed by the record's fields. A stray
    /// `id` in the record never overrides the assigned one.
    ///
    /// Returns `None`, leaving the table untouched, once the id counter
    /// cannot advance.
    pub(crate) fn append(&mut self, record: Record) -> Option<Row> {
        let id = self.next_id;
        self.next_id = id.checked_add(1)?;

        let mut row = Row::with_capacity(record.len() + 1);
        row.insert(ID_FIELD.to_string(), Value::from(id));
        for (key, value) in record {
            if key != ID_FIELD {
                row.insert(key, value);
            }
        }

        self.rows.push(row.clone());
        Some(row)
    }

    /// Checks the invariants a decoded table must satisfy: every row has an
    /// id, ids are unique, and `next_id` is above all of them.
    pub(crate) fn check_consistency(&self) -> Result<(), String> {
        if self.next_id == 0 {
            return Err("next_id must be at least 1".into());
        }
        let mut seen = std::collections::HashSet::with_capacity(self.rows.len());
        for (index, row) in self.rows.iter().enumerate() {
            let id = row_id(row).ok_or_else(|| format!("row {} has no integer id", index))?;
            if id >= self.next_id {
                return Err(format!("row id {} is not below next_id {}", id, self.next_id));
            }
            if !seen.insert(id) {
                return Err(format!("duplicate row id {}", id));
            }
        }
        Ok(())
    }

    pub(crate) fn replace(&mut self, index: usize, row: Row) {
        self.rows[index] = row;
    }

    pub(crate) fn remove(&mut self, index: usize) -> Row {
        self.rows.remove(index)
    }
}
