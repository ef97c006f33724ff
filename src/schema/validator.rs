//! Record validation against a table schema
//!
//! Insert validation:
//! - Every required field is present
//! - Every present declared field has the declared type
//! - Undeclared fields are rejected unless the validator is lenient
//!
//! Update validation:
//! - Every patched field is declared (so `id` can never be patched)
//! - Every patched field has the declared type
//!
//! Declared fields are checked in schema order, so the reported field is
//! deterministic. The validator never mutates what it inspects.

use serde_json::{Map, Value};

use super::errors::{SchemaError, SchemaResult};
use super::types::{json_type_name, FieldSchema, TableSchema, ID_FIELD};

/// Validates records and patches for one table.
pub struct SchemaValidator<'a> {
    schema: &'a TableSchema,
    allow_undeclared: bool,
}

impl<'a> SchemaValidator<'a> {
    /// Creates a strict validator: undeclared fields are rejected.
    pub fn new(schema: &'a TableSchema) -> Self {
        Self {
            schema,
            allow_undeclared: false,
        }
    }

    /// Sets whether undeclared fields pass through unvalidated on insert.
    pub fn allow_undeclared(mut self, allow: bool) -> Self {
        self.allow_undeclared = allow;
        self
    }

    /// Validates a record for insert.
    ///
    /// # Errors
    ///
    /// - `RequiredFieldMissing` if a required field is absent
    /// - `InvalidFieldType` if a declared field has the wrong type
    /// - `UnknownField` if the validator is strict and the record carries an
    ///   undeclared field
    pub fn validate_insert(&self, record: &Map<String, Value>) -> SchemaResult<()> {
        for (name, field) in self.schema {
            match record.get(name) {
                Some(value) => check_type(name, field, value)?,
                None if field.required => {
                    return Err(SchemaError::RequiredFieldMissing(name.clone()))
                }
                None => {}
            }
        }

        if !self.allow_undeclared {
            if let Some(extra) = record.keys().find(|k| !self.schema.contains_key(*k)) {
                return Err(SchemaError::UnknownField(extra.clone()));
            }
        }

        Ok(())
    }

    /// Validates a partial update.
    ///
    /// # Errors
    ///
    /// - `UnknownField` if a key is not declared (this includes `id`)
    /// - `InvalidFieldType` if a value has the wrong type
    pub fn validate_update(&self, updates: &Map<String, Value>) -> SchemaResult<()> {
        for (name, value) in updates {
            let field = self
                .schema
                .get(name)
                .ok_or_else(|| SchemaError::UnknownField(name.clone()))?;
            check_type(name, field, value)?;
        }
        Ok(())
    }
}

/// Checks that a schema does not declare engine-owned fields.
pub fn validate_table_schema(schema: &TableSchema) -> SchemaResult<()> {
    if schema.contains_key(ID_FIELD) {
        return Err(SchemaError::ReservedField(ID_FIELD.to_string()));
    }
    Ok(())
}

fn check_type(name: &str, field: &FieldSchema, value: &Value) -> SchemaResult<()> {
    if field.kind.accepts(value) {
        Ok(())
    } else {
        Err(SchemaError::InvalidFieldType {
            field: name.to_string(),
            expected: field.kind.type_name(),
            actual: json_type_name(value),
        })
    }
}
