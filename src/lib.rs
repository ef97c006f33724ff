//! relstore - an embedded, schema-validated record store
//!
//! Tables have a fixed schema of `string`/`number` fields. Rows are JSON
//! objects with an engine-assigned integer `id`. The whole table set is
//! saved to one versioned snapshot file after every mutation.
//!
//! ```no_run
//! use relstore::{table_schema, DbConfig, FieldSchema, RelationalDb};
//! use serde_json::json;
//!
//! # fn main() -> relstore::DbResult<()> {
//! let db = RelationalDb::open(DbConfig::new("shop", "/tmp/shop"))?;
//! db.create_table(
//!     "users",
//!     table_schema([
//!         ("name", FieldSchema::required_string()),
//!         ("age", FieldSchema::optional_number()),
//!     ]),
//! )?;
//! let row = db.insert("users", json!({"name": "Ana", "age": 30}).as_object().cloned().unwrap())?;
//! assert_eq!(row["id"], 1);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod observability;
pub mod schema;
pub mod snapshot;
pub mod table;

pub use config::DbConfig;
pub use engine::RelationalDb;
pub use errors::{DbError, DbResult};
pub use schema::{table_schema, FieldKind, FieldSchema, TableSchema};
pub use table::{Record, Row, Table};
