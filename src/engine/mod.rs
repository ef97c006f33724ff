//! Engine subsystem for relstore
//!
//! [`RelationalDb`] is the sole mutator of tables and the sole writer of the
//! snapshot. Every write validates, applies in memory, then saves.
//!
//! # Invariants
//!
//! - Ids are assigned once, from the table counter, and never reused
//! - Validation failures mutate nothing and save nothing
//! - A successful save reflects every table as of that save

mod database;
mod filters;

pub use database::RelationalDb;
pub use filters::{ConditionFilter, JoinLookup};
