//! CLI module for relstore-inspect
//!
//! Read-only commands over an existing snapshot:
//! - describe: schema, counter and rows of every table
//! - tables: table names and row counts
//! - select: conjunctive equality filter
//! - join: left-outer join on a foreign key

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command, Target};
pub use commands::{run, run_command};
pub use errors::{CliError, CliResult};
