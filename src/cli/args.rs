//! CLI argument definitions using clap
//!
//! Commands:
//! - relstore-inspect describe --dir <dir> --name <name>
//! - relstore-inspect tables --config <path>
//! - relstore-inspect select --dir <dir> --name <name> --table <t> [--where <json>]
//! - relstore-inspect join --dir <dir> --name <name> --left <a> --right <b> --foreign-key <fk>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Read-only inspection of a relstore snapshot
#[derive(Parser, Debug)]
#[command(name = "relstore-inspect")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Which database to open
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Path to a JSON configuration file
    #[arg(long, conflicts_with_all = ["dir", "name"])]
    pub config: Option<PathBuf>,

    /// Directory holding the snapshot
    #[arg(long, requires = "name")]
    pub dir: Option<PathBuf>,

    /// Database name
    #[arg(long, requires = "dir")]
    pub name: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every table's schema and rows
    Describe {
        #[command(flatten)]
        target: Target,
    },

    /// List tables with row counts
    Tables {
        #[command(flatten)]
        target: Target,
    },

    /// Print rows matching a JSON object of field/value pairs
    Select {
        #[command(flatten)]
        target: Target,

        #[arg(long)]
        table: String,

        /// Conditions, e.g. '{"name": "Ana"}'
        #[arg(long = "where", default_value = "{}")]
        conditions: String,
    },

    /// Print the left-outer join of two tables
    Join {
        #[command(flatten)]
        target: Target,

        #[arg(long)]
        left: String,

        #[arg(long)]
        right: String,

        #[arg(long)]
        foreign_key: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
