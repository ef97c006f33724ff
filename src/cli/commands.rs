//! CLI command implementations
//!
//! Every command is read-only: the database is opened only when its
//! snapshot already exists, so inspecting never creates files.

use std::io::Write;

use serde_json::Value;

use crate::config::DbConfig;
use crate::engine::RelationalDb;
use crate::table::Record;

use super::args::{Cli, Command, Target};
use super::errors::{CliError, CliResult};

/// Parse arguments and run the selected command against stdout
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let stdout = std::io::stdout();
    run_command(cli.command, &mut stdout.lock())
}

pub fn run_command<W: Write>(command: Command, out: &mut W) -> CliResult<()> {
    match command {
        Command::Describe { target } => {
            let db = open_existing(&target)?;
            write_text(out, &db.describe()?)
        }
        Command::Tables { target } => {
            let db = open_existing(&target)?;
            let mut text = String::new();
            for name in db.table_names()? {
                text.push_str(&format!("{}\t{}\n", name, db.count(&name)?));
            }
            write_text(out, &text)
        }
        Command::Select {
            target,
            table,
            conditions,
        } => {
            let conditions = parse_conditions(&conditions)?;
            let db = open_existing(&target)?;
            let rows = db.select(&table, &conditions)?;
            write_json(out, &Value::from(rows))
        }
        Command::Join {
            target,
            left,
            right,
            foreign_key,
        } => {
            let db = open_existing(&target)?;
            let rows = db.join(&left, &right, &foreign_key)?;
            write_json(out, &Value::from(rows))
        }
    }
}

fn resolve_config(target: &Target) -> CliResult<DbConfig> {
    match (&target.config, &target.dir, &target.name) {
        (Some(path), _, _) => Ok(DbConfig::load(path)?),
        (None, Some(dir), Some(name)) => {
            let config = DbConfig::new(name.clone(), dir.clone());
            config.validate()?;
            Ok(config)
        }
        _ => Err(CliError::Usage(
            "either --config or both --dir and --name are required".into(),
        )),
    }
}

fn open_existing(target: &Target) -> CliResult<RelationalDb> {
    let config = resolve_config(target)?;
    let path = config.snapshot_path();
    if !path.exists() {
        return Err(CliError::MissingSnapshot(path.display().to_string()));
    }
    Ok(RelationalDb::open(config)?)
}

fn parse_conditions(text: &str) -> CliResult<Record> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(CliError::Usage(format!(
            "--where must be a JSON object, got {}",
            crate::schema::json_type_name(&other)
        ))),
    }
}

fn write_text<W: Write>(out: &mut W, text: &str) -> CliResult<()> {
    out.write_all(text.as_bytes())
        .map_err(|e| CliError::Usage(format!("failed to write output: {}", e)))
}

fn write_json<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    write_text(out, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{table_schema, FieldSchema};
    use serde_json::json;
    use tempfile::TempDir;

    fn target(temp: &TempDir) -> Target {
        Target {
            config: None,
            dir: Some(temp.path().to_path_buf()),
            name: Some("shop".into()),
        }
    }

    fn seed(temp: &TempDir) {
        let db = RelationalDb::open(DbConfig::new("shop", temp.path()).with_fsync(false)).unwrap();
        db.create_table("users", table_schema([("name", FieldSchema::required_string())]))
            .unwrap();
        db.insert("users", json!({"name": "Ana"}).as_object().cloned().unwrap())
            .unwrap();
        db.insert("users", json!({"name": "Bo"}).as_object().cloned().unwrap())
            .unwrap();
    }

    #[test]
    fn test_missing_snapshot_is_not_created() {
        let temp = TempDir::new().unwrap();
        let mut out = Vec::new();
        let err = run_command(Command::Describe { target: target(&temp) }, &mut out).unwrap_err();
        assert!(matches!(err, CliError::MissingSnapshot(_)));
        assert!(!temp.path().join("shop.db.json").exists());
    }

    #[test]
    fn test_tables_lists_counts() {
        let temp = TempDir::new().unwrap();
        seed(&temp);
        let mut out = Vec::new();
        run_command(Command::Tables { target: target(&temp) }, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "users\t2\n");
    }

    #[test]
    fn test_select_with_conditions() {
        let temp = TempDir::new().unwrap();
        seed(&temp);
        let mut out = Vec::new();
        run_command(
            Command::Select {
                target: target(&temp),
                table: "users".into(),
                conditions: r#"{"name": "Bo"}"#.into(),
            },
            &mut out,
        )
        .unwrap();
        let rows: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(rows, json!([{"id": 2, "name": "Bo"}]));
    }

    #[test]
    fn test_where_must_be_object() {
        assert!(matches!(parse_conditions("[1]"), Err(CliError::Usage(_))));
        assert!(matches!(parse_conditions("{"), Err(CliError::Json(_))));
    }
}
