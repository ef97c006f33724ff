//! Structured JSON logger
//!
//! - One log line = one JSON object
//! - `event` first, then `severity`, then fields sorted by key
//! - Synchronous, no buffering
//! - Write failures are swallowed; logging never fails an operation
//! - Minimum severity from `RELSTORE_LOG` (trace|info|warn|error|off),
//!   INFO when unset

use std::fmt;
use std::io::{self, Write};
use std::sync::OnceLock;

use serde_json::{Map, Value};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    fn parse(level: &str) -> Option<Self> {
        match level.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Severity::Trace),
            "info" => Some(Severity::Info),
            "warn" => Some(Severity::Warn),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }
}

/// Cached minimum severity; `None` disables logging
static MIN_SEVERITY: OnceLock<Option<Severity>> = OnceLock::new();

fn min_severity() -> Option<Severity> {
    *MIN_SEVERITY.get_or_init(|| match std::env::var("RELSTORE_LOG") {
        Ok(level) if level.eq_ignore_ascii_case("off") => None,
        Ok(level) => Severity::parse(&level).or(Some(Severity::Info)),
        Err(_) => Some(Severity::Info),
    })
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub struct Logger;

impl Logger {
    /// Log an event to stderr. The host's stdout is left alone.
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        match min_severity() {
            Some(min) if severity >= min => {}
            _ => return,
        }
        Self::log_to_writer(severity, event, fields, &mut io::stderr());
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let mut line = render(severity, event, fields);
        line.push('\n');
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

/// Renders one log line without the trailing newline.
///
/// The map preserves insertion order, so the key order is fixed here.
fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut object = Map::with_capacity(fields.len() + 2);
    object.insert("event".into(), Value::from(event));
    object.insert("severity".into(), Value::from(severity.as_str()));

    let mut sorted: Vec<_> = fields.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);
    for (key, value) in sorted {
        if *key == "event" || *key == "severity" {
            continue;
        }
        object.insert((*key).to_string(), Value::from(*value));
    }

    Value::Object(object).to_string()
}

/// Capture logs to a buffer for testing
#[cfg(test)]
pub fn capture_log(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut buffer = Vec::new();
    Logger::log_to_writer(severity, event, fields, &mut buffer);
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_json_format() {
        let output = capture_log(Severity::Info, "TABLE_CREATED", &[("table", "users")]);
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["event"], "TABLE_CREATED");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["table"], "users");
    }

    #[test]
    fn test_log_deterministic_ordering() {
        let output1 = capture_log(Severity::Info, "T", &[("zebra", "1"), ("apple", "2")]);
        let output2 = capture_log(Severity::Info, "T", &[("apple", "2"), ("zebra", "1")]);
        assert_eq!(output1, output2);

        let event_pos = output1.find("\"event\"").unwrap();
        let severity_pos = output1.find("\"severity\"").unwrap();
        let apple_pos = output1.find("apple").unwrap();
        let zebra_pos = output1.find("zebra").unwrap();
        assert!(event_pos < severity_pos);
        assert!(severity_pos < apple_pos);
        assert!(apple_pos < zebra_pos);
    }

    #[test]
    fn test_log_escapes_special_chars() {
        let output = capture_log(Severity::Warn, "T", &[("message", "a \"b\"\nc")]);
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["message"], "a \"b\"\nc");
        assert_eq!(output.matches('\n').count(), 1);
    }

    #[test]
    fn test_parse_levels() {
        assert_eq!(Severity::parse("TRACE"), Some(Severity::Trace));
        assert_eq!(Severity::parse(" warn "), Some(Severity::Warn));
        assert_eq!(Severity::parse("loud"), None);
    }

    #[test]
    fn test_reserved_keys_not_overwritten() {
        let output = capture_log(Severity::Error, "REAL", &[("event", "FAKE")]);
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["event"], "REAL");
        assert_eq!(parsed["severity"], "ERROR");
    }
}
