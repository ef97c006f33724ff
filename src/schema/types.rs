//! Schema type definitions
//!
//! Supported column types:
//! - string: JSON string
//! - number: any JSON number (integer or floating point)
//!
//! A table schema is an insertion-ordered map of field name to
//! [`FieldSchema`]. The `id` field is owned by the engine and may not be
//! declared.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the engine-assigned row identifier
pub const ID_FIELD: &str = "id";

/// Column type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// UTF-8 string
    String,
    /// Integer or floating point number
    Number,
}

impl FieldKind {
    /// Returns the type name used in errors and in the snapshot
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
        }
    }

    /// Returns true if `value` is of this kind. `null` matches no kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Descriptor of one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Declared value type
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Whether the field must be present on insert
    pub required: bool,
}

impl FieldSchema {
    pub fn new(kind: FieldKind, required: bool) -> Self {
        Self { kind, required }
    }

    /// Create a required string field
    pub fn required_string() -> Self {
        Self::new(FieldKind::String, true)
    }

    /// Create an optional string field
    pub fn optional_string() -> Self {
        Self::new(FieldKind::String, false)
    }

    /// Create a required number field
    pub fn required_number() -> Self {
        Self::new(FieldKind::Number, true)
    }

    /// Create an optional number field
    pub fn optional_number() -> Self {
        Self::new(FieldKind::Number, false)
    }
}

/// Same text as the snapshot encoding: `{"type":"string","required":true}`
impl fmt::Display for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"type\":\"{}\",\"required\":{}}}",
            self.kind.type_name(),
            self.required
        )
    }
}

/// Ordered field definitions of one table
pub type TableSchema = IndexMap<String, FieldSchema>;

/// Builds a [`TableSchema`] from `(name, field)` pairs, keeping their order.
pub fn table_schema<I, S>(fields: I) -> TableSchema
where
    I: IntoIterator<Item = (S, FieldSchema)>,
    S: Into<String>,
{
    fields
        .into_iter()
        .map(|(name, field)| (name.into(), field))
        .collect()
}

/// Returns a description of the JSON type of `value` for error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_schema_display_matches_encoding() {
        let field = FieldSchema::required_string();
        let text = field.to_string();
        assert_eq!(text, r#"{"type":"string","required":true}"#);

        let decoded: FieldSchema = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, field);
    }

    #[test]
    fn test_kind_accepts() {
        assert!(FieldKind::String.accepts(&json!("x")));
        assert!(!FieldKind::String.accepts(&json!(1)));
        assert!(FieldKind::Number.accepts(&json!(1)));
        assert!(FieldKind::Number.accepts(&json!(1.5)));
        assert!(FieldKind::Number.accepts(&json!(-3)));
        assert!(!FieldKind::Number.accepts(&json!("1")));
        assert!(!FieldKind::Number.accepts(&Value::Null));
        assert!(!FieldKind::String.accepts(&Value::Null));
    }

    #[test]
    fn test_table_schema_keeps_order() {
        let schema = table_schema([
            ("zeta", FieldSchema::optional_number()),
            ("alpha", FieldSchema::required_string()),
        ]);
        let names: Vec<_> = schema.keys().cloned().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);

        let encoded = serde_json::to_string(&schema).unwrap();
        assert!(encoded.find("zeta").unwrap() < encoded.find("alpha").unwrap());
    }

    #[test]
    fn test_unknown_type_tag_rejected() {
        let result: Result<FieldSchema, _> =
            serde_json::from_str(r#"{"type":"bool","required":false}"#);
        assert!(result.is_err());
    }
}
