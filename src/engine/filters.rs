//! Row matching for select and join
//!
//! Exact JSON equality only, no coercion. A field missing from a row reads
//! as `null`.

use serde_json::Value;

use crate::table::{row_id, Record, Row};

/// Conjunctive equality filter
pub struct ConditionFilter;

impl ConditionFilter {
    /// True if every condition equals the row's value (AND semantics).
    /// Empty conditions match every row.
    pub fn matches(row: &Row, conditions: &Record) -> bool {
        conditions
            .iter()
            .all(|(field, expected)| row.get(field).unwrap_or(&Value::Null) == expected)
    }
}

/// Left-outer lookup of a foreign row by id
pub struct JoinLookup;

impl JoinLookup {
    /// Copies `left` and attaches, under `attach_as`, the first of `right`
    /// whose `id` equals `left[foreign_key]`, or `null` if none does.
    pub fn attach(left: &Row, right: &[Row], foreign_key: &str, attach_as: &str) -> Row {
        let target = left.get(foreign_key).and_then(Value::as_u64);
        let matched = target
            .and_then(|id| right.iter().find(|row| row_id(row) == Some(id)))
            .map(|row| Value::Object(row.clone()))
            .unwrap_or(Value::Null);

        let mut joined = left.clone();
        joined.insert(attach_as.to_string(), matched);
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_conditions_match_all() {
        assert!(ConditionFilter::matches(&row(json!({"id": 1})), &Record::new()));
    }

    #[test]
    fn test_all_conditions_must_match() {
        let r = row(json!({"id": 1, "name": "Ana", "age": 30}));
        assert!(ConditionFilter::matches(&r, &row(json!({"name": "Ana", "age": 30}))));
        assert!(!ConditionFilter::matches(&r, &row(json!({"name": "Ana", "age": 31}))));
    }

    #[test]
    fn test_no_coercion() {
        let r = row(json!({"id": 1, "age": 30}));
        assert!(!ConditionFilter::matches(&r, &row(json!({"age": "30"}))));
    }

    #[test]
    fn test_missing_field_reads_as_null() {
        let r = row(json!({"id": 1}));
        assert!(ConditionFilter::matches(&r, &row(json!({"age": null}))));
        assert!(!ConditionFilter::matches(&r, &row(json!({"age": 1}))));
    }

    #[test]
    fn test_attach_first_match() {
        let left = row(json!({"id": 1, "user_id": 2}));
        let right = vec![
            row(json!({"id": 1, "name": "a"})),
            row(json!({"id": 2, "name": "b"})),
        ];
        let joined = JoinLookup::attach(&left, &right, "user_id", "users");
        assert_eq!(joined["users"], json!({"id": 2, "name": "b"}));
        assert_eq!(joined["user_id"], 2);
    }

    #[test]
    fn test_attach_absent_marker() {
        let right = vec![row(json!({"id": 1}))];
        let dangling = JoinLookup::attach(&row(json!({"id": 1, "fk": 9})), &right, "fk", "t");
        assert_eq!(dangling["t"], Value::Null);

        let missing = JoinLookup::attach(&row(json!({"id": 1})), &right, "fk", "t");
        assert_eq!(missing["t"], Value::Null);

        let wrong_type = JoinLookup::attach(&row(json!({"id": 1, "fk": "1"})), &right, "fk", "t");
        assert_eq!(wrong_type["t"], Value::Null);
    }
}
