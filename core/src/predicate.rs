//! Compiles flat filter objects into parameterized `WHERE` fragments.
//!
//! Keys are a bare field name (`"status"`) or a field name followed by an
//! operator (`"price >"`). Conditions are joined with `AND` in key order.
//! Values are never spliced into the fragment; each one gets a `$N`
//! placeholder.
//!
//! ```
//! use serde_json::json;
//! use smrt_core::compile;
//!
//! let filter = json!({"price >": 100, "status": "active", "deleted_at": null});
//! let predicate = compile(filter.as_object().unwrap()).unwrap();
//! assert_eq!(
//!     predicate.fragment,
//!     "WHERE price > $1 AND status = $2 AND deleted_at IS NULL"
//! );
//! assert_eq!(predicate.values, vec![json!(100), json!("active")]);
//! ```

use std::fmt;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::naming::validate_column_ref;

/// Comparison operators accepted in filter keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Ne,
    Like,
    In,
}

impl Operator {
    /// Parses an operator token. `like` and `in` are case-insensitive.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "=" => Some(Operator::Eq),
            ">" => Some(Operator::Gt),
            ">=" => Some(Operator::Gte),
            "<" => Some(Operator::Lt),
            "<=" => Some(Operator::Lte),
            "!=" => Some(Operator::Ne),
            t if t.eq_ignore_ascii_case("like") => Some(Operator::Like),
            t if t.eq_ignore_ascii_case("in") => Some(Operator::In),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Ne => "!=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A compiled filter: SQL fragment plus positional values.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPredicate {
    /// Empty, or `WHERE` followed by the conditions.
    pub fragment: String,
    /// Values in placeholder order.
    pub values: Vec<Value>,
    start_index: usize,
}

impl QueryPredicate {
    /// An empty predicate whose placeholders would start at `start_index`.
    pub fn empty(start_index: usize) -> Self {
        Self {
            fragment: String::new(),
            values: Vec::new(),
            start_index,
        }
    }

    /// Index of the next free placeholder after this predicate's values.
    pub fn next_index(&self) -> usize {
        self.start_index + self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragment.is_empty()
    }
}

/// Compiles `filter` with placeholders numbered from `$1`.
pub fn compile(filter: &Map<String, Value>) -> Result<QueryPredicate> {
    compile_from(filter, 1)
}

/// Compiles `filter` with placeholders numbered from `$start_index`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidIdentifier`](crate::CoreError::InvalidIdentifier)
/// if a field name contains characters outside `[A-Za-z0-9_.]`.
pub fn compile_from(filter: &Map<String, Value>, start_index: usize) -> Result<QueryPredicate> {
    let mut predicate = QueryPredicate::empty(start_index);
    if filter.is_empty() {
        return Ok(predicate);
    }

    let mut conditions = Vec::with_capacity(filter.len());
    for (key, value) in filter {
        let (field, op) = split_key(key);
        let field = validate_column_ref(field)?;

        let condition = match (op, value) {
            (Operator::Eq, Value::Null) => format!("{field} IS NULL"),
            (Operator::Ne, Value::Null) => format!("{field} IS NOT NULL"),
            (Operator::In, Value::Array(items)) if items.is_empty() => "1 = 0".to_string(),
            (Operator::In, Value::Array(items)) => {
                let placeholders: Vec<String> = items
                    .iter()
                    .map(|item| {
                        let placeholder = format!("${}", predicate.next_index());
                        predicate.values.push(item.clone());
                        placeholder
                    })
                    .collect();
                format!("{field} IN ({})", placeholders.join(", "))
            }
            (Operator::In, scalar) => {
                let placeholder = format!("${}", predicate.next_index());
                predicate.values.push(scalar.clone());
                format!("{field} IN ({placeholder})")
            }
            (op, value) => {
                let placeholder = format!("${}", predicate.next_index());
                predicate.values.push(value.clone());
                format!("{field} {op} {placeholder}")
            }
        };
        conditions.push(condition);
    }

    predicate.fragment = format!("WHERE {}", conditions.join(" AND "));
    Ok(predicate)
}

/// Splits `"field op"` at the first whitespace. A missing operator means `=`;
/// an unknown one falls back to `=` with a warning.
fn split_key(key: &str) -> (&str, Operator) {
    let key = key.trim();
    let Some((field, rest)) = key.split_once(char::is_whitespace) else {
        return (key, Operator::Eq);
    };
    let token = rest.trim();
    let op = Operator::parse(token).unwrap_or_else(|| {
        tracing::warn!(field, operator = token, "unknown operator, falling back to '='");
        Operator::Eq
    });
    (field, op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile_json(value: Value) -> QueryPredicate {
        compile(value.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_empty_filter() {
        let predicate = compile_json(json!({}));
        assert_eq!(predicate.fragment, "");
        assert!(predicate.values.is_empty());
        assert_eq!(predicate.next_index(), 1);
    }

    #[test]
    fn test_mixed_conditions_in_key_order() {
        let predicate = compile_json(json!({"price >": 100, "status": "active", "deleted_at": null}));
        assert_eq!(
            predicate.fragment,
            "WHERE price > $1 AND status = $2 AND deleted_at IS NULL"
        );
        assert_eq!(predicate.values, vec![json!(100), json!("active")]);
    }

    #[test]
    fn test_unknown_operator_falls_back_to_eq() {
        let predicate = compile_json(json!({"price ##": 5}));
        assert_eq!(predicate.fragment, "WHERE price = $1");
        assert_eq!(predicate.values, vec![json!(5)]);
    }

    #[test]
    fn test_not_null_and_comparisons() {
        let predicate = compile_json(json!({
            "archived_at !=": null,
            "qty >=": 1,
            "qty <=": 9,
            "rank <": 3,
            "code !=": "x"
        }));
        assert_eq!(
            predicate.fragment,
            "WHERE archived_at IS NOT NULL AND qty >= $1 AND qty <= $2 AND rank < $3 AND code != $4"
        );
        assert_eq!(predicate.values.len(), 4);
    }

    #[test]
    fn test_in_and_like_forms() {
        let predicate = compile_json(json!({
            "status IN": ["a", "b", "c"],
            "name like": "%gear%",
            "kind in": "solo",
            "tag in": []
        }));
        assert_eq!(
            predicate.fragment,
            "WHERE status IN ($1, $2, $3) AND name LIKE $4 AND kind IN ($5) AND 1 = 0"
        );
        assert_eq!(
            predicate.values,
            vec![json!("a"), json!("b"), json!("c"), json!("%gear%"), json!("solo")]
        );
    }

    #[test]
    fn test_start_index_offsets_placeholders() {
        let filter = json!({"a": 1, "b": 2});
        let predicate = compile_from(filter.as_object().unwrap(), 4).unwrap();
        assert_eq!(predicate.fragment, "WHERE a = $4 AND b = $5");
        assert_eq!(predicate.next_index(), 6);
    }

    #[test]
    fn test_qualified_field_names_allowed() {
        let predicate = compile_json(json!({"products.price >": 1}));
        assert_eq!(predicate.fragment, "WHERE products.price > $1");
    }

    #[test]
    fn test_injection_in_field_name_rejected() {
        let filter = json!({"price) OR 1=1 --": 1});
        assert!(compile(filter.as_object().unwrap()).is_err());
        let filter = json!({"name;DROP": 1});
        assert!(compile(filter.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_values_are_never_inlined() {
        let predicate = compile_json(json!({"name": "x' OR '1'='1"}));
        assert_eq!(predicate.fragment, "WHERE name = $1");
        assert!(!predicate.fragment.contains("OR"));
    }
}
