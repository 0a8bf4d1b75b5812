//! Conversion between JSON records and SQLite values.
//!
//! Records travel through the runtime as ordered JSON maps. On the way in,
//! booleans become `0`/`1` and structured values become JSON text; on the way
//! out, columns are decoded back according to the declared field kind so the
//! record deserializes into the object's Rust type.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};
use smrt_core::{FieldDefinition, FieldKind, FieldTable, Record};

/// Timestamp format written by the timestamp triggers.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Converts a JSON value to a bindable SQLite value.
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else {
                SqlValue::Real(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Encodes a field value for storage. JSON fields are always stored as JSON
/// text so strings round-trip unambiguously.
pub(crate) fn encode_field(field: &FieldDefinition, value: &Value) -> SqlValue {
    match (field.kind, value) {
        (_, Value::Null) => SqlValue::Null,
        (FieldKind::Json, v) => SqlValue::Text(v.to_string()),
        (_, v) => to_sql(v),
    }
}

/// Converts a raw column value to JSON.
pub(crate) fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

/// Reads every column of `row` into a record keyed by column name.
pub(crate) fn row_to_record(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (idx, name) in columns.iter().enumerate() {
        record.insert(name.clone(), from_sql(row.get_ref(idx)?));
    }
    Ok(record)
}

/// Decodes stored column values back to their declared JSON shape.
pub(crate) fn decode_record(fields: &FieldTable, record: &mut Record) {
    for field in fields.columns() {
        let Some(value) = record.get_mut(&field.name) else {
            continue;
        };
        match (field.kind, &*value) {
            (FieldKind::Boolean, Value::Number(n)) => {
                *value = Value::Bool(n.as_i64().is_some_and(|i| i != 0));
            }
            (FieldKind::Json, Value::String(text)) => {
                if let Ok(parsed) = serde_json::from_str::<Value>(text) {
                    *value = parsed;
                }
            }
            (FieldKind::Decimal, Value::Number(n)) if n.is_i64() => {
                if let Some(f) = n.as_f64().and_then(Number::from_f64) {
                    *value = Value::Number(f);
                }
            }
            _ => {}
        }
    }
}

/// Parses a stored timestamp.
pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
