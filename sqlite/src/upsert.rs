//! Guarded insert-or-replace statements.
//!
//! A row has two unique keys: the generated `id` and the human-readable
//! `slug`. A plain `INSERT OR REPLACE` would silently delete a different row
//! that happens to share one of them. The statement built here refuses the
//! write instead: it changes nothing when the slug belongs to another id, or
//! when the id is stored under another slug. The caller sees zero affected
//! rows.
//!
//! Slugs are unique per table, not per context: `context` narrows lookups
//! but a slug taken in one context cannot be reused in another.
//!
//! `created_at` is carried over from the row being replaced, and `updated_at`
//! moves strictly forward from it, so two writes within the same millisecond
//! still get distinct stamps. The insert trigger only stamps rows that have
//! neither.

use serde_json::Value;
use smrt_core::{ObjectTypeDescriptor, Record, slugify, validate_identifier};

use crate::convert::encode_field;
use crate::database::Database;
use crate::error::Result;
use crate::migration::next_timestamp;

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Builds the guarded upsert for one object.
///
/// Parameters `?1`, `?2`, `?3` are id, slug, and context; declared columns
/// follow in field order. Values missing from `record` bind as `NULL`.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use smrt_core::{ObjectTypeDescriptor, fields::text};
/// use smrt_sqlite::build_upsert;
///
/// let descriptor = ObjectTypeDescriptor::new("Tag", [text("name")].into_iter().collect());
/// let record = json!({"name": "Rust"}).as_object().cloned().unwrap();
/// let stmt = build_upsert(&descriptor, "id-1", Some("rust"), "", &record).unwrap();
/// assert!(stmt.sql.starts_with("INSERT OR REPLACE INTO tags (id, slug, context, name, created_at, updated_at)"));
/// assert_eq!(stmt.params, vec![json!("id-1"), json!("rust"), json!(""), json!("Rust")]);
/// ```
pub fn build_upsert(
    descriptor: &ObjectTypeDescriptor,
    id: &str,
    slug: Option<&str>,
    context: &str,
    record: &Record,
) -> Result<UpsertStatement> {
    let table = validate_identifier(&descriptor.table_name)?;

    let mut columns = vec!["id", "slug", "context"];
    let mut placeholders = vec!["?1".to_string(), "?2".to_string(), "?3".to_string()];
    let mut params = vec![
        Value::from(id),
        slug.map_or(Value::Null, Value::from),
        Value::from(context),
    ];

    for field in descriptor.fields.columns() {
        columns.push(validate_identifier(&field.name)?);
        let value = record.get(&field.name).unwrap_or(&Value::Null);
        params.push(sql_to_json(encode_field(field, value)));
        placeholders.push(format!("?{}", params.len()));
    }
    columns.push("created_at");
    placeholders.push(format!("(SELECT created_at FROM {table} WHERE id = ?1)"));
    columns.push("updated_at");
    placeholders.push(format!(
        "(SELECT {} FROM {table} WHERE id = ?1)",
        next_timestamp("updated_at")
    ));

    let sql = format!(
        "INSERT OR REPLACE INTO {table} ({}) SELECT {} \
         WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE (slug = ?2 AND id != ?1) OR (id = ?1 AND slug != ?2))",
        columns.join(", "),
        placeholders.join(", ")
    );

    Ok(UpsertStatement { sql, params })
}

/// Brings an encoded storage value back to JSON for binding through
/// [`Database`], which takes JSON parameters.
fn sql_to_json(value: rusqlite::types::Value) -> Value {
    use rusqlite::types::Value as SqlValue;
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::from(i),
        SqlValue::Real(f) => Value::from(f),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(b) => Value::from(b),
    }
}

/// Slug for a record without one: the slugified `name`, if present.
pub fn derive_slug(record: &Record) -> Option<String> {
    let name = record.get("name")?.as_str()?;
    let slug = slugify(name);
    (!slug.is_empty()).then_some(slug)
}

/// Looks up the id of the row with this slug in this context.
pub fn find_identifier(
    db: &dyn Database,
    table: &str,
    slug: &str,
    context: &str,
) -> Result<Option<String>> {
    let table = validate_identifier(table)?;
    let id = db.pluck(
        &format!("SELECT id FROM {table} WHERE slug = ?1 AND context = ?2 LIMIT 1"),
        &[Value::from(slug), Value::from(context)],
    )?;
    Ok(id.and_then(|v| v.as_str().map(String::from)))
}

/// Existing id for `slug` within `context`, or a fresh UUID v4.
pub fn resolve_identifier(
    db: &dyn Database,
    table: &str,
    slug: Option<&str>,
    context: &str,
) -> Result<String> {
    if let Some(slug) = slug
        && let Some(id) = find_identifier(db, table, slug, context)?
    {
        return Ok(id);
    }
    Ok(uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqliteDatabase;
    use crate::migration::synchronize;
    use crate::schema::generate_schema_sql;
    use serde_json::json;
    use smrt_core::fields::{boolean, json as json_field, text};
    use smrt_core::{FieldTable, is_uuid};

    fn descriptor() -> ObjectTypeDescriptor {
        let fields: FieldTable = [text("name"), boolean("active"), json_field("meta")]
            .into_iter()
            .collect();
        ObjectTypeDescriptor::new("Tag", fields)
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn setup() -> SqliteDatabase {
        let db = SqliteDatabase::open_in_memory().unwrap();
        synchronize(&db, &generate_schema_sql(&descriptor()).unwrap()).unwrap();
        db
    }

    fn write(db: &SqliteDatabase, id: &str, slug: &str, name: &str) -> usize {
        let stmt = build_upsert(
            &descriptor(),
            id,
            Some(slug),
            "",
            &record(json!({"name": name, "active": true})),
        )
        .unwrap();
        db.execute(&stmt.sql, &stmt.params).unwrap()
    }

    #[test]
    fn test_statement_shape_and_encoding() {
        let stmt = build_upsert(
            &descriptor(),
            "x",
            None,
            "ctx",
            &record(json!({"name": "n", "active": false, "meta": {"a": 1}})),
        )
        .unwrap();
        assert!(stmt.sql.contains("(SELECT created_at FROM tags WHERE id = ?1)"));
        assert!(stmt.sql.ends_with(
            "WHERE NOT EXISTS (SELECT 1 FROM tags WHERE (slug = ?2 AND id != ?1) OR (id = ?1 AND slug != ?2))"
        ));
        assert_eq!(
            stmt.params,
            vec![json!("x"), Value::Null, json!("ctx"), json!("n"), json!(0), json!("{\"a\":1}")]
        );
    }

    #[test]
    fn test_replace_same_keys_keeps_one_row() {
        let db = setup();
        assert_eq!(write(&db, "a", "same", "First"), 1);
        assert_eq!(write(&db, "a", "same", "Second"), 1);
        let count = db.pluck("SELECT COUNT(*) FROM tags", &[]).unwrap();
        assert_eq!(count, Some(json!(1)));
        let name = db.pluck("SELECT name FROM tags WHERE id = 'a'", &[]).unwrap();
        assert_eq!(name, Some(json!("Second")));
    }

    #[test]
    fn test_slug_collision_changes_nothing() {
        let db = setup();
        write(&db, "a", "shared", "A");
        assert_eq!(write(&db, "b", "shared", "B"), 0);
        let rows = db.query("SELECT id, name FROM tags", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("a"));
        assert_eq!(rows[0]["name"], json!("A"));
    }

    #[test]
    fn test_id_under_other_slug_changes_nothing() {
        let db = setup();
        write(&db, "a", "one", "A");
        assert_eq!(write(&db, "a", "two", "A2"), 0);
        let slug = db.pluck("SELECT slug FROM tags WHERE id = 'a'", &[]).unwrap();
        assert_eq!(slug, Some(json!("one")));
    }

    #[test]
    fn test_created_at_survives_replace() {
        let db = setup();
        write(&db, "a", "s", "A");
        let first = db.pluck("SELECT created_at FROM tags WHERE id = 'a'", &[]).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        write(&db, "a", "s", "A");
        let second = db.pluck("SELECT created_at FROM tags WHERE id = 'a'", &[]).unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_updated_at_moves_forward_within_a_millisecond() {
        let db = setup();
        write(&db, "a", "s", "A");
        let stamp = |db: &SqliteDatabase| {
            db.pluck("SELECT updated_at FROM tags WHERE id = 'a'", &[])
                .unwrap()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap()
        };

        let mut previous = stamp(&db);
        for _ in 0..50 {
            assert_eq!(write(&db, "a", "s", "A"), 1);
            let next = stamp(&db);
            assert!(next > previous, "{next} should follow {previous}");
            previous = next;
        }
    }

    #[test]
    fn test_slug_is_unique_across_contexts() {
        let db = setup();
        write(&db, "a", "shared", "A");
        let stmt = build_upsert(
            &descriptor(),
            "b",
            Some("shared"),
            "elsewhere",
            &record(json!({"name": "B"})),
        )
        .unwrap();
        assert_eq!(db.execute(&stmt.sql, &stmt.params).unwrap(), 0);
        let count = db.pluck("SELECT COUNT(*) FROM tags", &[]).unwrap();
        assert_eq!(count, Some(json!(1)));
    }

    #[test]
    fn test_derive_slug() {
        assert_eq!(derive_slug(&record(json!({"name": "Hello World"}))).as_deref(), Some("hello-world"));
        assert_eq!(derive_slug(&record(json!({"name": "!!"}))), None);
        assert_eq!(derive_slug(&record(json!({"title": "x"}))), None);
    }

    #[test]
    fn test_resolve_identifier_reuses_or_mints() {
        let db = setup();
        write(&db, "known-id", "known", "K");
        assert_eq!(resolve_identifier(&db, "tags", Some("known"), "").unwrap(), "known-id");
        assert!(is_uuid(&resolve_identifier(&db, "tags", Some("known"), "other").unwrap()));
        assert!(is_uuid(&resolve_identifier(&db, "tags", None, "").unwrap()));
    }
}
