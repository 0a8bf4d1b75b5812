//! Table definition generation from type descriptors.
//!
//! Every generated table has the same identity frame:
//!
//! - `id TEXT PRIMARY KEY`: generated UUID
//! - `slug TEXT UNIQUE`: human-readable alternate key, unique per table
//! - `context TEXT NOT NULL DEFAULT ''`: scope for slug lookups; it does not
//!   make a slug reusable in another context
//! - one column per column-bearing declared field, in declaration order
//! - `created_at DATETIME`, `updated_at DATETIME`: maintained by triggers
//!
//! The output is plain definition text: one `CREATE TABLE IF NOT EXISTS`
//! statement followed by `CREATE INDEX IF NOT EXISTS` statements, each
//! terminated by `;`. It is meant to be fed to
//! [`synchronize`](crate::synchronize).

use smrt_core::{ObjectTypeDescriptor, validate_identifier};

use crate::error::Result;

/// Renders the `CREATE TABLE` statement for a descriptor.
///
/// # Errors
///
/// Returns an invalid-identifier error if the table name or a field name
/// contains characters outside `[A-Za-z0-9_]`.
///
/// # Examples
///
/// ```
/// use smrt_core::{ObjectTypeDescriptor, fields::{decimal, text}};
/// use smrt_sqlite::generate_table_sql;
///
/// let descriptor = ObjectTypeDescriptor::new(
///     "Product",
///     [text("name").required(), decimal("price")].into_iter().collect(),
/// );
/// let sql = generate_table_sql(&descriptor).unwrap();
/// assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS products (\n  id TEXT PRIMARY KEY,\n"));
/// assert!(sql.contains("  name TEXT NOT NULL,\n  price REAL,\n"));
/// ```
pub fn generate_table_sql(descriptor: &ObjectTypeDescriptor) -> Result<String> {
    let table = validate_identifier(&descriptor.table_name)?;

    let mut columns = vec![
        "id TEXT PRIMARY KEY".to_string(),
        "slug TEXT UNIQUE".to_string(),
        "context TEXT NOT NULL DEFAULT ''".to_string(),
    ];
    for field in descriptor.fields.columns() {
        let name = validate_identifier(&field.name)?;
        let Some(column_type) = field.column_type() else {
            continue;
        };
        let mut column = format!("{name} {column_type}");
        for constraint in field.sql_constraints() {
            column.push(' ');
            column.push_str(&constraint);
        }
        columns.push(column);
    }
    columns.push("created_at DATETIME".to_string());
    columns.push("updated_at DATETIME".to_string());

    let body: Vec<String> = columns.into_iter().map(|c| format!("  {c}")).collect();
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n{}\n);",
        body.join(",\n")
    ))
}

/// Renders the index statements for a descriptor: `(slug, context)` plus one
/// per field declared with `index`.
pub fn generate_index_sql(descriptor: &ObjectTypeDescriptor) -> Result<Vec<String>> {
    let table = validate_identifier(&descriptor.table_name)?;

    let mut statements = vec![format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_slug_context ON {table} (slug, context);"
    )];
    for field in descriptor.fields.columns().filter(|f| f.options.index) {
        let name = validate_identifier(&field.name)?;
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{name} ON {table} ({name});"
        ));
    }
    Ok(statements)
}

/// Renders the full definition text for a descriptor: table then indexes.
pub fn generate_schema_sql(descriptor: &ObjectTypeDescriptor) -> Result<String> {
    let mut sql = generate_table_sql(descriptor)?;
    for index in generate_index_sql(descriptor)? {
        sql.push('\n');
        sql.push_str(&index);
    }
    tracing::debug!(table = %descriptor.table_name, sql = %sql, "generated schema");
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smrt_core::fields::{boolean, foreign_key, integer, many_to_many, text};
    use smrt_core::{FieldTable, ObjectTypeDescriptor};

    fn descriptor(fields: FieldTable) -> ObjectTypeDescriptor {
        ObjectTypeDescriptor::new("Product", fields)
    }

    #[test]
    fn test_identity_frame_only() {
        let sql = generate_table_sql(&descriptor(FieldTable::new())).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS products (\n  id TEXT PRIMARY KEY,\n  slug TEXT UNIQUE,\n  context TEXT NOT NULL DEFAULT '',\n  created_at DATETIME,\n  updated_at DATETIME\n);"
        );
    }

    #[test]
    fn test_fields_render_types_and_constraints() {
        let fields: FieldTable = [
            text("sku").required().unique(),
            integer("stock").default_value(json!(0)),
            boolean("active").default_value(true),
            foreign_key("category", "Category"),
            many_to_many("tags", "Tag"),
        ]
        .into_iter()
        .collect();
        let sql = generate_table_sql(&descriptor(fields)).unwrap();
        assert!(sql.contains("  sku TEXT NOT NULL UNIQUE,\n"));
        assert!(sql.contains("  stock INTEGER DEFAULT 0,\n"));
        assert!(sql.contains("  active INTEGER DEFAULT 1,\n"));
        assert!(sql.contains("  category TEXT,\n"));
        assert!(!sql.contains("tags"));
    }

    #[test]
    fn test_index_statements() {
        let fields: FieldTable = [text("sku").index(), text("name")].into_iter().collect();
        let indexes = generate_index_sql(&descriptor(fields)).unwrap();
        assert_eq!(
            indexes,
            vec![
                "CREATE INDEX IF NOT EXISTS idx_products_slug_context ON products (slug, context);",
                "CREATE INDEX IF NOT EXISTS idx_products_sku ON products (sku);",
            ]
        );
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let bad = descriptor(FieldTable::new()).with_table_name("products; DROP TABLE x");
        assert!(generate_table_sql(&bad).is_err());
        assert!(generate_schema_sql(&bad).is_err());
    }

    #[test]
    fn test_schema_sql_is_deterministic() {
        let fields: FieldTable = [text("name").index()].into_iter().collect();
        let d = descriptor(fields);
        assert_eq!(generate_schema_sql(&d).unwrap(), generate_schema_sql(&d).unwrap());
    }
}
