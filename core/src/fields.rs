//! Field definitions for persistent object types.
//!
//! A type declares its persisted attributes as an ordered [`FieldTable`] built
//! from the constructor helpers in this module:
//!
//! ```
//! use smrt_core::fields::{boolean, decimal, foreign_key, text, FieldTable};
//!
//! let fields: FieldTable = [
//!     text("name").required(),
//!     decimal("price").min(0.0),
//!     boolean("active").default_value(true),
//!     foreign_key("category", "Category"),
//! ]
//! .into_iter()
//! .collect();
//!
//! assert_eq!(fields.names().collect::<Vec<_>>(), ["name", "price", "active", "category"]);
//! assert_eq!(fields.get("price").unwrap().column_type(), Some("REAL"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column names every persisted table carries regardless of declared fields.
pub const RESERVED_COLUMNS: [&str; 5] = ["id", "slug", "context", "created_at", "updated_at"];

/// The kind of a declared field.
///
/// Every kind maps to exactly one column type, except the collection-side
/// relations which carry metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// UTF-8 text.
    Text,
    /// Whole number.
    Integer,
    /// Floating point number.
    Decimal,
    /// Stored as `0`/`1`.
    Boolean,
    /// Timestamp.
    Datetime,
    /// Structured value stored as JSON text.
    Json,
    /// Identifier of a row in another type's table.
    ForeignKey,
    /// Reverse side of a foreign key; no column.
    OneToMany,
    /// Join-table relation; no column.
    ManyToMany,
}

impl FieldKind {
    /// Returns the SQL column type, or `None` for relation-only kinds.
    pub fn column_type(self) -> Option<&'static str> {
        match self {
            FieldKind::Text => Some("TEXT"),
            FieldKind::Integer => Some("INTEGER"),
            FieldKind::Decimal => Some("REAL"),
            FieldKind::Boolean => Some("INTEGER"),
            FieldKind::Datetime => Some("DATETIME"),
            FieldKind::Json => Some("TEXT"),
            FieldKind::ForeignKey => Some("TEXT"),
            FieldKind::OneToMany | FieldKind::ManyToMany => None,
        }
    }

    /// Returns `true` for kinds that reference another type.
    pub fn is_relation(self) -> bool {
        matches!(
            self,
            FieldKind::ForeignKey | FieldKind::OneToMany | FieldKind::ManyToMany
        )
    }

    /// Returns the tag used in manifests and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::Boolean => "boolean",
            FieldKind::Datetime => "datetime",
            FieldKind::Json => "json",
            FieldKind::ForeignKey => "foreignKey",
            FieldKind::OneToMany => "oneToMany",
            FieldKind::ManyToMany => "manyToMany",
        }
    }
}

/// Referential action recorded on relation fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Cascade,
    Restrict,
    SetNull,
}

/// Options attached to a field. All are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOptions {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub index: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Name of the referenced type for relation kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<OnDelete>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A single declared field: name, kind, and options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub options: FieldOptions,
}

impl FieldDefinition {
    /// Creates a field with default options.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            options: FieldOptions::default(),
        }
    }

    /// Marks the field `NOT NULL`.
    pub fn required(mut self) -> Self {
        self.options.required = true;
        self
    }

    /// Adds a `UNIQUE` constraint.
    pub fn unique(mut self) -> Self {
        self.options.unique = true;
        self
    }

    /// Requests a secondary index on the column.
    pub fn index(mut self) -> Self {
        self.options.index = true;
        self
    }

    /// Sets the default applied to new instances and rendered as `DEFAULT`.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.options.default = Some(value.into());
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.options.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.options.max = Some(max);
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.options.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.options.max_length = Some(len);
        self
    }

    /// Regular expression the text value must match.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.options.pattern = Some(pattern.into());
        self
    }

    pub fn on_delete(mut self, action: OnDelete) -> Self {
        self.options.on_delete = Some(action);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.options.description = Some(description.into());
        self
    }

    /// Returns the SQL column type, or `None` if the field has no column.
    pub fn column_type(&self) -> Option<&'static str> {
        self.kind.column_type()
    }

    /// Returns `true` if the field is stored in its own column.
    pub fn has_column(&self) -> bool {
        self.kind.column_type().is_some()
    }

    /// Renders the column constraints implied by the options.
    ///
    /// Defaults are rendered as SQL literals; DDL cannot bind parameters.
    pub fn sql_constraints(&self) -> Vec<String> {
        let mut constraints = Vec::new();
        if self.options.required {
            constraints.push("NOT NULL".to_string());
        }
        if self.options.unique {
            constraints.push("UNIQUE".to_string());
        }
        if let Some(default) = &self.options.default {
            constraints.push(format!("DEFAULT {}", sql_literal(default)));
        }
        constraints
    }
}

/// Renders a JSON value as a SQL literal for DDL `DEFAULT` clauses.
fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

pub fn text(name: impl Into<String>) -> FieldDefinition {
    FieldDefinition::new(name, FieldKind::Text)
}

pub fn integer(name: impl Into<String>) -> FieldDefinition {
    FieldDefinition::new(name, FieldKind::Integer)
}

pub fn decimal(name: impl Into<String>) -> FieldDefinition {
    FieldDefinition::new(name, FieldKind::Decimal)
}

pub fn boolean(name: impl Into<String>) -> FieldDefinition {
    FieldDefinition::new(name, FieldKind::Boolean)
}

pub fn datetime(name: impl Into<String>) -> FieldDefinition {
    FieldDefinition::new(name, FieldKind::Datetime)
}

pub fn json(name: impl Into<String>) -> FieldDefinition {
    FieldDefinition::new(name, FieldKind::Json)
}

/// Foreign key column holding the identifier of a `related` object.
pub fn foreign_key(name: impl Into<String>, related: impl Into<String>) -> FieldDefinition {
    let mut field = FieldDefinition::new(name, FieldKind::ForeignKey);
    field.options.related_type = Some(related.into());
    field
}

pub fn one_to_many(name: impl Into<String>, related: impl Into<String>) -> FieldDefinition {
    let mut field = FieldDefinition::new(name, FieldKind::OneToMany);
    field.options.related_type = Some(related.into());
    field
}

pub fn many_to_many(name: impl Into<String>, related: impl Into<String>) -> FieldDefinition {
    let mut field = FieldDefinition::new(name, FieldKind::ManyToMany);
    field.options.related_type = Some(related.into());
    field
}

/// Ordered collection of field definitions keyed by name.
///
/// Declaration order is preserved; it determines column order in generated
/// tables and upsert statements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTable {
    fields: Vec<FieldDefinition>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, replacing an existing field of the same name in place.
    pub fn insert(&mut self, field: FieldDefinition) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    /// Removes and returns the named field.
    pub fn remove(&mut self, name: &str) -> Option<FieldDefinition> {
        let pos = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(pos))
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDefinition> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Fields that are stored in their own column, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.has_column())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<FieldDefinition> for FieldTable {
    fn from_iter<I: IntoIterator<Item = FieldDefinition>>(iter: I) -> Self {
        let mut table = FieldTable::new();
        for field in iter {
            table.insert(field);
        }
        table
    }
}

impl<'a> IntoIterator for &'a FieldTable {
    type Item = &'a FieldDefinition;
    type IntoIter = std::slice::Iter<'a, FieldDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl IntoIterator for FieldTable {
    type Item = FieldDefinition;
    type IntoIter = std::vec::IntoIter<FieldDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_column_types() {
        assert_eq!(FieldKind::Boolean.column_type(), Some("INTEGER"));
        assert_eq!(FieldKind::Json.column_type(), Some("TEXT"));
        assert_eq!(FieldKind::ForeignKey.column_type(), Some("TEXT"));
        assert_eq!(FieldKind::OneToMany.column_type(), None);
        assert_eq!(FieldKind::ManyToMany.column_type(), None);
    }

    #[test]
    fn test_constraints_render_in_fixed_order() {
        let field = text("code").default_value("it's").unique().required();
        assert_eq!(
            field.sql_constraints(),
            vec!["NOT NULL", "UNIQUE", "DEFAULT 'it''s'"]
        );
        assert_eq!(
            boolean("active").default_value(true).sql_constraints(),
            vec!["DEFAULT 1"]
        );
        assert!(decimal("price").sql_constraints().is_empty());
    }

    #[test]
    fn test_relation_helpers_record_related_type() {
        let fk = foreign_key("category", "Category").on_delete(OnDelete::Cascade);
        assert_eq!(fk.options.related_type.as_deref(), Some("Category"));
        assert_eq!(fk.options.on_delete, Some(OnDelete::Cascade));
        assert!(fk.has_column());
        assert!(!one_to_many("items", "Item").has_column());
    }

    #[test]
    fn test_table_insert_replaces_in_place() {
        let mut table: FieldTable = [text("a"), integer("b"), text("c")].into_iter().collect();
        table.insert(decimal("b"));
        assert_eq!(table.names().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(table.get("b").unwrap().kind, FieldKind::Decimal);
    }

    #[test]
    fn test_columns_skip_relations() {
        let table: FieldTable = [text("name"), many_to_many("tags", "Tag")]
            .into_iter()
            .collect();
        assert_eq!(table.columns().count(), 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_serde_shape() {
        let field = text("title").max_length(80).required();
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(
            value,
            json!({"name": "title", "kind": "text", "options": {"required": true, "maxLength": 80}})
        );
        let back: FieldDefinition = serde_json::from_value(value).unwrap();
        assert_eq!(back, field);
    }
}
