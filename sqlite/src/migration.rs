//! Additive schema synchronization.
//!
//! [`synchronize`] reconciles definition text (as produced by
//! [`generate_schema_sql`](crate::generate_schema_sql)) with a live database:
//! missing tables are created, missing columns are added, and timestamp
//! triggers are installed. Nothing is ever dropped or retyped, so running it
//! any number of times converges on the same schema.
//!
//! # Example
//!
//! ```
//! use smrt_sqlite::{SqliteDatabase, synchronize};
//!
//! let db = SqliteDatabase::open_in_memory().unwrap();
//! let sql = "CREATE TABLE IF NOT EXISTS notes (\n  id TEXT PRIMARY KEY,\n  slug TEXT UNIQUE,\n  body TEXT,\n  created_at DATETIME,\n  updated_at DATETIME\n);";
//!
//! let first = synchronize(&db, sql).unwrap();
//! assert_eq!(first.tables_created, vec!["notes"]);
//!
//! let second = synchronize(&db, sql).unwrap();
//! assert!(second.is_empty());
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use smrt_core::validate_identifier;

use crate::database::Database;
use crate::error::{Result, SmrtError};

static CREATE_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(\S+)\s*\((.*)\)\s*$")
        .expect("static regex must compile")
});

static UNIQUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+UNIQUE\b").expect("static regex must compile"));

static NOT_NULL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+NOT\s+NULL\b").expect("static regex must compile"));

static DEFAULT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bDEFAULT\b").expect("static regex must compile"));

pub(crate) const TIMESTAMP_NOW: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

/// The stamp that follows `previous`: the current time, or one millisecond
/// past `previous` when the clock has not moved on. Falls back to the current
/// time when `previous` is `NULL`.
pub(crate) fn next_timestamp(previous: &str) -> String {
    format!(
        "COALESCE(MAX({TIMESTAMP_NOW}, strftime('%Y-%m-%d %H:%M:%f', {previous}, '+0.001 seconds')), {TIMESTAMP_NOW})"
    )
}

/// Leading keywords of table-constraint lines, which are not columns.
const CONSTRAINT_PREFIXES: [&str; 5] = ["PRIMARY", "FOREIGN", "UNIQUE", "CHECK", "CONSTRAINT"];

/// What a synchronization run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Tables that did not exist and were created.
    pub tables_created: Vec<String>,
    /// `table.column` entries added to existing tables.
    pub columns_added: Vec<String>,
    /// Names of triggers installed.
    pub triggers_installed: Vec<String>,
}

impl SyncReport {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.tables_created.is_empty()
            && self.columns_added.is_empty()
            && self.triggers_installed.is_empty()
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: SyncReport) {
        self.tables_created.extend(other.tables_created);
        self.columns_added.extend(other.columns_added);
        self.triggers_installed.extend(other.triggers_installed);
    }
}

/// Synchronizes `definition` against `db`.
///
/// Statements are split on `;` outside quoted literals. Create-table statements create the table when
/// absent, or add each declared column the table lacks. Any other statement is
/// executed as-is and should be written to be re-runnable (`IF NOT EXISTS`).
/// Every table mentioned gets its timestamp triggers.
///
/// # Errors
///
/// Fails on an invalid table name, a malformed create statement, or any
/// database error. Statements already applied stay applied.
pub fn synchronize(db: &dyn Database, definition: &str) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    let mut tables = Vec::new();

    for statement in split_outside_quotes(definition, ';') {
        let statement = statement.as_str();
        if statement.is_empty() {
            continue;
        }

        if !starts_with_create_table(statement) {
            db.execute(statement, &[])?;
            continue;
        }

        let captures = CREATE_TABLE_RE
            .captures(statement)
            .ok_or_else(|| SmrtError::Sync(format!("malformed create statement: {statement}")))?;
        let table = validate_identifier(&captures[1])?.to_string();
        let body = &captures[2];

        if db.table_exists(&table)? {
            report
                .columns_added
                .extend(add_missing_columns(db, &table, body)?);
        } else {
            db.execute(statement, &[])?;
            tracing::info!(table = %table, "created table");
            report.tables_created.push(table.clone());
        }
        tables.push(table);
    }

    for table in &tables {
        report
            .triggers_installed
            .extend(install_timestamp_triggers(db, table)?);
    }

    Ok(report)
}

fn starts_with_create_table(statement: &str) -> bool {
    let mut words = statement.split_whitespace();
    matches!(
        (words.next(), words.next()),
        (Some(a), Some(b)) if a.eq_ignore_ascii_case("CREATE") && b.eq_ignore_ascii_case("TABLE")
    )
}

/// Adds columns declared in `body` that `table` lacks. Returns `table.column`
/// for each column added.
fn add_missing_columns(db: &dyn Database, table: &str, body: &str) -> Result<Vec<String>> {
    let existing: Vec<String> = db
        .query(
            "SELECT name FROM pragma_table_info(?1)",
            &[Value::from(table)],
        )?
        .into_iter()
        .filter_map(|row| row.get("name").and_then(Value::as_str).map(str::to_lowercase))
        .collect();

    let mut added = Vec::new();
    for definition in split_outside_quotes(body, ',') {
        let Some(first) = definition.split_whitespace().next() else {
            continue;
        };
        if CONSTRAINT_PREFIXES
            .iter()
            .any(|p| first.eq_ignore_ascii_case(p))
        {
            continue;
        }
        let column = validate_identifier(first.trim_matches(['"', '`', '[', ']']))?;
        if existing.iter().any(|c| c.eq_ignore_ascii_case(column)) {
            continue;
        }

        let (definition, unique) = additive_definition(table, &definition);
        db.execute(&format!("ALTER TABLE {table} ADD COLUMN {definition}"), &[])?;
        if unique {
            db.execute(
                &format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_{column}_unique ON {table} ({column})"
                ),
                &[],
            )?;
        }
        tracing::info!(table, column, "added column");
        added.push(format!("{table}.{column}"));
    }
    Ok(added)
}

/// SQLite refuses `ADD COLUMN` with `UNIQUE`, or with `NOT NULL` and no
/// default. Uniqueness moves to an index; the bare `NOT NULL` is dropped.
/// Quoted literals are never edited.
fn additive_definition(table: &str, definition: &str) -> (String, bool) {
    let mut definition = definition.to_string();
    let unique = UNIQUE_RE.is_match(&unquoted(&definition));
    if unique {
        definition = replace_unquoted(&definition, &UNIQUE_RE);
    }
    let bare = unquoted(&definition);
    if NOT_NULL_RE.is_match(&bare) && !DEFAULT_RE.is_match(&bare) {
        tracing::warn!(
            table,
            definition = %definition,
            "dropping NOT NULL from added column without a default"
        );
        definition = replace_unquoted(&definition, &NOT_NULL_RE);
    }
    (definition, unique)
}

/// Splits `text` on `separator` where it appears outside parentheses and
/// quoted literals. Parts are trimmed; empty parts are dropped.
fn split_outside_quotes(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in text.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == separator && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current.trim().to_string());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Splits `sql` into alternating stretches, flagged `true` when quoted.
/// Doubled quotes inside a literal close and reopen it, which keeps the
/// literal in one piece once the stretches are rejoined.
fn quote_segments(sql: &str) -> Vec<(bool, &str)> {
    let mut segments = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in sql.char_indices() {
        match quote {
            Some(q) if c == q => {
                let end = i + c.len_utf8();
                segments.push((true, &sql[start..end]));
                start = end;
                quote = None;
            }
            Some(_) => {}
            None if matches!(c, '\'' | '"' | '`') => {
                if start < i {
                    segments.push((false, &sql[start..i]));
                }
                start = i;
                quote = Some(c);
            }
            None => {}
        }
    }
    if start < sql.len() {
        segments.push((quote.is_some(), &sql[start..]));
    }
    segments
}

/// `sql` with every quoted literal replaced by a single space.
fn unquoted(sql: &str) -> String {
    quote_segments(sql)
        .into_iter()
        .map(|(quoted, text)| if quoted { " " } else { text })
        .collect()
}

/// Removes matches of `re` from the unquoted stretches of `sql`.
fn replace_unquoted(sql: &str, re: &Regex) -> String {
    quote_segments(sql)
        .into_iter()
        .map(|(quoted, text)| {
            if quoted {
                text.to_string()
            } else {
                re.replace_all(text, "").into_owned()
            }
        })
        .collect()
}

/// Installs the `created_at` / `updated_at` triggers on `table` unless they
/// already exist. Returns the names of the triggers installed.
fn install_timestamp_triggers(db: &dyn Database, table: &str) -> Result<Vec<String>> {
    let table = validate_identifier(table)?;
    let created = format!("{table}_set_created_at");
    let updated = format!("{table}_set_updated_at");
    let next = next_timestamp("OLD.updated_at");

    let definitions = [
        (
            created,
            format!(
                "CREATE TRIGGER {table}_set_created_at AFTER INSERT ON {table}\n\
                 BEGIN\n  \
                 UPDATE {table} SET created_at = COALESCE(NEW.created_at, {TIMESTAMP_NOW}), \
                 updated_at = COALESCE(NEW.updated_at, {TIMESTAMP_NOW}) \
                 WHERE id = NEW.id AND (NEW.created_at IS NULL OR NEW.updated_at IS NULL);\n\
                 END"
            ),
        ),
        (
            updated,
            format!(
                "CREATE TRIGGER {table}_set_updated_at AFTER UPDATE ON {table}\n\
                 WHEN NEW.updated_at IS OLD.updated_at\n\
                 BEGIN\n  \
                 UPDATE {table} SET updated_at = {next} WHERE id = NEW.id;\n\
                 END"
            ),
        ),
    ];

    let mut installed = Vec::new();
    for (name, sql) in definitions {
        if trigger_exists(db, &name)? {
            continue;
        }
        db.execute(&sql, &[])?;
        tracing::info!(table, trigger = %name, "installed trigger");
        installed.push(name);
    }
    Ok(installed)
}

fn trigger_exists(db: &dyn Database, name: &str) -> Result<bool> {
    let count = db.pluck(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger' AND name = ?1",
        &[Value::from(name)],
    )?;
    Ok(count.and_then(|v| v.as_i64()).unwrap_or(0) > 0)
}
