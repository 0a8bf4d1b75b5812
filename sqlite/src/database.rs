//! The database collaborator used by the runtime, and its SQLite adapter.
//!
//! [`Database`] is the narrow contract the synchronizer, objects, and
//! collections are written against. Rows are ordered JSON maps; parameters are
//! JSON values bound positionally, so `$N` and `?N` placeholders both work as
//! long as they appear in ascending order.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, params_from_iter};
use serde_json::Value;
use smrt_core::{Record, validate_identifier};

use crate::convert::{row_to_record, to_sql};
use crate::error::Result;

/// Operations the runtime needs from a relational database.
///
/// Only [`query`](Self::query) and [`execute`](Self::execute) are required;
/// the other helpers are built on them.
pub trait Database: Send + Sync {
    /// Runs a statement and returns every row.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>>;

    /// Runs a statement and returns the number of rows changed.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize>;

    /// First column of the first row, if any.
    fn pluck(&self, sql: &str, params: &[Value]) -> Result<Option<Value>> {
        Ok(self
            .single(sql, params)?
            .and_then(|row| row.into_iter().next().map(|(_, v)| v)))
    }

    /// First row, if any.
    fn single(&self, sql: &str, params: &[Value]) -> Result<Option<Record>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Inserts `record` into `table`, returning the number of rows inserted.
    fn insert(&self, table: &str, record: &Record) -> Result<usize> {
        let table = validate_identifier(table)?;
        let mut columns = Vec::with_capacity(record.len());
        for key in record.keys() {
            columns.push(validate_identifier(key)?);
        }
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        let values: Vec<Value> = record.values().cloned().collect();
        self.execute(&sql, &values)
    }

    /// Sets `values` on rows of `table` whose columns equal `filter`.
    fn update(&self, table: &str, values: &Record, filter: &Record) -> Result<usize> {
        let table = validate_identifier(table)?;
        let mut params = Vec::with_capacity(values.len() + filter.len());
        let mut assignments = Vec::with_capacity(values.len());
        for (key, value) in values {
            params.push(value.clone());
            assignments.push(format!("{} = ?{}", validate_identifier(key)?, params.len()));
        }
        let mut conditions = Vec::with_capacity(filter.len());
        for (key, value) in filter {
            params.push(value.clone());
            conditions.push(format!("{} = ?{}", validate_identifier(key)?, params.len()));
        }
        let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        self.execute(&sql, &params)
    }

    /// Returns `true` if a table named `table` exists.
    fn table_exists(&self, table: &str) -> Result<bool> {
        let count = self.pluck(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            &[Value::from(table)],
        )?;
        Ok(count.and_then(|v| v.as_i64()).unwrap_or(0) > 0)
    }
}

/// [`Database`] backed by a single rusqlite connection.
///
/// Access to the connection is serialized through a mutex.
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wraps an open connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "opening sqlite database");
        Ok(Self::new(Connection::open(path)?))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Turns foreign-key enforcement on or off.
    pub fn set_foreign_keys(&self, enabled: bool) -> Result<()> {
        let pragma = if enabled {
            "PRAGMA foreign_keys = ON;"
        } else {
            "PRAGMA foreign_keys = OFF;"
        };
        self.lock().execute_batch(pragma)?;
        Ok(())
    }

    /// Runs `f` with exclusive access to the underlying connection.
    pub fn with_connection<R>(&self, f: impl FnOnce(&Connection) -> R) -> R {
        f(&self.lock())
    }

    /// Consumes the adapter and returns the connection.
    pub fn into_connection(self) -> Connection {
        self.conn.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Database for SqliteDatabase {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        tracing::debug!(sql, params = params.len(), "query");
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt.query_map(params_from_iter(params.iter().map(to_sql)), |row| {
            row_to_record(row, &columns)
        })?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        tracing::debug!(sql, params = params.len(), "execute");
        let conn = self.lock();
        Ok(conn.execute(sql, params_from_iter(params.iter().map(to_sql)))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn db() -> SqliteDatabase {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.execute("CREATE TABLE items (id TEXT PRIMARY KEY, qty INTEGER, flag INTEGER)", &[])
            .unwrap();
        db
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_insert_query_and_pluck() {
        let db = db();
        db.insert("items", &record(json!({"id": "a", "qty": 3, "flag": true})))
            .unwrap();
        let rows = db.query("SELECT * FROM items WHERE qty > $1", &[json!(1)]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["flag"], json!(1));
        assert_eq!(
            db.pluck("SELECT qty FROM items WHERE id = ?1", &[json!("a")]).unwrap(),
            Some(json!(3))
        );
        assert!(db.single("SELECT * FROM items WHERE id = 'zz'", &[]).unwrap().is_none());
    }

    #[test]
    fn test_update_with_filter() {
        let db = db();
        db.insert("items", &record(json!({"id": "a", "qty": 1}))).unwrap();
        db.insert("items", &record(json!({"id": "b", "qty": 1}))).unwrap();
        let changed = db
            .update("items", &record(json!({"qty": 9})), &record(json!({"id": "b"})))
            .unwrap();
        assert_eq!(changed, 1);
        let qty = db.pluck("SELECT qty FROM items WHERE id = 'b'", &[]).unwrap();
        assert_eq!(qty, Some(json!(9)));
    }

    #[test]
    fn test_table_exists() {
        let db = db();
        assert!(db.table_exists("items").unwrap());
        assert!(!db.table_exists("ghosts").unwrap());
    }

    #[test]
    fn test_helpers_reject_bad_identifiers() {
        let db = db();
        assert!(db.insert("items; --", &record(json!({"id": "x"}))).is_err());
        assert!(db.insert("items", &record(json!({"id) --": "x"}))).is_err());
    }

    #[test]
    fn test_row_column_order_is_preserved() {
        let db = db();
        db.insert("items", &record(json!({"id": "a", "qty": 2, "flag": 0}))).unwrap();
        let row = db.single("SELECT flag, id, qty FROM items", &[]).unwrap().unwrap();
        assert_eq!(row.keys().collect::<Vec<_>>(), ["flag", "id", "qty"]);
    }
}
