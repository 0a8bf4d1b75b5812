//! SQLite runtime for SMRT persistent objects.
//!
//! This crate turns the metadata from `smrt-core` into a working store:
//!
//! - **`schema`**: renders a descriptor into `CREATE TABLE` / `CREATE INDEX`
//!   definition text
//! - **`migration`**: additive synchronization of definition text against a
//!   live database, plus the timestamp triggers
//! - **`upsert`**: the guarded insert-or-replace that keeps `id` and `slug`
//!   from colliding
//! - **`object`**: [`Object<T>`]: load, save, delete, hooks
//! - **`collection`**: [`Collection<T>`]: get, list, count, create,
//!   get-or-upsert, and the type-erased [`DynCollection`]
//!
//! Everything talks to the database through the [`Database`] trait;
//! [`SqliteDatabase`] is the rusqlite adapter.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//! use smrt_core::{FieldTable, SmrtObject, TypeRegistry, fields::{decimal, text}};
//! use smrt_sqlite::{ListOptions, SqliteDatabase, register_collection};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Product {
//!     name: String,
//!     price: f64,
//! }
//!
//! impl SmrtObject for Product {
//!     const TYPE_NAME: &'static str = "Product";
//!
//!     fn fields() -> FieldTable {
//!         [text("name").required(), decimal("price").min(0.0)].into_iter().collect()
//!     }
//! }
//!
//! let registry = TypeRegistry::new();
//! let db = Arc::new(SqliteDatabase::open_in_memory().unwrap());
//! let products = register_collection::<Product>(&registry, db).unwrap();
//! registry.freeze();
//!
//! let data = json!({"name": "Blue Widget", "price": 9.5});
//! let widget = products
//!     .get_or_upsert(data.as_object().cloned().unwrap(), Default::default())
//!     .unwrap();
//! assert_eq!(widget.slug.as_deref(), Some("blue-widget"));
//!
//! let cheap = products
//!     .list(&ListOptions::new().filter(json!({"price <": 10}).as_object().cloned().unwrap()))
//!     .unwrap();
//! assert_eq!(cheap.len(), 1);
//! ```

mod collection;
mod convert;
mod database;
mod error;
mod migration;
mod object;
mod schema;
mod upsert;

pub use collection::{
    Collection, DynCollection, ListOptions, Lookup, open_collection, register_collection,
};
pub use database::{Database, SqliteDatabase};
pub use error::{Result, SmrtError};
pub use migration::{SyncReport, synchronize};
pub use object::Object;
pub use schema::{generate_index_sql, generate_schema_sql, generate_table_sql};
pub use upsert::{UpsertStatement, build_upsert, derive_slug, find_identifier, resolve_identifier};
