//! Metadata layer for SMRT persistent objects.
//!
//! This crate knows nothing about a live database. It provides:
//!
//! - [`fields`]: field definitions ([`FieldDefinition`], [`FieldTable`]) and
//!   builder helpers (`text`, `decimal`, `foreign_key`, ...).
//! - [`SmrtObject`]: the trait a Rust type implements to become persistent,
//!   and [`ObjectTypeDescriptor`], the metadata the registry stores for it.
//! - [`TypeRegistry`]: the name-to-descriptor store read by the runtime and
//!   by downstream REST/CLI/MCP generators. It has an explicit freeze phase.
//! - [`ObjectConfig`]: per-surface verb filters and lifecycle [`Hooks`].
//! - [`compile`]: turns a flat filter object into a parameterized `WHERE`
//!   fragment ([`QueryPredicate`]).
//! - Naming helpers ([`table_name`], [`slugify`], [`validate_identifier`]).
//!
//! # Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use smrt_core::fields::{decimal, text};
//! use smrt_core::*;
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
//!         [text("name").required(), decimal("price")].into_iter().collect()
//!     }
//! }
//!
//! let registry = TypeRegistry::new();
//! registry.register_type::<Product>().unwrap();
//! registry.freeze();
//!
//! assert_eq!(registry.get("Product").unwrap().table_name, "products");
//! assert_eq!(registry.get_fields("Product").len(), 2);
//! assert!(registry.get_config("Product").api_allows(Verb::Delete));
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod fields;
pub mod naming;
pub mod predicate;
pub mod registry;
mod validate;

pub use config::{
    ApiConfig, CliConfig, HookEvent, HookFn, Hooks, McpConfig, ObjectConfig, Record, Verb,
    VerbFilter,
};
pub use descriptor::{ObjectFactory, ObjectTypeDescriptor, SmrtObject, apply_defaults, extract_fields};
pub use error::{CoreError, RegistryError, Result};
pub use fields::{FieldDefinition, FieldKind, FieldOptions, FieldTable, OnDelete, RESERVED_COLUMNS};
pub use naming::{is_uuid, is_valid_identifier, slugify, table_name, validate_column_ref, validate_identifier};
pub use predicate::{Operator, QueryPredicate, compile, compile_from};
pub use registry::{CollectionRef, TypeRegistry};
pub use validate::{ValidationError, validate_descriptor, validate_record};
