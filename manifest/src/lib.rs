//! Registry manifests and runtime configuration for SMRT.
//!
//! A [`Manifest`] is a checksummed JSON snapshot of a [`TypeRegistry`]
//! that code generators and the `smrt` CLI consume without linking the
//! application. [`RuntimeConfig`] is the YAML file the CLI reads for database,
//! registry, and logging settings.
//!
//! # Quick start
//!
//! ```no_run
//! use smrt_manifest::{Manifest, RuntimeConfig};
//!
//! let config = RuntimeConfig::load("smrt.yml").unwrap();
//! println!("database at {}", config.database.path);
//!
//! let manifest = Manifest::load("smrt-manifest.json").unwrap();
//! manifest.verify_checksum().unwrap();
//! for entry in &manifest.types {
//!     println!("{} -> {}", entry.name, entry.table_name);
//! }
//! ```
//!
//! [`TypeRegistry`]: smrt_core::TypeRegistry

mod config;
mod error;
mod manifest;

pub use config::{DatabaseConfig, IN_MEMORY_PATH, LoggingConfig, RegistryConfig, RuntimeConfig};
pub use error::{ManifestError, Result};
pub use manifest::{MANIFEST_SCHEMA_VERSION, Manifest, ManifestDiff, TypeManifest};
