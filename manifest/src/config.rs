//! Runtime configuration for tools built on SMRT.
//!
//! Every section and every key is optional; missing values take the defaults
//! shown below.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! database:
//!   path: data.db
//!   foreign_keys: true
//! registry:
//!   freeze_after_load: true
//! logging:
//!   level: info
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Path used for in-process databases.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Where and how to open the SQLite database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// File path, or `":memory:"`.
    pub path: String,
    /// Enforce `FOREIGN KEY` constraints.
    pub foreign_keys: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "smrt.db".to_string(),
            foreign_keys: true,
        }
    }
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_PATH
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Freeze the registry once the manifest is loaded.
    pub freeze_after_load: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            freeze_after_load: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `smrt_sqlite=debug`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Top-level runtime configuration.
///
/// # Examples
///
/// ```
/// use smrt_manifest::RuntimeConfig;
///
/// let config: RuntimeConfig = serde_yaml::from_str("database:\n  path: ':memory:'\n").unwrap();
/// assert!(config.database.is_in_memory());
/// assert!(config.database.foreign_keys);
/// assert_eq!(config.logging.level, "info");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    pub database: DatabaseConfig,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database: DatabaseConfig::default(),
            registry: RegistryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ManifestError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::ManifestError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}
