//! Serializable snapshots of a type registry.
//!
//! A manifest lists every registered type with its table name, fields, and
//! surface configuration. Downstream generators (REST, MCP, CLI scaffolding)
//! read the manifest instead of linking the application that declared the
//! types. Hooks and factories are code and are not captured.
//!
//! The checksum is the SHA-256 of the canonical JSON of `types`. It lets a
//! consumer detect a manifest that was edited by hand after generation.
//!
//! # Examples
//!
//! ```no_run
//! use smrt_core::{ObjectTypeDescriptor, TypeRegistry, fields::text};
//! use smrt_manifest::Manifest;
//!
//! let registry = TypeRegistry::new();
//! registry
//!     .register(ObjectTypeDescriptor::new("Product", [text("name")].into_iter().collect()))
//!     .unwrap();
//!
//! let manifest = Manifest::from_registry(&registry, "0.1.0").unwrap();
//! manifest.save("smrt-manifest.json").unwrap();
//!
//! let loaded = Manifest::load("smrt-manifest.json").unwrap();
//! loaded.verify_checksum().unwrap();
//! let rebuilt = loaded.into_registry().unwrap();
//! assert!(rebuilt.contains("Product"));
//! ```

use std::collections::BTreeSet;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use smrt_core::{
    FieldTable, ObjectConfig, ObjectTypeDescriptor, TypeRegistry, ValidationError,
    validate_descriptor,
};

use crate::error::{ManifestError, Result};

/// Manifest format version written by this crate.
pub const MANIFEST_SCHEMA_VERSION: &str = "1.0";

/// One registered type as recorded in a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeManifest {
    pub name: String,
    pub table_name: String,
    #[serde(default)]
    pub fields: FieldTable,
    #[serde(default)]
    pub config: ObjectConfig,
}

impl TypeManifest {
    pub fn from_descriptor(descriptor: &ObjectTypeDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            table_name: descriptor.table_name.clone(),
            fields: descriptor.fields.clone(),
            config: descriptor.config.clone(),
        }
    }

    /// Rebuilds a descriptor without a factory.
    pub fn to_descriptor(&self) -> ObjectTypeDescriptor {
        ObjectTypeDescriptor::new(self.name.clone(), self.fields.clone())
            .with_table_name(self.table_name.clone())
            .with_config(self.config.clone())
    }
}

/// Type names that differ between two manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    /// Present only in the newer manifest.
    pub added: Vec<String>,
    /// Present only in the older manifest.
    pub removed: Vec<String>,
    /// Present in both with different table, fields, or config.
    pub changed: Vec<String>,
}

impl ManifestDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Top-level registry snapshot.
///
/// Persisted as pretty-printed JSON; [`to_yaml`](Self::to_yaml) renders the
/// same structure for human review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest format version (see [`MANIFEST_SCHEMA_VERSION`]).
    pub schema_version: String,
    /// Version of the application that produced the manifest.
    pub version: String,
    /// RFC 3339 timestamp of generation.
    pub generated_at: String,
    /// Types ordered by name.
    pub types: Vec<TypeManifest>,
    /// SHA-256 hex digest of `types`.
    pub checksum: String,
}

impl Manifest {
    /// Creates an empty manifest with a matching checksum.
    pub fn new(version: impl Into<String>) -> Result<Self> {
        let mut manifest = Self {
            schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
            version: version.into(),
            generated_at: now_rfc3339(),
            types: Vec::new(),
            checksum: String::new(),
        };
        manifest.refresh_checksum()?;
        Ok(manifest)
    }

    /// Snapshots every type in `registry`.
    pub fn from_registry(registry: &TypeRegistry, version: impl Into<String>) -> Result<Self> {
        let mut manifest = Self::new(version)?;
        manifest.types = registry
            .get_all()
            .iter()
            .map(|d| TypeManifest::from_descriptor(d))
            .collect();
        manifest.refresh_checksum()?;
        tracing::debug!(types = manifest.types.len(), "manifest generated");
        Ok(manifest)
    }

    /// Loads a manifest from a JSON file. The checksum is not verified.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ManifestError::IoError) if the file cannot be
    /// read, or [`JsonError`](ManifestError::JsonError) if the content is not
    /// valid manifest JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let manifest = serde_json::from_reader(reader)?;
        Ok(manifest)
    }

    /// Saves the manifest as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// SHA-256 hex digest of the canonical JSON of `types`.
    pub fn compute_checksum(&self) -> Result<String> {
        let canonical = serde_json::to_vec(&self.types)?;
        Ok(format!("{:x}", Sha256::digest(&canonical)))
    }

    /// Recomputes `checksum` after `types` was edited.
    pub fn refresh_checksum(&mut self) -> Result<()> {
        self.checksum = self.compute_checksum()?;
        Ok(())
    }

    /// # Errors
    ///
    /// [`InvalidChecksum`](ManifestError::InvalidChecksum) if `types` no
    /// longer matches the recorded checksum.
    pub fn verify_checksum(&self) -> Result<()> {
        let actual = self.compute_checksum()?;
        if actual != self.checksum {
            return Err(ManifestError::InvalidChecksum {
                expected: self.checksum.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Descriptor problems per type name, in manifest order.
    ///
    /// A relation naming a type that is not in the manifest is reported as
    /// [`ValidationError::UnknownRelatedType`].
    pub fn validate(&self) -> Vec<(String, ValidationError)> {
        let names: BTreeSet<&str> = self.types.iter().map(|t| t.name.as_str()).collect();
        let mut problems = Vec::new();
        for entry in &self.types {
            for error in validate_descriptor(&entry.to_descriptor()) {
                problems.push((entry.name.clone(), error));
            }
            for field in entry.fields.iter() {
                if let Some(related) = field.options.related_type.as_deref()
                    && !names.contains(related)
                {
                    problems.push((
                        entry.name.clone(),
                        ValidationError::UnknownRelatedType {
                            field: field.name.clone(),
                            related: related.to_string(),
                        },
                    ));
                }
            }
        }
        problems
    }

    /// Returns the type names that differ between `self` (older) and
    /// `other` (newer).
    ///
    /// # Examples
    ///
    /// ```
    /// use smrt_core::fields::{integer, text};
    /// use smrt_manifest::{Manifest, TypeManifest};
    ///
    /// let entry = |name: &str| TypeManifest {
    ///     name: name.into(),
    ///     table_name: format!("{}s", name.to_lowercase()),
    ///     fields: [text("name")].into_iter().collect(),
    ///     config: Default::default(),
    /// };
    ///
    /// let mut old = Manifest::new("1").unwrap();
    /// old.types = vec![entry("Order"), entry("User")];
    ///
    /// let mut new = Manifest::new("2").unwrap();
    /// let mut order = entry("Order");
    /// order.fields.insert(integer("total"));
    /// new.types = vec![order, entry("Product")];
    ///
    /// let diff = old.diff(&new);
    /// assert_eq!(diff.added, ["Product"]);
    /// assert_eq!(diff.removed, ["User"]);
    /// assert_eq!(diff.changed, ["Order"]);
    /// ```
    pub fn diff(&self, other: &Manifest) -> ManifestDiff {
        let mut diff = ManifestDiff::default();
        for entry in &self.types {
            match other.get(&entry.name) {
                None => diff.removed.push(entry.name.clone()),
                Some(newer) if newer != entry => diff.changed.push(entry.name.clone()),
                Some(_) => {}
            }
        }
        for entry in &other.types {
            if !self.contains(&entry.name) {
                diff.added.push(entry.name.clone());
            }
        }
        diff
    }

    pub fn get(&self, name: &str) -> Option<&TypeManifest> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registers every type in a fresh registry.
    ///
    /// Descriptors come back without factories: enough for schema generation
    /// and surface configuration, not for building typed objects.
    ///
    /// # Errors
    ///
    /// [`InvalidManifest`](ManifestError::InvalidManifest) if a type name
    /// appears twice, [`Registry`](ManifestError::Registry) if a name or
    /// table name is rejected.
    pub fn into_registry(self) -> Result<TypeRegistry> {
        let registry = TypeRegistry::new();
        for entry in self.types {
            if !registry.register(entry.to_descriptor())? {
                return Err(ManifestError::InvalidManifest(format!(
                    "type '{}' is listed more than once",
                    entry.name
                )));
            }
        }
        Ok(registry)
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
