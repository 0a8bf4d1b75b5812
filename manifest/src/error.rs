//! Error types for manifest and configuration handling.

use smrt_core::RegistryError;
use thiserror::Error;

/// Errors raised while reading, writing, or checking manifests and config.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Structural problem, such as the same type listed twice.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Recorded checksum does not match the manifest contents.
    #[error("invalid checksum: expected {expected}, computed {actual}")]
    InvalidChecksum { expected: String, actual: String },

    /// Rebuilding a registry from the manifest failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Convenience alias for results with [`ManifestError`].
pub type Result<T> = std::result::Result<T, ManifestError>;
