//! Error types for metadata, registry, and predicate operations.

use thiserror::Error;

/// Errors raised while building or reading type metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A table, column, or field name contains characters outside `[A-Za-z0-9_]`.
    #[error("invalid identifier '{0}': must contain only alphanumeric characters and underscores")]
    InvalidIdentifier(String),

    /// The object factory rejected the supplied options.
    #[error("factory for '{type_name}' rejected options: {message}")]
    Factory {
        /// Registered type name.
        type_name: String,
        /// Reason reported by the factory.
        message: String,
    },

    /// An unknown CRUD verb was named in configuration.
    #[error("unknown verb: {0}")]
    UnknownVerb(String),
}

/// Errors raised by [`TypeRegistry`](crate::TypeRegistry) mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Registration was attempted after [`TypeRegistry::freeze`](crate::TypeRegistry::freeze).
    #[error("registry is frozen; cannot register '{0}'")]
    Frozen(String),

    /// The descriptor name is empty or not a valid identifier.
    #[error("invalid type name '{0}'")]
    InvalidTypeName(String),
}

/// Convenience alias for results with [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
