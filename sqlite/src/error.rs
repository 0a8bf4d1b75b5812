//! Error types for the SQLite runtime.
//!
//! One enum covers database access, metadata problems surfaced from
//! `smrt-core`, schema synchronization, and object lifecycle failures.

use smrt_core::{CoreError, HookEvent, RegistryError, ValidationError};
use thiserror::Error;

/// Errors raised by collections, objects, and the schema synchronizer.
#[derive(Debug, Error)]
pub enum SmrtError {
    /// SQLite operation failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A record could not be converted to or from its typed form.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid identifier, factory rejection, or other metadata error.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// No descriptor is registered under this name.
    #[error("unknown object type: {0}")]
    UnknownType(String),

    /// The descriptor has no factory to hydrate rows with.
    #[error("object type '{0}' has no factory")]
    MissingFactory(String),

    /// An `order_by` entry is not `field [ASC|DESC]`.
    #[error("invalid order_by entry '{0}': expected 'field [ASC|DESC]'")]
    InvalidOrderBy(String),

    /// The upsert guard rejected a write whose id and slug belong to
    /// different existing rows.
    #[error("key conflict: id '{id}' and slug '{slug}' match different rows")]
    KeyConflict {
        id: String,
        slug: String,
    },

    /// A lifecycle hook aborted the operation.
    #[error("{event} hook failed: {message}")]
    Hook {
        event: HookEvent,
        message: String,
    },

    /// The record failed field validation.
    #[error("{type_name} failed validation: {}", join_errors(.errors))]
    Validation {
        type_name: String,
        errors: Vec<ValidationError>,
    },

    /// The operation needs a persisted object.
    #[error("{0} has not been saved")]
    NotSaved(String),

    /// Schema definition text could not be reconciled.
    #[error("schema sync error: {0}")]
    Sync(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias for results with [`SmrtError`].
pub type Result<T> = std::result::Result<T, SmrtError>;
