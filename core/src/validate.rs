//! Descriptor and record validation.
//!
//! [`validate_descriptor`] catches structural problems in type metadata
//! (bad names, relations without a target, contradictory options) before a
//! schema is generated. [`validate_record`] checks a record against the field
//! options before it is written.
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use smrt_core::fields::{decimal, text};
//! use smrt_core::*;
//!
//! let descriptor = ObjectTypeDescriptor::new(
//!     "Product",
//!     [text("name").required(), decimal("price").min(0.0)].into_iter().collect(),
//! );
//! assert!(validate_descriptor(&descriptor).is_empty());
//!
//! let record = json!({"name": "Gear", "price": -1.0});
//! let errors = validate_record(&descriptor.fields, record.as_object().unwrap());
//! assert!(matches!(errors[0], ValidationError::BelowMinimum { .. }));
//! ```

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::config::Record;
use crate::descriptor::ObjectTypeDescriptor;
use crate::fields::{FieldDefinition, FieldKind, FieldTable};
use crate::naming;

/// Descriptor and record validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Type name is empty or not an identifier.
    #[error("invalid type name: {0}")]
    InvalidTypeName(String),
    /// Table name is empty or not an identifier.
    #[error("invalid table name: {0}")]
    InvalidTableName(String),
    /// Field name is empty or not an identifier.
    #[error("invalid field name: {0}")]
    InvalidFieldName(String),
    /// Field shadows one of the identity columns.
    #[error("field '{0}' shadows a reserved column")]
    ReservedField(String),
    /// Two fields share a name.
    #[error("duplicate field: {0}")]
    DuplicateField(String),
    /// Relation field without a related type.
    #[error("relation field '{0}' has no related type")]
    MissingRelatedType(String),
    /// Relation field naming a type that is not registered.
    #[error("field '{field}' refers to unknown type '{related}'")]
    UnknownRelatedType { field: String, related: String },
    /// `min` is greater than `max`, or `min_length` greater than `max_length`.
    #[error("field '{0}' has an empty range")]
    EmptyRange(String),
    /// `pattern` is not a valid regular expression.
    #[error("field '{field}' has an invalid pattern: {message}")]
    InvalidPattern { field: String, message: String },
    /// A required field is absent or null.
    #[error("field '{0}' is required")]
    MissingRequired(String),
    /// The value does not fit the field kind.
    #[error("field '{field}' expects {expected}")]
    TypeMismatch { field: String, expected: &'static str },
    #[error("field '{field}' is below the minimum {min}")]
    BelowMinimum { field: String, min: f64 },
    #[error("field '{field}' is above the maximum {max}")]
    AboveMaximum { field: String, max: f64 },
    #[error("field '{field}' is shorter than {min_length} characters")]
    TooShort { field: String, min_length: usize },
    #[error("field '{field}' is longer than {max_length} characters")]
    TooLong { field: String, max_length: usize },
    #[error("field '{field}' does not match pattern {pattern}")]
    PatternMismatch { field: String, pattern: String },
}

/// Validates descriptor metadata.
///
/// Returns every problem found; an empty vector means the descriptor can be
/// rendered into a schema.
pub fn validate_descriptor(descriptor: &ObjectTypeDescriptor) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !naming::is_valid_identifier(&descriptor.name) {
        errors.push(ValidationError::InvalidTypeName(descriptor.name.clone()));
    }
    if !naming::is_valid_identifier(&descriptor.table_name) {
        errors.push(ValidationError::InvalidTableName(
            descriptor.table_name.clone(),
        ));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for field in &descriptor.fields {
        if !seen.insert(field.name.as_str()) {
            errors.push(ValidationError::DuplicateField(field.name.clone()));
        }
        errors.extend(validate_field(field));
    }

    errors
}

fn validate_field(field: &FieldDefinition) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let name = &field.name;
    let options = &field.options;

    if !naming::is_valid_identifier(name) {
        errors.push(ValidationError::InvalidFieldName(name.clone()));
        return errors;
    }
    if crate::fields::RESERVED_COLUMNS.contains(&name.as_str()) {
        errors.push(ValidationError::ReservedField(name.clone()));
    }
    if field.kind.is_relation() && options.related_type.is_none() {
        errors.push(ValidationError::MissingRelatedType(name.clone()));
    }
    if let (Some(min), Some(max)) = (options.min, options.max)
        && min > max
    {
        errors.push(ValidationError::EmptyRange(name.clone()));
    }
    if let (Some(min), Some(max)) = (options.min_length, options.max_length)
        && min > max
    {
        errors.push(ValidationError::EmptyRange(name.clone()));
    }
    if let Some(pattern) = &options.pattern
        && let Err(e) = Regex::new(pattern)
    {
        errors.push(ValidationError::InvalidPattern {
            field: name.clone(),
            message: e.to_string(),
        });
    }

    errors
}

/// Validates a record against field options.
///
/// Keys not declared in `fields` are ignored. Null values only fail the
/// `required` check.
pub fn validate_record(fields: &FieldTable, record: &Record) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for field in fields.columns() {
        let value = record.get(&field.name).unwrap_or(&Value::Null);
        if value.is_null() {
            if field.options.required && field.options.default.is_none() {
                errors.push(ValidationError::MissingRequired(field.name.clone()));
            }
            continue;
        }
        errors.extend(validate_value(field, value));
    }

    errors
}

fn validate_value(field: &FieldDefinition, value: &Value) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let name = &field.name;
    let options = &field.options;

    let mismatch = |expected| ValidationError::TypeMismatch {
        field: name.clone(),
        expected,
    };

    match field.kind {
        FieldKind::Integer if !value.is_i64() && !value.is_u64() => {
            errors.push(mismatch("an integer"));
            return errors;
        }
        FieldKind::Decimal if !value.is_number() => {
            errors.push(mismatch("a number"));
            return errors;
        }
        FieldKind::Boolean if !value.is_boolean() && !value.is_i64() => {
            errors.push(mismatch("a boolean"));
            return errors;
        }
        FieldKind::Text | FieldKind::ForeignKey | FieldKind::Datetime if !value.is_string() => {
            errors.push(mismatch("a string"));
            return errors;
        }
        _ => {}
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = options.min
            && n < min
        {
            errors.push(ValidationError::BelowMinimum {
                field: name.clone(),
                min,
            });
        }
        if let Some(max) = options.max
            && n > max
        {
            errors.push(ValidationError::AboveMaximum {
                field: name.clone(),
                max,
            });
        }
    }

    if let Some(s) = value.as_str() {
        let len = s.chars().count();
        if let Some(min_length) = options.min_length
            && len < min_length
        {
            errors.push(ValidationError::TooShort {
                field: name.clone(),
                min_length,
            });
        }
        if let Some(max_length) = options.max_length
            && len > max_length
        {
            errors.push(ValidationError::TooLong {
                field: name.clone(),
                max_length,
            });
        }
        if let Some(pattern) = &options.pattern {
            // Invalid patterns are reported by `validate_descriptor`.
            if let Ok(re) = Regex::new(pattern)
                && !re.is_match(s)
            {
                errors.push(ValidationError::PatternMismatch {
                    field: name.clone(),
                    pattern: pattern.clone(),
                });
            }
        }
    }

    errors
}
