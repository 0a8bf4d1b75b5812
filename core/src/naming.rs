//! Name derivation and identifier checks.
//!
//! Everything that ends up spliced into SQL text as a structural name (table,
//! column, trigger, index) passes through [`validate_identifier`] first. Values
//! never do; they are always bound as parameters.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CoreError, Result};

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("static regex must compile")
});

/// Returns `true` if `name` is non-empty and made only of `[A-Za-z0-9_]`.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates a structural SQL name, returning it unchanged on success.
///
/// # Errors
///
/// Returns [`CoreError::InvalidIdentifier`] for empty names or names containing
/// anything other than ASCII alphanumerics and underscores.
///
/// # Examples
///
/// ```
/// use smrt_core::validate_identifier;
///
/// assert!(validate_identifier("products").is_ok());
/// assert!(validate_identifier("products; DROP TABLE x").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<&str> {
    if is_valid_identifier(name) {
        Ok(name)
    } else {
        Err(CoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Like [`validate_identifier`] but also allows `.` for `table.column` references.
pub fn validate_column_ref(name: &str) -> Result<&str> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if ok {
        Ok(name)
    } else {
        Err(CoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Returns `true` if `value` has the canonical hyphenated UUID shape.
pub fn is_uuid(value: &str) -> bool {
    UUID_RE.is_match(value)
}

/// Derives a table name from a type name.
///
/// `PascalCase` becomes `snake_case`, then a plural suffix is added: names
/// ending in `s` are kept, a consonant followed by `y` becomes `ies`, and
/// everything else gets an `s`.
///
/// # Examples
///
/// ```
/// use smrt_core::table_name;
///
/// assert_eq!(table_name("Product"), "products");
/// assert_eq!(table_name("ProductTag"), "product_tags");
/// assert_eq!(table_name("Category"), "categories");
/// assert_eq!(table_name("Address"), "address");
/// ```
pub fn table_name(type_name: &str) -> String {
    let mut snake = String::with_capacity(type_name.len() + 4);
    let mut prev_lower = false;
    for c in type_name.chars() {
        if c.is_ascii_uppercase() && prev_lower {
            snake.push('_');
        }
        prev_lower = c.is_ascii_lowercase();
        snake.push(c.to_ascii_lowercase());
    }

    if snake.is_empty() || snake.ends_with('s') {
        return snake;
    }
    if let Some(stem) = snake.strip_suffix('y') {
        let vowel_before = stem.ends_with(['a', 'e', 'i', 'o', 'u']);
        if !vowel_before {
            return format!("{stem}ies");
        }
    }
    snake.push('s');
    snake
}

/// Computes a URL-friendly slug from a display name.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single `-`, and trims leading and trailing dashes.
///
/// # Examples
///
/// ```
/// use smrt_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("  --Rust & SQL!! "), "rust-sql");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(is_valid_identifier("products"));
        assert!(is_valid_identifier("Product_Tags2"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("drop;--"));
        assert!(!is_valid_identifier("hello world"));
        assert!(!is_valid_identifier("tëst"));
    }

    #[test]
    fn test_column_ref_allows_dots() {
        assert!(validate_column_ref("products.price").is_ok());
        assert!(validate_column_ref("price)--").is_err());
    }

    #[test]
    fn test_uuid_shape() {
        assert!(is_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_uuid("550E8400-E29B-41D4-A716-446655440000"));
        assert!(!is_uuid("550e8400e29b41d4a716446655440000"));
        assert!(!is_uuid("some-slug"));
    }

    #[test]
    fn test_table_name_pluralization() {
        assert_eq!(table_name("Product"), "products");
        assert_eq!(table_name("Category"), "categories");
        assert_eq!(table_name("Key"), "keys");
        assert_eq!(table_name("Status"), "status");
        assert_eq!(table_name("HTMLPage"), "htmlpages");
        assert_eq!(table_name("userProfile"), "user_profiles");
    }

    #[test]
    fn test_slugify_edge_cases() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Already-a-slug"), "already-a-slug");
        assert_eq!(slugify("Crème Brûlée 2"), "cr-me-br-l-e-2");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }
}
