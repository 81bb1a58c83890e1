//! # Validation Module
//!
//! Identifier validation for table names bound to a gateway.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Where Names Are Checked                            │
//! │                                                                         │
//! │  Model::new(client, "public.products")                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_table_name()  ← THIS MODULE, once, at construction           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Every statement reuses the validated name verbatim                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use sqlgate_core::validation::validate_table_name;
//!
//! assert!(validate_table_name("products").is_ok());
//! assert!(validate_table_name("public.products").is_ok());
//! assert!(validate_table_name("products; DROP TABLE x").is_err());
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// PostgreSQL truncates identifiers longer than NAMEDATALEN - 1 bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// One identifier part: bare (`products`, `_tmp$1`) or double-quoted (`"Order Items"`).
static IDENTIFIER_PART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:[A-Za-z_][A-Za-z0-9_$]*|"[^"\x00]+")$"#).expect("valid regex")
});

/// Validates a table name, optionally schema-qualified (`schema.table`).
///
/// ## Rules
/// - Must not be empty
/// - At most two dot-separated parts
/// - Each part is a bare identifier or a double-quoted identifier
/// - Each part is at most 63 characters
pub fn validate_table_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidFormat {
            field: "table".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    let parts = split_qualified(name);
    if parts.len() > 2 {
        return Err(ValidationError::InvalidFormat {
            field: "table".to_string(),
            reason: "expected `table` or `schema.table`".to_string(),
        });
    }

    for part in parts {
        validate_identifier("table", part)?;
    }

    Ok(())
}

/// Validates a single identifier part.
pub fn validate_identifier(field: &str, part: &str) -> ValidationResult<()> {
    let unquoted_len = part.trim_matches('"').chars().count();
    if unquoted_len > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_IDENTIFIER_LEN,
        });
    }

    if !IDENTIFIER_PART_RE.is_match(part) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{}' is not a valid identifier", part),
        });
    }

    Ok(())
}

/// Splits on dots that are outside double quotes.
fn split_qualified(name: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in name.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => {
                parts.push(&name[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&name[start..]);
    parts
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_table_name() {
        // Valid names
        assert!(validate_table_name("products").is_ok());
        assert!(validate_table_name("sale_items").is_ok());
        assert!(validate_table_name("public.products").is_ok());
        assert!(validate_table_name(r#""Order Items""#).is_ok());
        assert!(validate_table_name(r#"shop."Order.Items""#).is_ok());

        // Invalid names
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("   ").is_err());
        assert!(validate_table_name("has space").is_err());
        assert!(validate_table_name("1products").is_err());
        assert!(validate_table_name("a.b.c").is_err());
        assert!(validate_table_name("products;--").is_err());
        assert!(validate_table_name("products.").is_err());
    }

    #[test]
    fn test_identifier_length() {
        assert!(validate_table_name(&"a".repeat(63)).is_ok());
        assert_eq!(
            validate_table_name(&"a".repeat(64)),
            Err(ValidationError::TooLong {
                field: "table".to_string(),
                max: 63
            })
        );
    }
}
