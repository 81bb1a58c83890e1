//! # Error Types
//!
//! Error types for query compilation.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  sqlgate-core errors (this file)                                       │
//! │  ├── CoreError        - Compilation failures (payload, filter shape)   │
//! │  └── ValidationError  - Identifier validation failures                 │
//! │                                                                         │
//! │  sqlgate-db errors (separate crate)                                    │
//! │  ├── DriverError      - Raw failures from the connection capability    │
//! │  └── DbError          - Classified, message-stable caller errors       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, statement kind, etc.)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Query compilation errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// A payload with no fields was handed to an INSERT or UPDATE builder.
    ///
    /// ## When This Occurs
    /// - `bind_parameters` / `bind_assignments` on an empty [`Payload`](crate::Payload)
    /// - `update_one` called with nothing to set
    #[error("{statement} requires at least one field")]
    EmptyPayload { statement: &'static str },

    /// A JSON filter description has a shape that cannot be compiled.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// A join descriptor has an unsupported shape or join type.
    #[error("Invalid join: {0}")]
    InvalidJoin(String),

    /// A comparison operator is not in the supported set.
    #[error("Unsupported operator: {0}")]
    InvalidOperator(String),

    /// A JSON payload description is not an object.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Identifier validation errors.
///
/// Used when a table name is bound to a gateway, before any SQL is built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., identifier containing whitespace or quotes).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Result type for compilation operations.
pub type CoreResult<T> = Result<T, CoreError>;
