//! # Database Error Types
//!
//! Classified errors for gateway and transaction operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  PostgreSQL Error (sqlx::Error)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DriverError (driver.rs) ← Raw, logged with the query text             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Classified, message-stable                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller maps status_code() to its own response                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Driver messages never reach a `DbError`. They are logged at the boundary
//! and replaced by one of the variants below.

use sqlgate_core::CoreError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DbError {
    /// The gateway was constructed with an unusable client or table name.
    ///
    /// ## When This Occurs
    /// - Table name is empty or not a valid identifier
    /// - Pool is already closed
    #[error("Invalid constructor parameters for Model: {0}")]
    InvalidBinding(String),

    /// A transaction was requested on a single-connection binding.
    #[error("Client should be a Pool.")]
    InvalidClient,

    /// `get_one` matched zero rows with `fail_on_empty` set.
    #[error("Record cannot be found.")]
    NotFound,

    /// A read or delete round trip failed.
    #[error("Request cannot be completed.")]
    QueryFailed,

    /// The INSERT was rejected or affected zero rows.
    #[error("Failed to insert new record.")]
    InsertFailed,

    /// The UPDATE was rejected or affected zero rows.
    #[error("Failed to update the record.")]
    UpdateFailed,

    /// The pool could not hand out a dedicated connection.
    #[error("No available client in the Pool.")]
    NoAvailableConnection,

    /// `BEGIN` failed; nothing ran.
    #[error("Failed in starting the transaction.")]
    TransactionStartFailed,

    /// A statement (or `COMMIT`) failed and `ROLLBACK` succeeded.
    #[error("Transaction error but it has been rolled back.")]
    TransactionRolledBack,

    /// A statement (or `COMMIT`) failed and `ROLLBACK` failed too.
    /// Database state is indeterminate.
    #[error("Transaction error and it failed to be rolled back.")]
    TransactionRollbackFailed,

    /// Input could not be compiled (empty payload, malformed filter).
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] CoreError),

    /// Pool creation failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Configuration is missing or malformed.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DbError {
    /// HTTP-style status code for the error kind.
    ///
    /// ```text
    /// NotFound      → 404
    /// InvalidInput  → 400
    /// everything else → 500
    /// ```
    pub fn status_code(&self) -> u16 {
        match self {
            DbError::NotFound => 404,
            DbError::InvalidInput(_) => 400,
            _ => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound)
    }

    /// True for the transaction failure kinds.
    pub fn is_transaction_failure(&self) -> bool {
        matches!(
            self,
            DbError::TransactionStartFailed
                | DbError::TransactionRolledBack
                | DbError::TransactionRollbackFailed
        )
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================
