//! # Driver Capability
//!
//! The seam between sqlgate and whatever actually talks to PostgreSQL.
//!
//! ## Capability Traits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Driver Capability                                │
//! │                                                                         │
//! │  Queryable                                                             │
//! │  └── query(&Statement) → QueryResult { rows, row_count }               │
//! │        ▲                          ▲                                     │
//! │        │                          │                                     │
//! │  ConnectionPool                PooledConnection                        │
//! │  └── acquire() ──────────────► ├── release(self: Box<Self>)            │
//! │                                └── discard(self: Box<Self>)            │
//! │                                                                         │
//! │  Client<'a>                                                            │
//! │  ├── Pool(&dyn ConnectionPool)      (transactions allowed)             │
//! │  └── Connection(&dyn Queryable)     (single statements only)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `release` and `discard` consume the boxed connection, so a connection
//! cannot be given back twice. The PostgreSQL implementations live in [`crate::pg`].

use async_trait::async_trait;
use serde::Serialize;
use sqlgate_core::{Row, Statement};
use thiserror::Error;

// =============================================================================
// Driver Error
// =============================================================================

/// Raw failure reported by a driver.
///
/// These are logged and then replaced by a [`DbError`](crate::DbError);
/// callers of the gateway never see them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The server rejected the statement.
    #[error("Database error: {0}")]
    Database(String),

    /// No connection could be obtained.
    #[error("Connection unavailable: {0}")]
    Connection(String),

    /// A returned column could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Anything else the driver reports.
    #[error("Driver error: {0}")]
    Other(String),
}

impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DriverError::Database(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => {
                DriverError::Connection("timed out waiting for a connection".to_string())
            }
            sqlx::Error::PoolClosed => DriverError::Connection("pool is closed".to_string()),
            sqlx::Error::Io(e) => DriverError::Connection(e.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DriverError::Decode(err.to_string())
            }
            _ => DriverError::Other(err.to_string()),
        }
    }
}

// =============================================================================
// Query Result
// =============================================================================

/// What a single statement produced.
///
/// Serializes as `{"rows": [...], "row_count": n}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// Returned rows, in order. Empty for statements without a result set.
    pub rows: Vec<Row>,

    /// Rows returned, or rows affected for INSERT / UPDATE / DELETE.
    pub row_count: u64,
}

impl QueryResult {
    /// A result set; `row_count` is the number of rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let row_count = rows.len() as u64;
        QueryResult { rows, row_count }
    }

    /// A command result with no rows.
    pub fn affected(row_count: u64) -> Self {
        QueryResult {
            rows: Vec::new(),
            row_count,
        }
    }
}

// =============================================================================
// Capability Traits
// =============================================================================

/// Anything that can run a statement.
#[async_trait]
pub trait Queryable: Send + Sync {
    async fn query(&self, statement: &Statement) -> Result<QueryResult, DriverError>;
}

/// A connection checked out of a pool for exclusive use.
pub trait PooledConnection: Queryable {
    /// Hands the connection back to its pool.
    fn release(self: Box<Self>);

    /// Gives the connection up without letting the pool reuse it.
    ///
    /// Used when its session state is unknown, e.g. a transaction that was
    /// abandoned mid-flight or could not be rolled back.
    fn discard(self: Box<Self>) {
        self.release();
    }
}

/// A pool that can hand out dedicated connections.
#[async_trait]
pub trait ConnectionPool: Queryable {
    async fn acquire(&self) -> Result<Box<dyn PooledConnection>, DriverError>;

    /// Returns false once the pool can no longer serve connections.
    fn is_open(&self) -> bool {
        true
    }
}

// =============================================================================
// Client
// =============================================================================

/// The connection capability a gateway is bound to.
#[derive(Clone, Copy)]
pub enum Client<'a> {
    /// A pool: single statements run on any pooled connection, and
    /// transactions are allowed.
    Pool(&'a dyn ConnectionPool),

    /// A single connection: no transactions.
    Connection(&'a dyn Queryable),
}

impl<'a> Client<'a> {
    pub fn pool<P: ConnectionPool>(pool: &'a P) -> Self {
        Client::Pool(pool)
    }

    pub fn connection<C: Queryable>(connection: &'a C) -> Self {
        Client::Connection(connection)
    }

    /// The pool, when this client is one.
    pub fn as_pool(&self) -> Option<&'a dyn ConnectionPool> {
        match self {
            Client::Pool(pool) => Some(*pool),
            Client::Connection(_) => None,
        }
    }

    pub fn is_pool(&self) -> bool {
        matches!(self, Client::Pool(_))
    }

    /// Runs a single statement on the bound capability.
    pub async fn query(&self, statement: &Statement) -> Result<QueryResult, DriverError> {
        match self {
            Client::Pool(pool) => pool.query(statement).await,
            Client::Connection(connection) => connection.query(statement).await,
        }
    }
}

impl std::fmt::Debug for Client<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Client::Pool(_) => f.write_str("Client::Pool"),
            Client::Connection(_) => f.write_str("Client::Connection"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
