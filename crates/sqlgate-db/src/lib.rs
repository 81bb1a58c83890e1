//! # sqlgate-db: Database Layer for sqlgate
//!
//! Runs statements compiled by `sqlgate-core` against PostgreSQL through
//! sqlx, and classifies every failure into a [`DbError`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         sqlgate Data Flow                               │
//! │                                                                         │
//! │  Caller (service handler)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    sqlgate-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌────────────────┐  │   │
//! │  │   │   Database    │   │     Model     │   │  transaction   │  │   │
//! │  │   │   (pool.rs)   │──►│  (model.rs)   │──►│ BEGIN..COMMIT  │  │   │
//! │  │   └───────────────┘   └───────────────┘   └────────────────┘  │   │
//! │  │           │                   │                    │           │   │
//! │  │           ▼                   ▼                    ▼           │   │
//! │  │   ┌─────────────────────────────────────────────────────────┐ │   │
//! │  │   │  driver.rs: Queryable / ConnectionPool / Client         │ │   │
//! │  │   │  pg.rs:     PgPool, PgPooledConnection, PgConnectionClient│ │   │
//! │  │   └─────────────────────────────────────────────────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PostgreSQL                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Pool configuration and the [`Database`] handle
//! - [`model`] - Table-bound record gateway
//! - [`transaction`] - Transaction orchestrator
//! - [`driver`] - Driver capability traits
//! - [`pg`] - sqlx implementations of the driver traits
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sqlgate_db::{Database, DbConfig, GetOneOptions};
//! use sqlgate_core::{Filter, Payload};
//!
//! let db = Database::connect(DbConfig::from_env()?).await?;
//! let users = db.model("users")?;
//!
//! let id = users.insert_one(Payload::new().with("name", "Ada")).await?;
//! let user = users.get_one_by_id(id.as_str(), GetOneOptions::default()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod driver;
pub mod error;
pub mod model;
pub mod pg;
pub mod pool;
pub mod transaction;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::{Client, ConnectionPool, DriverError, PooledConnection, QueryResult, Queryable};
pub use error::{DbError, DbResult};
pub use model::{GetOneOptions, IdGenerator, Model, SelectOptions};
pub use pg::{PgConnectionClient, PgPooledConnection};
pub use pool::{Database, DbConfig};
pub use transaction::{run_in_pool, run_transactions, TransactionPhase, TransactionSession};
