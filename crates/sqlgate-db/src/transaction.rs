//! # Transaction Orchestrator
//!
//! Runs an ordered batch of statements inside `BEGIN` / `COMMIT` on one
//! dedicated pooled connection, rolling back on failure.
//!
//! ## Session State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Transaction Session                                 │
//! │                                                                         │
//! │  acquire() ──✗──► NoAvailableConnection   (nothing to release)         │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  BEGIN ──────✗──────────────────────────► TransactionStartFailed       │
//! │     │                                              │                    │
//! │     ▼                                              │                    │
//! │  RUN  s1 → s2 → ... → sN   (strictly in order)     │                    │
//! │     │        │ ✗                                   │                    │
//! │     ▼        ▼                                     │                    │
//! │  COMMIT ─✗─► ROLLBACK ──ok──► TransactionRolledBack│                    │
//! │     │            └─────✗────► TransactionRollbackFailed                 │
//! │     │ ok                               │           │                    │
//! │     ▼                                  ▼           ▼                    │
//! │  results ──────────────────────────► RELEASED (exactly once)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session owns the connection. [`TransactionSession::release`]
//! consumes the session, and [`run_transactions`] calls it once after the
//! session has finished, whatever the outcome.
//!
//! A connection whose ROLLBACK failed is discarded instead of released. So
//! is the connection of a session dropped before it finished (the caller's
//! future was cancelled mid-transaction): the open transaction dies with
//! the connection and never reaches the next borrower.
//!
//! No deadline is imposed here. Statement and acquire timeouts belong to
//! the connection capability (see `DbConfig::acquire_timeout`).

use sqlgate_core::Statement;
use tracing::{debug, error, info, warn};

use crate::driver::{Client, ConnectionPool, DriverError, PooledConnection, QueryResult};
use crate::error::{DbError, DbResult};

// =============================================================================
// Phase
// =============================================================================

/// Where a transaction session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionPhase {
    Begin,
    Run,
    Commit,
    Rollback,
    Released,
}

impl TransactionPhase {
    /// The control statement issued when entering the phase, if any.
    pub fn control_statement(&self) -> Option<&'static str> {
        match self {
            TransactionPhase::Begin => Some("BEGIN"),
            TransactionPhase::Commit => Some("COMMIT"),
            TransactionPhase::Rollback => Some("ROLLBACK"),
            TransactionPhase::Run | TransactionPhase::Released => None,
        }
    }
}

impl std::fmt::Display for TransactionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionPhase::Begin => write!(f, "BEGIN"),
            TransactionPhase::Run => write!(f, "RUN"),
            TransactionPhase::Commit => write!(f, "COMMIT"),
            TransactionPhase::Rollback => write!(f, "ROLLBACK"),
            TransactionPhase::Released => write!(f, "RELEASED"),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// One transaction on one exclusively owned connection.
///
/// Dropping a session without calling [`TransactionSession::release`]
/// discards its connection.
pub struct TransactionSession {
    connection: Option<Box<dyn PooledConnection>>,
    phase: TransactionPhase,
    results: Vec<QueryResult>,
    /// Set when ROLLBACK failed; the connection may still be inside a transaction.
    poisoned: bool,
}

impl TransactionSession {
    /// Wraps a freshly acquired connection. Nothing is sent yet.
    pub fn new(connection: Box<dyn PooledConnection>) -> Self {
        TransactionSession {
            connection: Some(connection),
            phase: TransactionPhase::Begin,
            results: Vec::new(),
            poisoned: false,
        }
    }

    pub fn phase(&self) -> TransactionPhase {
        self.phase
    }

    /// Drives the session from BEGIN to COMMIT (or ROLLBACK).
    ///
    /// Leaves the connection in place; call [`TransactionSession::release`]
    /// afterwards.
    pub async fn run(&mut self, statements: &[Statement]) -> DbResult<Vec<QueryResult>> {
        if let Err(err) = self.control(TransactionPhase::Begin).await {
            error!(error = %err, "Failed to start transaction");
            return Err(DbError::TransactionStartFailed);
        }

        self.enter(TransactionPhase::Run);
        for (index, statement) in statements.iter().enumerate() {
            match self.query(statement).await {
                Ok(result) => {
                    debug!(index, row_count = result.row_count, "Transaction statement completed");
                    self.results.push(result);
                }
                Err(err) => {
                    warn!(
                        index,
                        error = %err,
                        query = %statement.text,
                        "Transaction statement failed"
                    );
                    return Err(self.rollback().await);
                }
            }
        }

        if let Err(err) = self.control(TransactionPhase::Commit).await {
            warn!(error = %err, "Commit failed");
            return Err(self.rollback().await);
        }

        Ok(std::mem::take(&mut self.results))
    }

    /// Hands the connection back to the pool. Consumes the session.
    ///
    /// A connection that could not be rolled back is discarded instead.
    pub fn release(mut self) {
        self.enter(TransactionPhase::Released);
        let Some(connection) = self.connection.take() else {
            return;
        };

        if self.poisoned {
            warn!("Discarding connection after failed rollback");
            connection.discard();
        } else {
            connection.release();
            debug!("Client connection is released");
        }
    }

    /// Issues ROLLBACK and classifies the outcome.
    async fn rollback(&mut self) -> DbError {
        self.results.clear();

        match self.control(TransactionPhase::Rollback).await {
            Ok(()) => {
                info!("Rollback success");
                DbError::TransactionRolledBack
            }
            Err(err) => {
                error!(error = %err, "Rollback error");
                self.poisoned = true;
                DbError::TransactionRollbackFailed
            }
        }
    }

    async fn control(&mut self, phase: TransactionPhase) -> Result<(), DriverError> {
        self.enter(phase);

        match phase.control_statement() {
            Some(text) => self.query(&Statement::new(text)).await.map(|_| ()),
            None => Ok(()),
        }
    }

    async fn query(&self, statement: &Statement) -> Result<QueryResult, DriverError> {
        match &self.connection {
            Some(connection) => connection.query(statement).await,
            None => Err(DriverError::Connection("connection already released".to_string())),
        }
    }

    fn enter(&mut self, phase: TransactionPhase) {
        debug!(from = %self.phase, to = %phase, "Transaction phase");
        self.phase = phase;
    }
}

impl Drop for TransactionSession {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            warn!(phase = %self.phase, "Transaction session dropped before release; discarding connection");
            connection.discard();
        }
    }
}

// =============================================================================
// Entry Points
// =============================================================================

/// Runs `statements` as one transaction on a dedicated connection from
/// `pool`.
///
/// ## Returns
/// * `Ok(results)` - one result per statement, in input order
/// * `Err(DbError::NoAvailableConnection)` - the pool refused a connection
/// * `Err(DbError::TransactionStartFailed)` - BEGIN failed
/// * `Err(DbError::TransactionRolledBack)` - a statement or COMMIT failed, rollback succeeded
/// * `Err(DbError::TransactionRollbackFailed)` - rollback failed as well
pub async fn run_in_pool<I, S>(pool: &dyn ConnectionPool, statements: I) -> DbResult<Vec<QueryResult>>
where
    I: IntoIterator<Item = S>,
    S: Into<Statement>,
{
    let statements: Vec<Statement> = statements.into_iter().map(Into::into).collect();

    let connection = pool.acquire().await.map_err(|err| {
        error!(error = %err, "Could not acquire a connection for the transaction");
        DbError::NoAvailableConnection
    })?;

    debug!(statements = statements.len(), "Starting transaction");

    let mut session = TransactionSession::new(connection);
    let outcome = session.run(&statements).await;
    session.release();

    outcome
}

/// Runs a transaction on the bound client.
///
/// Fails with [`DbError::InvalidClient`] before any I/O when the client is
/// a single connection rather than a pool.
pub async fn run_transactions<I, S>(client: Client<'_>, statements: I) -> DbResult<Vec<QueryResult>>
where
    I: IntoIterator<Item = S>,
    S: Into<Statement>,
{
    let pool = client.as_pool().ok_or_else(|| {
        warn!("Transaction requested on a single connection");
        DbError::InvalidClient
    })?;

    run_in_pool(pool, statements).await
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnection, FakePool};

    const S1: &str = "UPDATE users SET balance = balance - 1 WHERE id = 1";
    const S2: &str = "UPDATE items SET stock = stock - 2 WHERE id = 1";

    #[tokio::test]
    async fn test_all_statements_commit_in_order() {
        let pool = FakePool::new()
            .respond("UPDATE users", QueryResult::affected(1))
            .respond("UPDATE items", QueryResult::affected(2));

        let results = run_transactions(Client::pool(&pool), [S1, S2]).await.unwrap();

        assert_eq!(results, vec![QueryResult::affected(1), QueryResult::affected(2)]);
        assert_eq!(pool.log(), vec!["BEGIN", S1, S2, "COMMIT"]);
        assert_eq!(pool.acquires(), 1);
        assert_eq!(pool.releases(), 1);
        assert_eq!(pool.discards(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch_begins_and_commits() {
        let pool = FakePool::new();

        let results = run_transactions(Client::pool(&pool), Vec::<Statement>::new())
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(pool.log(), vec!["BEGIN", "COMMIT"]);
        assert_eq!(pool.releases(), 1);
    }

    #[tokio::test]
    async fn test_failed_statement_rolls_back() {
        let pool = FakePool::new().fail_on("UPDATE items");

        let err = run_transactions(Client::pool(&pool), [S1, S2]).await.unwrap_err();

        assert_eq!(err, DbError::TransactionRolledBack);
        assert_eq!(pool.log(), vec!["BEGIN", S1, S2, "ROLLBACK"]);
        assert_eq!(pool.releases(), 1);
        assert_eq!(pool.discards(), 0);
    }

    #[tokio::test]
    async fn test_statements_after_failure_are_not_run() {
        let pool = FakePool::new().fail_on("UPDATE users");

        let err = run_transactions(Client::pool(&pool), [S1, S2]).await.unwrap_err();

        assert_eq!(err, DbError::TransactionRolledBack);
        assert_eq!(pool.log(), vec!["BEGIN", S1, "ROLLBACK"]);
        assert_eq!(pool.releases(), 1);
    }

    #[tokio::test]
    async fn test_failed_rollback_is_reported_distinctly() {
        let pool = FakePool::new().fail_on("UPDATE items").fail_on("ROLLBACK");

        let err = run_transactions(Client::pool(&pool), [S1, S2]).await.unwrap_err();

        assert_eq!(err, DbError::TransactionRollbackFailed);
        assert_eq!(pool.releases(), 1);
        assert_eq!(pool.discards(), 1);
    }

    #[tokio::test]
    async fn test_failed_begin_releases_without_rollback() {
        let pool = FakePool::new().fail_on("BEGIN");

        let err = run_transactions(Client::pool(&pool), [S1]).await.unwrap_err();

        assert_eq!(err, DbError::TransactionStartFailed);
        assert_eq!(pool.log(), vec!["BEGIN"]);
        assert_eq!(pool.releases(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back() {
        let pool = FakePool::new().fail_on("COMMIT");

        let err = run_transactions(Client::pool(&pool), [S1]).await.unwrap_err();

        assert_eq!(err, DbError::TransactionRolledBack);
        assert_eq!(pool.log(), vec!["BEGIN", S1, "COMMIT", "ROLLBACK"]);
        assert_eq!(pool.releases(), 1);
    }

    #[tokio::test]
    async fn test_single_connection_is_invalid_client() {
        let connection = FakeConnection::standalone();

        let err = run_transactions(Client::connection(&connection), [S1])
            .await
            .unwrap_err();

        assert_eq!(err, DbError::InvalidClient);
        assert!(connection.log().is_empty());
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let pool = FakePool::new().refuse_connections();

        let err = run_transactions(Client::pool(&pool), [S1]).await.unwrap_err();

        assert_eq!(err, DbError::NoAvailableConnection);
        assert!(pool.log().is_empty());
        assert_eq!(pool.releases(), 0);
    }

    #[tokio::test]
    async fn test_bound_values_are_forwarded() {
        let pool = FakePool::new();
        let statement = Statement::with_values(
            "UPDATE items SET stock = $1 WHERE id = $2",
            vec![5.into(), "abc".into()],
        );

        run_transactions(Client::pool(&pool), [statement.clone()])
            .await
            .unwrap();

        assert_eq!(pool.statements()[1], statement);
    }

    #[tokio::test]
    async fn test_session_phases() {
        let pool = FakePool::new();
        let connection = pool.acquire().await.unwrap();
        let mut session = TransactionSession::new(connection);
        assert_eq!(session.phase(), TransactionPhase::Begin);

        session.run(&[Statement::new(S1)]).await.unwrap();
        assert_eq!(session.phase(), TransactionPhase::Commit);

        session.release();
        assert_eq!(pool.releases(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_transaction_discards_connection() {
        let pool = FakePool::new().stall_on("UPDATE items");

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            run_transactions(Client::pool(&pool), [S1, S2]),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(pool.log(), vec!["BEGIN", S1, S2]);
        assert_eq!(pool.releases(), 1);
        assert_eq!(pool.discards(), 1);
    }

    #[tokio::test]
    async fn test_dropped_session_discards_connection() {
        let pool = FakePool::new();
        let connection = pool.acquire().await.unwrap();

        drop(TransactionSession::new(connection));

        assert_eq!(pool.discards(), 1);
        assert_eq!(pool.releases(), 1);
    }
}
