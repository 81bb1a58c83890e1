//! Scripted in-memory driver for unit tests.
//!
//! Records every statement text, counts `acquire()` / `release()` calls, and
//! fails or answers statements by text prefix.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlgate_core::Statement;

use crate::driver::{ConnectionPool, DriverError, PooledConnection, QueryResult, Queryable};

#[derive(Default)]
struct FakeState {
    log: Mutex<Vec<Statement>>,
    failures: Mutex<Vec<String>>,
    responses: Mutex<Vec<(String, QueryResult)>>,
    stalls: Mutex<Vec<String>>,
    acquires: AtomicUsize,
    releases: AtomicUsize,
    discards: AtomicUsize,
    refuse_acquire: AtomicBool,
    closed: AtomicBool,
}

impl FakeState {
    async fn query(&self, statement: &Statement) -> Result<QueryResult, DriverError> {
        let text = statement.text.trim_start();
        let stalled = self
            .stalls
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| text.starts_with(prefix.as_str()));
        if stalled {
            self.log.lock().unwrap().push(statement.clone());
            std::future::pending::<()>().await;
        }

        self.run(statement)
    }

    fn run(&self, statement: &Statement) -> Result<QueryResult, DriverError> {
        self.log.lock().unwrap().push(statement.clone());

        let text = statement.text.trim_start();
        let failing = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| text.starts_with(prefix.as_str()));
        if failing {
            return Err(DriverError::Database(format!("scripted failure: {}", text)));
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| text.starts_with(prefix.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_default())
    }
}

/// Fake pool. Clones share state.
#[derive(Clone, Default)]
pub(crate) struct FakePool {
    state: Arc<FakeState>,
}

impl FakePool {
    pub(crate) fn new() -> Self {
        init_tracing();
        FakePool::default()
    }

    /// Statements starting with `prefix` fail.
    pub(crate) fn fail_on(self, prefix: &str) -> Self {
        self.state.failures.lock().unwrap().push(prefix.to_string());
        self
    }

    /// Statements starting with `prefix` return `result`.
    pub(crate) fn respond(self, prefix: &str, result: QueryResult) -> Self {
        self.state
            .responses
            .lock()
            .unwrap()
            .push((prefix.to_string(), result));
        self
    }

    /// Statements starting with `prefix` never complete.
    pub(crate) fn stall_on(self, prefix: &str) -> Self {
        self.state.stalls.lock().unwrap().push(prefix.to_string());
        self
    }

    /// `acquire()` fails.
    pub(crate) fn refuse_connections(self) -> Self {
        self.state.refuse_acquire.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }

    /// Statement texts in execution order.
    pub(crate) fn log(&self) -> Vec<String> {
        self.statements().into_iter().map(|s| s.text).collect()
    }

    pub(crate) fn statements(&self) -> Vec<Statement> {
        self.state.log.lock().unwrap().clone()
    }

    pub(crate) fn acquires(&self) -> usize {
        self.state.acquires.load(Ordering::SeqCst)
    }

    /// Connections given back, whether released or discarded.
    pub(crate) fn releases(&self) -> usize {
        self.state.releases.load(Ordering::SeqCst)
    }

    pub(crate) fn discards(&self) -> usize {
        self.state.discards.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Queryable for FakePool {
    async fn query(&self, statement: &Statement) -> Result<QueryResult, DriverError> {
        self.state.query(statement).await
    }
}

#[async_trait]
impl ConnectionPool for FakePool {
    async fn acquire(&self) -> Result<Box<dyn PooledConnection>, DriverError> {
        if self.state.refuse_acquire.load(Ordering::SeqCst) {
            return Err(DriverError::Connection("pool exhausted".to_string()));
        }
        self.state.acquires.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(FakeConnection {
            state: Arc::clone(&self.state),
        }))
    }

    fn is_open(&self) -> bool {
        !self.state.closed.load(Ordering::SeqCst)
    }
}

/// Fake connection. Pooled ones share their pool's state.
pub(crate) struct FakeConnection {
    state: Arc<FakeState>,
}

impl FakeConnection {
    /// A connection that does not belong to any pool.
    pub(crate) fn standalone() -> Self {
        init_tracing();
        FakeConnection {
            state: Arc::new(FakeState::default()),
        }
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.state
            .log
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.text.clone())
            .collect()
    }
}

#[async_trait]
impl Queryable for FakeConnection {
    async fn query(&self, statement: &Statement) -> Result<QueryResult, DriverError> {
        self.state.query(statement).await
    }
}

impl PooledConnection for FakeConnection {
    fn release(self: Box<Self>) {
        self.state.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn discard(self: Box<Self>) {
        self.state.discards.fetch_add(1, Ordering::SeqCst);
        self.state.releases.fetch_add(1, Ordering::SeqCst);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
