//! # Record Gateway
//!
//! Table-bound CRUD over a [`Client`].
//!
//! ## Operation Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Model<'a> { client, table }                      │
//! │                                                                         │
//! │  get_many(filter, opts)    SELECT {select} FROM t {join} WHERE ...      │
//! │  get_one(filter, opts)     ... LIMIT 1      0 rows → NotFound / None    │
//! │  get_one_by_id(id, opts)   get_one({ id })                              │
//! │  insert_one(payload)       INSERT ... VALUES ($1..)  → generated id     │
//! │  update_one(id, payload)   UPDATE t SET a = $1 WHERE (id = 'lit')       │
//! │  delete_one(filter)        DELETE FROM t WHERE ...   0 rows → Ok        │
//! │  delete_one_by_id(id)      delete_one({ id })                           │
//! │  run_transactions(stmts)   see transaction.rs                           │
//! │                                                                         │
//! │  Driver failure ──► warn!(error, query) ──► classified DbError          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Row Count Rules
//! - `insert_one` and `update_one` fail when zero rows are affected.
//! - `delete_one` succeeds whatever the affected count. Deleting a record
//!   that is already gone is not an error.

use sqlgate_core::statement::{self, SELECT_ALL};
use sqlgate_core::validation::validate_table_name;
use sqlgate_core::{Filter, Join, Payload, Row, SqlValue, Statement};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::driver::{Client, DriverError, QueryResult};
use crate::error::{DbError, DbResult};
use crate::transaction;

/// Produces the id for a new record.
pub type IdGenerator = fn() -> SqlValue;

/// Default id generator: a random v4 UUID.
pub fn new_uuid() -> SqlValue {
    SqlValue::Uuid(Uuid::new_v4())
}

// =============================================================================
// Options
// =============================================================================

/// Options for [`Model::get_many`].
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOptions {
    /// Column list, verbatim. Defaults to `*`.
    pub select: String,
    pub joins: Vec<Join>,
}

impl Default for SelectOptions {
    fn default() -> Self {
        SelectOptions {
            select: SELECT_ALL.to_string(),
            joins: Vec::new(),
        }
    }
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }
}

/// Options for [`Model::get_one`].
#[derive(Debug, Clone, PartialEq)]
pub struct GetOneOptions {
    /// When true (the default), zero rows is [`DbError::NotFound`].
    /// When false, zero rows is `Ok(None)`.
    pub fail_on_empty: bool,
    pub select: String,
    pub joins: Vec<Join>,
}

impl Default for GetOneOptions {
    fn default() -> Self {
        GetOneOptions {
            fail_on_empty: true,
            select: SELECT_ALL.to_string(),
            joins: Vec::new(),
        }
    }
}

impl GetOneOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero rows resolves to `None`.
    pub fn optional() -> Self {
        GetOneOptions {
            fail_on_empty: false,
            ..Self::default()
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }
}

// =============================================================================
// Model
// =============================================================================

/// Gateway bound to one table and one connection capability.
///
/// Holds no mutable state, so one `Model` can serve concurrent calls.
///
/// ## Usage
/// ```rust,ignore
/// let users = Model::new(Client::pool(&pool), "users")?;
///
/// let id = users.insert_one(Payload::new().with("name", "Ada")).await?;
/// let row = users.get_one_by_id(id.as_str(), GetOneOptions::default()).await?;
/// users.update_one(id.as_str(), Payload::new().with("name", "Ada L.")).await?;
/// users.delete_one_by_id(id.as_str()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Model<'a> {
    client: Client<'a>,
    table: String,
    id_generator: IdGenerator,
}

impl<'a> Model<'a> {
    /// Binds a gateway to `table`.
    ///
    /// ## Errors
    /// * `DbError::InvalidBinding` - the table name is empty or malformed,
    ///   or the pool is already closed
    pub fn new(client: Client<'a>, table: impl Into<String>) -> DbResult<Self> {
        let table = table.into();

        validate_table_name(&table).map_err(|e| DbError::InvalidBinding(e.to_string()))?;

        if let Some(pool) = client.as_pool() {
            if !pool.is_open() {
                return Err(DbError::InvalidBinding("pool is closed".to_string()));
            }
        }

        Ok(Model {
            client,
            table,
            id_generator: new_uuid,
        })
    }

    /// Replaces the id generator used by [`Model::insert_one`].
    pub fn with_id_generator(mut self, generator: IdGenerator) -> Self {
        self.id_generator = generator;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn client(&self) -> Client<'a> {
        self.client
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Returns every matching row. Zero matches is an empty vec.
    pub async fn get_many(&self, filter: &Filter, options: SelectOptions) -> DbResult<Vec<Row>> {
        let statement = statement::select(&self.table, &options.select, &options.joins, filter);

        let result = self.run(&statement, "Read").await.map_err(|_| DbError::QueryFailed)?;

        debug!(table = %self.table, count = result.rows.len(), "Fetched rows");
        Ok(result.rows)
    }

    /// Returns the first matching row.
    ///
    /// ## Returns
    /// * `Ok(Some(row))` - a row matched
    /// * `Ok(None)` - nothing matched and `fail_on_empty` is false
    /// * `Err(DbError::NotFound)` - nothing matched and `fail_on_empty` is true
    /// * `Err(DbError::QueryFailed)` - the driver rejected the query
    pub async fn get_one(&self, filter: &Filter, options: GetOneOptions) -> DbResult<Option<Row>> {
        let statement =
            statement::select_one(&self.table, &options.select, &options.joins, filter);

        let result = self.run(&statement, "Read").await.map_err(|_| DbError::QueryFailed)?;

        match result.rows.into_iter().next() {
            Some(row) => Ok(Some(row)),
            None if options.fail_on_empty => {
                debug!(table = %self.table, "No record matched");
                Err(DbError::NotFound)
            }
            None => Ok(None),
        }
    }

    /// [`Model::get_one`] filtered on `id`.
    pub async fn get_one_by_id(
        &self,
        id: impl Into<SqlValue>,
        options: GetOneOptions,
    ) -> DbResult<Option<Row>> {
        self.get_one(&Filter::by_id(id), options).await
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Inserts `payload` under a freshly generated id and returns that id.
    ///
    /// Any `id` already in the payload is overwritten.
    pub async fn insert_one(&self, mut payload: Payload) -> DbResult<String> {
        let id = (self.id_generator)();
        if let Some(previous) = payload.insert("id", id.clone()) {
            debug!(table = %self.table, previous = %previous, "Replacing caller-supplied id");
        }

        let statement = statement::insert(&self.table, &payload)?;

        let result = self
            .run(&statement, "Insert")
            .await
            .map_err(|_| DbError::InsertFailed)?;

        debug!(table = %self.table, row_count = result.row_count, "Insert completed");

        if result.row_count == 0 {
            return Err(DbError::InsertFailed);
        }

        Ok(id.to_string())
    }

    /// Updates the record with `id`. Zero affected rows is
    /// [`DbError::UpdateFailed`].
    ///
    /// The SET values are bound parameters. The id is inlined into the
    /// WHERE clause as an encoded literal.
    pub async fn update_one(&self, id: impl Into<SqlValue>, payload: Payload) -> DbResult<()> {
        let statement = statement::update(&self.table, &payload, &Filter::by_id(id))?;

        let result = self
            .run(&statement, "Update")
            .await
            .map_err(|_| DbError::UpdateFailed)?;

        debug!(table = %self.table, row_count = result.row_count, "Update completed");

        if result.row_count == 0 {
            return Err(DbError::UpdateFailed);
        }

        Ok(())
    }

    /// Deletes every row matching `filter`. Succeeds even when nothing
    /// matched.
    ///
    /// An empty filter deletes the whole table.
    pub async fn delete_one(&self, filter: &Filter) -> DbResult<()> {
        if filter.is_empty() {
            warn!(table = %self.table, "Delete without a filter removes every row");
        }

        let statement = statement::delete(&self.table, filter);

        let result = self.run(&statement, "Delete").await.map_err(|_| DbError::QueryFailed)?;

        debug!(table = %self.table, row_count = result.row_count, "Delete completed");
        Ok(())
    }

    /// [`Model::delete_one`] filtered on `id`.
    pub async fn delete_one_by_id(&self, id: impl Into<SqlValue>) -> DbResult<()> {
        self.delete_one(&Filter::by_id(id)).await
    }

    /// Runs `statements` as one transaction. Requires a pool client.
    pub async fn run_transactions<I, S>(&self, statements: I) -> DbResult<Vec<QueryResult>>
    where
        I: IntoIterator<Item = S>,
        S: Into<Statement>,
    {
        transaction::run_transactions(self.client, statements).await
    }

    /// Runs one statement, logging the query text on failure.
    async fn run(&self, statement: &Statement, kind: &str) -> Result<QueryResult, DriverError> {
        self.client.query(statement).await.inspect_err(|err| {
            warn!(
                table = %self.table,
                error = %err,
                query = %statement.text,
                "{} rejection",
                kind
            );
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnection, FakePool};
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    fn fixed_id() -> SqlValue {
        SqlValue::Text("fixed-id".to_string())
    }

    #[test]
    fn test_invalid_table_is_rejected() {
        let pool = FakePool::new();

        let err = Model::new(Client::pool(&pool), "").unwrap_err();
        assert!(matches!(err, DbError::InvalidBinding(_)));

        let err = Model::new(Client::pool(&pool), "users; DROP TABLE x").unwrap_err();
        assert!(matches!(err, DbError::InvalidBinding(_)));

        assert!(Model::new(Client::pool(&pool), "public.users").is_ok());
    }

    #[test]
    fn test_closed_pool_is_rejected() {
        let pool = FakePool::new();
        pool.close();

        let err = Model::new(Client::pool(&pool), "users").unwrap_err();
        assert!(matches!(err, DbError::InvalidBinding(_)));
    }

    #[tokio::test]
    async fn test_get_many_builds_select() {
        let pool = FakePool::new().respond(
            "SELECT",
            QueryResult::from_rows(vec![row(json!({"id": 1})), row(json!({"id": 2}))]),
        );
        let model = Model::new(Client::pool(&pool), "users").unwrap();

        let rows = model
            .get_many(&Filter::eq("active", true), SelectOptions::new().select("id"))
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(pool.log(), vec!["SELECT id FROM users  WHERE (active = true)"]);
    }

    #[tokio::test]
    async fn test_get_many_with_join_and_no_filter() {
        let pool = FakePool::new();
        let model = Model::new(Client::pool(&pool), "users").unwrap();

        let rows = model
            .get_many(
                &Filter::Empty,
                SelectOptions::new().join(Join::left("orders", "orders.user_id = users.id")),
            )
            .await
            .unwrap();

        assert!(rows.is_empty());
        assert_eq!(
            pool.log(),
            vec!["SELECT * FROM users  LEFT JOIN orders ON orders.user_id = users.id  "]
        );
    }

    #[tokio::test]
    async fn test_get_many_driver_failure() {
        let pool = FakePool::new().fail_on("SELECT");
        let model = Model::new(Client::pool(&pool), "users").unwrap();

        let err = model
            .get_many(&Filter::Empty, SelectOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, DbError::QueryFailed);
        assert_eq!(err.to_string(), "Request cannot be completed.");
    }

    #[tokio::test]
    async fn test_get_one_not_found_vs_optional() {
        let pool = FakePool::new();
        let model = Model::new(Client::pool(&pool), "users").unwrap();

        let err = model
            .get_one_by_id("missing", GetOneOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, DbError::NotFound);
        assert_eq!(err.status_code(), 404);

        let none = model
            .get_one_by_id("missing", GetOneOptions::optional())
            .await
            .unwrap();
        assert!(none.is_none());

        assert_eq!(
            pool.log()[0],
            "SELECT * FROM users WHERE (id = 'missing') LIMIT 1"
        );
    }

    #[tokio::test]
    async fn test_get_one_returns_first_row() {
        let pool = FakePool::new().respond(
            "SELECT",
            QueryResult::from_rows(vec![row(json!({"id": "a"})), row(json!({"id": "b"}))]),
        );
        let model = Model::new(Client::pool(&pool), "users").unwrap();

        let found = model
            .get_one(&Filter::eq("name", "Ada"), GetOneOptions::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found["id"], json!("a"));
    }

    #[tokio::test]
    async fn test_insert_overwrites_caller_id() {
        let pool = FakePool::new().respond("INSERT", QueryResult::affected(1));
        let model = Model::new(Client::pool(&pool), "users")
            .unwrap()
            .with_id_generator(fixed_id);

        let id = model
            .insert_one(Payload::new().with("id", "caller").with("name", "Ada"))
            .await
            .unwrap();

        assert_eq!(id, "fixed-id");
        let sent = &pool.statements()[0];
        assert_eq!(sent.text, "INSERT INTO users(id, name) VALUES ($1, $2)");
        assert_eq!(sent.values, vec![fixed_id(), SqlValue::from("Ada")]);
    }

    #[tokio::test]
    async fn test_insert_generates_distinct_uuids() {
        let pool = FakePool::new().respond("INSERT", QueryResult::affected(1));
        let model = Model::new(Client::pool(&pool), "users").unwrap();

        let first = model
            .insert_one(Payload::new().with("name", "a"))
            .await
            .unwrap();
        let second = model
            .insert_one(Payload::new().with("name", "b"))
            .await
            .unwrap();

        assert_ne!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[tokio::test]
    async fn test_insert_zero_rows_fails() {
        let pool = FakePool::new();
        let model = Model::new(Client::pool(&pool), "users").unwrap();

        let err = model
            .insert_one(Payload::new().with("name", "Ada"))
            .await
            .unwrap_err();

        assert_eq!(err, DbError::InsertFailed);
    }

    #[tokio::test]
    async fn test_insert_driver_failure() {
        let pool = FakePool::new().fail_on("INSERT");
        let model = Model::new(Client::pool(&pool), "users").unwrap();

        let err = model.insert_one(Payload::new()).await.unwrap_err();

        assert_eq!(err, DbError::InsertFailed);
    }

    #[tokio::test]
    async fn test_update_binds_sets_and_inlines_id() {
        let pool = FakePool::new().respond("UPDATE", QueryResult::affected(1));
        let model = Model::new(Client::pool(&pool), "users").unwrap();

        model
            .update_one("u1", Payload::new().with("name", "Ada").with("age", 36))
            .await
            .unwrap();

        let sent = &pool.statements()[0];
        assert_eq!(
            sent.text,
            "UPDATE users SET name = $1, age = $2 WHERE (id = 'u1')"
        );
        assert_eq!(sent.values, vec![SqlValue::from("Ada"), SqlValue::from(36)]);
    }

    #[tokio::test]
    async fn test_update_zero_rows_fails_but_delete_succeeds() {
        let pool = FakePool::new();
        let model = Model::new(Client::pool(&pool), "users").unwrap();

        let err = model
            .update_one("gone", Payload::new().with("name", "x"))
            .await
            .unwrap_err();
        assert_eq!(err, DbError::UpdateFailed);

        model.delete_one_by_id("gone").await.unwrap();
        assert_eq!(pool.log()[1], "DELETE FROM users WHERE (id = 'gone')");
    }

    #[tokio::test]
    async fn test_update_empty_payload_is_invalid_input() {
        let pool = FakePool::new();
        let model = Model::new(Client::pool(&pool), "users").unwrap();

        let err = model.update_one("u1", Payload::new()).await.unwrap_err();

        assert!(matches!(err, DbError::InvalidInput(_)));
        assert!(pool.log().is_empty());
    }

    #[tokio::test]
    async fn test_delete_driver_failure() {
        let pool = FakePool::new().fail_on("DELETE");
        let model = Model::new(Client::pool(&pool), "users").unwrap();

        let err = model
            .delete_one(&Filter::eq("name", "x"))
            .await
            .unwrap_err();

        assert_eq!(err, DbError::QueryFailed);
    }

    #[tokio::test]
    async fn test_single_connection_model() {
        let connection = FakeConnection::standalone();
        let model = Model::new(Client::connection(&connection), "users").unwrap();

        model
            .get_many(&Filter::Empty, SelectOptions::default())
            .await
            .unwrap();
        let err = model.run_transactions(["SELECT 1"]).await.unwrap_err();

        assert_eq!(err, DbError::InvalidClient);
        assert_eq!(connection.log().len(), 1);
    }

    #[tokio::test]
    async fn test_model_runs_transactions_on_pool() {
        let pool = FakePool::new();
        let model = Model::new(Client::pool(&pool), "users").unwrap();

        let results = model
            .run_transactions(["DELETE FROM users WHERE (id = 'a')"])
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(pool.releases(), 1);
    }
}
