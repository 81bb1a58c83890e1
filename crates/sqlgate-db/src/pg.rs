//! # PostgreSQL Driver
//!
//! Implements the driver capability traits on top of sqlx.
//!
//! ## Statement Dispatch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Statement → sqlx                                    │
//! │                                                                         │
//! │  Statement { text, values }                                             │
//! │       │                                                                 │
//! │       ├── values empty ──► sqlx::query(text), not cached               │
//! │       │                    BEGIN / COMMIT / literal-only statements     │
//! │       │                                                                 │
//! │       └── values present ─► sqlx::query(text).bind($1).bind($2)...      │
//! │                                                                         │
//! │  fetch_many ─► Either::Right(row)   ─► decoded into a JSON map         │
//! │             └► Either::Left(done)   ─► rows_affected (command tag)     │
//! │                                                                         │
//! │  QueryResult { rows, row_count = max(rows_affected, rows.len()) }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Whether a statement returns rows is never guessed from its text. An
//! `INSERT` reports its affected count even when a table or literal
//! contains the word `returning`.
//!
//! ## Value Binding
//! | SqlValue    | Bound as                     |
//! |-------------|------------------------------|
//! | Null        | untyped NULL (server infers) |
//! | Bool        | BOOL                         |
//! | Int         | INT8                         |
//! | Float       | FLOAT8                       |
//! | Text        | TEXT                         |
//! | Uuid        | UUID                         |
//! | Timestamp   | TIMESTAMPTZ                  |
//! | Json        | JSONB                        |
//!
//! NUMERIC columns decode to their exact text form. Column types outside
//! the decoder's table fail the statement with `DriverError::Decode`.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlgate_core::{Row, SqlValue, Statement};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::pool::PoolConnection;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{
    PgArgumentBuffer, PgArguments, PgConnection, PgPool, PgRow, PgTypeInfo, Postgres,
};
use sqlx::query::Query;
use sqlx::{Column, Connection, Either, Executor, Row as _, TypeInfo, ValueRef};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::driver::{ConnectionPool, DriverError, PooledConnection, QueryResult, Queryable};

// =============================================================================
// Binding
// =============================================================================

/// A NULL parameter with an unspecified type, so the server infers it from
/// the column it is assigned to.
struct UntypedNull;

impl sqlx::Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl<'q> sqlx::Encode<'q, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    values: &'q [SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for value in values {
        query = match value {
            SqlValue::Null => query.bind(UntypedNull),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Uuid(u) => query.bind(*u),
            SqlValue::Timestamp(t) => query.bind(*t),
            SqlValue::Json(v) => query.bind(sqlx::types::Json(v)),
        };
    }
    query
}

// =============================================================================
// Execution
// =============================================================================

/// What the server sent back for one statement.
#[derive(Debug, Default)]
struct Outcome {
    rows: Vec<Row>,
    rows_affected: u64,
}

impl Outcome {
    /// A CommandComplete message. SELECT reports its row count here too.
    fn command_complete(&mut self, rows_affected: u64) {
        self.rows_affected += rows_affected;
    }

    fn row(&mut self, row: Row) {
        self.rows.push(row);
    }

    fn finish(self) -> QueryResult {
        let row_count = self.rows_affected.max(self.rows.len() as u64);
        QueryResult {
            rows: self.rows,
            row_count,
        }
    }
}

async fn run_on<'c, E>(executor: E, statement: &Statement) -> Result<QueryResult, DriverError>
where
    E: Executor<'c, Database = Postgres>,
{
    debug!(
        query = %statement.text,
        params = statement.values.len(),
        "Executing statement"
    );

    let query = bind_values(sqlx::query(&statement.text), &statement.values)
        .persistent(statement.has_values());

    let mut outcome = Outcome::default();
    let mut stream = executor.fetch_many(query);
    while let Some(item) = stream.try_next().await? {
        match item {
            Either::Left(done) => outcome.command_complete(done.rows_affected()),
            Either::Right(row) => outcome.row(decode_row(&row)?),
        }
    }

    Ok(outcome.finish())
}

// =============================================================================
// Row Decoding
// =============================================================================

/// Column types the decoder understands, keyed by PostgreSQL type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    Uuid,
    Json,
    TimestampTz,
    Timestamp,
    Date,
    Time,
}

impl ColumnKind {
    fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name {
            "BOOL" => ColumnKind::Bool,
            "INT2" => ColumnKind::Int2,
            "INT4" => ColumnKind::Int4,
            "INT8" => ColumnKind::Int8,
            "FLOAT4" => ColumnKind::Float4,
            "FLOAT8" => ColumnKind::Float8,
            "NUMERIC" => ColumnKind::Numeric,
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => ColumnKind::Text,
            "UUID" => ColumnKind::Uuid,
            "JSON" | "JSONB" => ColumnKind::Json,
            "TIMESTAMPTZ" => ColumnKind::TimestampTz,
            "TIMESTAMP" => ColumnKind::Timestamp,
            "DATE" => ColumnKind::Date,
            "TIME" => ColumnKind::Time,
            _ => return None,
        };
        Some(kind)
    }
}

fn unsupported_column(column: &str, type_name: &str) -> DriverError {
    DriverError::Decode(format!(
        "column '{}' has unsupported type {}",
        column, type_name
    ))
}

fn decode_row(row: &PgRow) -> Result<Row, DriverError> {
    let mut map = Row::new();

    for (index, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), decode_column(row, index, column.name())?);
    }

    Ok(map)
}

fn decode_column(row: &PgRow, index: usize, name: &str) -> Result<Value, DriverError> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_name = raw.type_info().name().to_string();
    let kind = ColumnKind::from_type_name(&type_name).ok_or_else(|| {
        warn!(column = name, type_name = %type_name, "Unsupported column type");
        unsupported_column(name, &type_name)
    })?;

    let value = match kind {
        ColumnKind::Bool => Value::from(row.try_get::<bool, _>(index)?),
        ColumnKind::Int2 => Value::from(row.try_get::<i16, _>(index)?),
        ColumnKind::Int4 => Value::from(row.try_get::<i32, _>(index)?),
        ColumnKind::Int8 => Value::from(row.try_get::<i64, _>(index)?),
        ColumnKind::Float4 => Value::from(row.try_get::<f32, _>(index)?),
        ColumnKind::Float8 => Value::from(row.try_get::<f64, _>(index)?),
        // Text form, so no precision is lost
        ColumnKind::Numeric => Value::from(row.try_get::<Decimal, _>(index)?.to_string()),
        ColumnKind::Text => Value::from(row.try_get::<String, _>(index)?),
        ColumnKind::Uuid => Value::from(row.try_get::<uuid::Uuid, _>(index)?.to_string()),
        ColumnKind::Json => row.try_get::<Value, _>(index)?,
        ColumnKind::TimestampTz => Value::from(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)?
                .to_rfc3339(),
        ),
        ColumnKind::Timestamp => Value::from(
            row.try_get::<chrono::NaiveDateTime, _>(index)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        ColumnKind::Date => Value::from(row.try_get::<chrono::NaiveDate, _>(index)?.to_string()),
        ColumnKind::Time => Value::from(row.try_get::<chrono::NaiveTime, _>(index)?.to_string()),
    };

    Ok(value)
}

// =============================================================================
// Pool
// =============================================================================

#[async_trait]
impl Queryable for PgPool {
    async fn query(&self, statement: &Statement) -> Result<QueryResult, DriverError> {
        run_on(self, statement).await
    }
}

#[async_trait]
impl ConnectionPool for PgPool {
    async fn acquire(&self) -> Result<Box<dyn PooledConnection>, DriverError> {
        let conn = sqlx::Pool::acquire(self).await?;
        debug!(size = self.size(), idle = self.num_idle(), "Connection acquired");

        Ok(Box::new(PgPooledConnection {
            conn: Mutex::new(conn),
        }))
    }

    fn is_open(&self) -> bool {
        !self.is_closed()
    }
}

/// A connection checked out of a [`PgPool`].
///
/// `release` returns it to the pool. `discard` closes it instead, so a
/// connection left inside an open or failed transaction is never reused.
pub struct PgPooledConnection {
    conn: Mutex<PoolConnection<Postgres>>,
}

#[async_trait]
impl Queryable for PgPooledConnection {
    async fn query(&self, statement: &Statement) -> Result<QueryResult, DriverError> {
        let mut conn = self.conn.lock().await;
        run_on(&mut **conn, statement).await
    }
}

impl PooledConnection for PgPooledConnection {
    fn release(self: Box<Self>) {
        drop(self.conn.into_inner());
    }

    fn discard(self: Box<Self>) {
        let mut conn = self.conn.into_inner();
        conn.close_on_drop();
        debug!("Pooled connection closed instead of returned");
    }
}

// =============================================================================
// Single Connection
// =============================================================================

/// One dedicated PostgreSQL connection, outside any pool.
///
/// Bind it with `Client::connection`. Transactions are refused on it.
pub struct PgConnectionClient {
    conn: Mutex<PgConnection>,
}

impl PgConnectionClient {
    /// Opens a connection to `url`.
    pub async fn connect(url: &str) -> Result<Self, DriverError> {
        let conn = PgConnection::connect(url).await?;
        Ok(PgConnectionClient::from(conn))
    }

    /// Closes the connection cleanly.
    pub async fn close(self) -> Result<(), DriverError> {
        self.conn.into_inner().close().await?;
        Ok(())
    }
}

impl From<PgConnection> for PgConnectionClient {
    fn from(conn: PgConnection) -> Self {
        PgConnectionClient {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Queryable for PgConnectionClient {
    async fn query(&self, statement: &Statement) -> Result<QueryResult, DriverError> {
        let mut conn = self.conn.lock().await;
        run_on(&mut *conn, statement).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
