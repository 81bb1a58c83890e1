//! # Statement Builder
//!
//! Composes SELECT / INSERT / UPDATE / DELETE text from a table name and the
//! filter, join and parameter compilers.
//!
//! ## Statement Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  select      SELECT {columns} FROM {table} {joins} WHERE {filter}      │
//! │  select_one  SELECT {columns} FROM {table} {joins}WHERE {filter} LIMIT 1│
//! │  insert      INSERT INTO {table}({fields}) VALUES ($1, $2, ...)        │
//! │  update      UPDATE {table} SET a = $1, b = $2 WHERE {filter}          │
//! │  delete      DELETE FROM {table} WHERE {filter}                        │
//! │                                                                         │
//! │  Filters are inlined as encoded literals.                              │
//! │  Payload values are sent beside the text as positional parameters.    │
//! │  An empty filter drops the WHERE keyword entirely.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use crate::error::CoreResult;
use crate::filter::{where_clause, Filter};
use crate::join::{compile_join, Join};
use crate::params::{bind_assignments, bind_parameters};
use crate::payload::Payload;
use crate::value::SqlValue;

/// Default column list for SELECT.
pub const SELECT_ALL: &str = "*";

/// SQL text plus the values for its positional placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub text: String,
    pub values: Vec<SqlValue>,
}

impl Statement {
    /// A statement with no bound values.
    pub fn new(text: impl Into<String>) -> Self {
        Statement {
            text: text.into(),
            values: Vec::new(),
        }
    }

    pub fn with_values(text: impl Into<String>, values: Vec<SqlValue>) -> Self {
        Statement {
            text: text.into(),
            values,
        }
    }

    pub fn has_values(&self) -> bool {
        !self.values.is_empty()
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Statement {
    fn from(text: &str) -> Self {
        Statement::new(text)
    }
}

impl From<String> for Statement {
    fn from(text: String) -> Self {
        Statement::new(text)
    }
}

fn where_part(filter: &Filter) -> String {
    where_clause(filter)
        .map(|clause| format!("WHERE {}", clause))
        .unwrap_or_default()
}

/// `SELECT {columns} FROM {table} {joins} {where}`
pub fn select(table: &str, columns: &str, joins: &[Join], filter: &Filter) -> Statement {
    Statement::new(format!(
        "SELECT {} FROM {} {} {}",
        columns,
        table,
        compile_join(joins).unwrap_or_default(),
        where_part(filter)
    ))
}

/// Like [`select`], limited to one row.
pub fn select_one(table: &str, columns: &str, joins: &[Join], filter: &Filter) -> Statement {
    Statement::new(format!(
        "SELECT {} FROM {} {}{} LIMIT 1",
        columns,
        table,
        compile_join(joins).unwrap_or_default(),
        where_part(filter)
    ))
}

/// `INSERT INTO {table}({fields}) VALUES ({placeholders})`
pub fn insert(table: &str, payload: &Payload) -> CoreResult<Statement> {
    let bound = bind_parameters(payload)?;

    Ok(Statement::with_values(
        format!(
            "INSERT INTO {}({}) VALUES ({})",
            table, bound.fields, bound.placeholders
        ),
        bound.values,
    ))
}

/// `UPDATE {table} SET {sets} {where}`
pub fn update(table: &str, payload: &Payload, filter: &Filter) -> CoreResult<Statement> {
    let bound = bind_assignments(payload)?;

    Ok(Statement::with_values(
        format!("UPDATE {} SET {} {}", table, bound.sets, where_part(filter)),
        bound.values,
    ))
}

/// `DELETE FROM {table} {where}`
pub fn delete(table: &str, filter: &Filter) -> Statement {
    Statement::new(format!("DELETE FROM {} {}", table, where_part(filter)))
}

// =============================================================================
// Unit Tests
// =============================================================================
