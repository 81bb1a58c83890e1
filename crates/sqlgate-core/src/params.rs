//! # Parameter Binder
//!
//! Flattens a [`Payload`] into positional placeholders plus a parallel
//! values sequence. Values travel beside the SQL text instead of inside it.
//!
//! ## Two Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Payload { name: "coke", price: 199 }                                  │
//! │                                                                         │
//! │  bind_parameters  (INSERT)                                             │
//! │    fields       = "name, price"                                        │
//! │    placeholders = "$1, $2"                                             │
//! │    values       = ["coke", 199]                                        │
//! │                                                                         │
//! │  bind_assignments (UPDATE ... SET)                                     │
//! │    sets         = "name = $1, price = $2"                              │
//! │    values       = ["coke", 199]                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::payload::Payload;
use crate::value::SqlValue;

/// Column list, placeholders and values for an INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParams {
    /// `"a, b, c"`
    pub fields: String,
    /// `"$1, $2, $3"`
    pub placeholders: String,
    /// Values aligned with the placeholders.
    pub values: Vec<SqlValue>,
}

/// SET list and values for an UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundAssignments {
    /// `"a = $1, b = $2"`
    pub sets: String,
    /// Values aligned with the placeholders.
    pub values: Vec<SqlValue>,
}

/// Positional placeholder for a 1-based index, e.g. `$3`.
#[inline]
pub fn placeholder(index: usize) -> String {
    format!("${}", index)
}

/// Binds a payload for an INSERT.
pub fn bind_parameters(payload: &Payload) -> CoreResult<BoundParams> {
    if payload.is_empty() {
        return Err(CoreError::EmptyPayload { statement: "INSERT" });
    }

    let mut fields = Vec::with_capacity(payload.len());
    let mut placeholders = Vec::with_capacity(payload.len());
    let mut values = Vec::with_capacity(payload.len());

    for (index, (field, value)) in payload.iter().enumerate() {
        fields.push(field);
        placeholders.push(placeholder(index + 1));
        values.push(value.clone());
    }

    Ok(BoundParams {
        fields: fields.join(", "),
        placeholders: placeholders.join(", "),
        values,
    })
}

/// Binds a payload for an UPDATE SET clause.
pub fn bind_assignments(payload: &Payload) -> CoreResult<BoundAssignments> {
    if payload.is_empty() {
        return Err(CoreError::EmptyPayload { statement: "UPDATE" });
    }

    let sets: Vec<String> = payload
        .iter()
        .enumerate()
        .map(|(index, (field, _))| format!("{} = {}", field, placeholder(index + 1)))
        .collect();

    Ok(BoundAssignments {
        sets: sets.join(", "),
        values: payload.iter().map(|(_, value)| value.clone()).collect(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
