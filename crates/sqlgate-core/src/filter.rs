//! # Filter Compiler
//!
//! Recursively translates a [`Filter`] into a SQL boolean expression.
//!
//! ## Filter Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Filter → SQL                                      │
//! │                                                                         │
//! │  Fields  { a: 1, b: 2 }               ──► (a = 1 AND b = 2)            │
//! │  Fields  { a: { op: ">", value: 5 } } ──► (a > 5)                      │
//! │  Fields  { $or: [ {a:1}, {b:2} ] }    ──► ((a = 1) OR (b = 2))         │
//! │  Group   [ {a:1}, {b:2} ]             ──► ((a = 1) AND (b = 2))        │
//! │  Raw     "price > cost"               ──► price > cost   (verbatim)    │
//! │  Empty                                ──► ""             (no WHERE)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every leaf value goes through [`literal::encode`]. `Raw` fragments are
//! the caller's responsibility and are never escaped.
//!
//! ## Example
//! ```rust
//! use sqlgate_core::filter::{compile_filter, Filter, Operator};
//!
//! let filter = Filter::eq("status", "active").and_compare("stock", Operator::Gt, 0);
//! assert_eq!(compile_filter(&filter), "(status = 'active' AND stock > 0)");
//! ```

use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::literal;
use crate::value::SqlValue;

/// Key that introduces an AND composition in a JSON filter description.
pub const AND_KEY: &str = "$and";

/// Key that introduces an OR composition in a JSON filter description.
pub const OR_KEY: &str = "$or";

// =============================================================================
// Combinator
// =============================================================================

/// Boolean connective used to join sibling fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    /// The separator placed between fragments, e.g. `" AND "`.
    pub fn separator(&self) -> &'static str {
        match self {
            Combinator::And => " AND ",
            Combinator::Or => " OR ",
        }
    }
}

// =============================================================================
// Operator
// =============================================================================

/// Comparison operator of an operator record (`{ op, value }`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    Eq,
    /// `<>`
    Ne,
    /// `!=`
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    NotLike,
    NotILike,
    Is,
    IsNot,
}

impl Operator {
    /// SQL spelling of the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::ILike => "ILIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::NotILike => "NOT ILIKE",
            Operator::Is => "IS",
            Operator::IsNot => "IS NOT",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");

        match normalized.to_uppercase().as_str() {
            "=" | "==" => Ok(Operator::Eq),
            "<>" => Ok(Operator::Ne),
            "!=" => Ok(Operator::NotEq),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Gte),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Lte),
            "LIKE" => Ok(Operator::Like),
            "ILIKE" => Ok(Operator::ILike),
            "NOT LIKE" => Ok(Operator::NotLike),
            "NOT ILIKE" => Ok(Operator::NotILike),
            "IS" => Ok(Operator::Is),
            "IS NOT" => Ok(Operator::IsNot),
            _ => Err(CoreError::InvalidOperator(s.to_string())),
        }
    }
}

// =============================================================================
// Filter
// =============================================================================

/// One entry of a field map.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field = value`
    Eq { field: String, value: SqlValue },

    /// `field {op} value`; `op` defaults to `=` when absent.
    Compare {
        field: String,
        op: Option<Operator>,
        value: SqlValue,
    },

    /// `$and: [...]`
    And(Vec<Filter>),

    /// `$or: [...]`
    Or(Vec<Filter>),
}

/// A structured WHERE condition, before compilation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No condition at all.
    #[default]
    Empty,

    /// A field map: entries joined with the surrounding combinator.
    Fields(Vec<Condition>),

    /// A sequence: each element compiled on its own, joined with the
    /// surrounding combinator.
    Group(Vec<Filter>),

    /// Pre-formed SQL, passed through verbatim.
    Raw(String),
}

impl Filter {
    /// `field = value`
    pub fn eq(field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Filter::Fields(vec![Condition::Eq {
            field: field.into(),
            value: value.into(),
        }])
    }

    /// `id = value`
    pub fn by_id(id: impl Into<SqlValue>) -> Self {
        Filter::eq("id", id)
    }

    /// `field {op} value`
    pub fn compare(field: impl Into<String>, op: Operator, value: impl Into<SqlValue>) -> Self {
        Filter::Fields(vec![Condition::Compare {
            field: field.into(),
            op: Some(op),
            value: value.into(),
        }])
    }

    /// Pre-formed SQL fragment. Never escaped.
    pub fn raw(sql: impl Into<String>) -> Self {
        Filter::Raw(sql.into())
    }

    /// `$and: [filters...]`
    pub fn all_of(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Fields(vec![Condition::And(filters.into_iter().collect())])
    }

    /// `$or: [filters...]`
    pub fn any_of(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Fields(vec![Condition::Or(filters.into_iter().collect())])
    }

    /// Adds `field = value` to this filter with AND semantics.
    pub fn and_eq(self, field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.and_condition(Condition::Eq {
            field: field.into(),
            value: value.into(),
        })
    }

    /// Adds `field {op} value` to this filter with AND semantics.
    pub fn and_compare(
        self,
        field: impl Into<String>,
        op: Operator,
        value: impl Into<SqlValue>,
    ) -> Self {
        self.and_condition(Condition::Compare {
            field: field.into(),
            op: Some(op),
            value: value.into(),
        })
    }

    fn and_condition(self, condition: Condition) -> Self {
        match self {
            Filter::Empty => Filter::Fields(vec![condition]),
            Filter::Fields(mut conditions) => {
                conditions.push(condition);
                Filter::Fields(conditions)
            }
            other => Filter::Fields(vec![Condition::And(vec![
                other,
                Filter::Fields(vec![condition]),
            ])]),
        }
    }

    /// Returns true when the filter compiles to no condition.
    pub fn is_empty(&self) -> bool {
        where_clause(self).is_none()
    }

    /// Parses the dynamic JSON filter shape.
    ///
    /// ## Shapes
    /// - `null` → [`Filter::Empty`]
    /// - string → [`Filter::Raw`]
    /// - array → [`Filter::Group`]
    /// - object → [`Filter::Fields`], where each key maps to
    ///   - a scalar → equality (`null` → `IS NULL`)
    ///   - `$and` / `$or` with an array → composition
    ///   - `{ "op"?: string, "value"?: any }` → comparison (absent value is `NULL`)
    /// - anything else → [`Filter::Empty`]
    pub fn from_json(value: &serde_json::Value) -> CoreResult<Self> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(Filter::Empty),
            Value::String(s) => Ok(Filter::Raw(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Filter::from_json)
                .collect::<CoreResult<Vec<_>>>()
                .map(Filter::Group),
            Value::Object(map) => map
                .iter()
                .map(|(key, value)| condition_from_json(key, value))
                .collect::<CoreResult<Vec<_>>>()
                .map(Filter::Fields),
            Value::Bool(_) | Value::Number(_) => Ok(Filter::Empty),
        }
    }
}

impl TryFrom<&serde_json::Value> for Filter {
    type Error = CoreError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        Filter::from_json(value)
    }
}

fn condition_from_json(key: &str, value: &serde_json::Value) -> CoreResult<Condition> {
    use serde_json::Value;

    if key == AND_KEY || key == OR_KEY {
        let Value::Array(items) = value else {
            return Err(CoreError::InvalidFilter(format!(
                "{} expects an array of filters",
                key
            )));
        };
        let filters = items
            .iter()
            .map(Filter::from_json)
            .collect::<CoreResult<Vec<_>>>()?;

        return Ok(if key == AND_KEY {
            Condition::And(filters)
        } else {
            Condition::Or(filters)
        });
    }

    match value {
        Value::Null => Ok(Condition::Compare {
            field: key.to_string(),
            op: Some(Operator::Is),
            value: SqlValue::Null,
        }),
        Value::Object(record) => {
            let op = match record.get("op") {
                None | Some(Value::Null) => None,
                Some(Value::String(op)) => Some(op.parse::<Operator>()?),
                Some(other) => return Err(CoreError::InvalidOperator(other.to_string())),
            };
            // Absent value compares against NULL
            let value = record
                .get("value")
                .map(SqlValue::from_json)
                .unwrap_or(SqlValue::Null);

            Ok(Condition::Compare {
                field: key.to_string(),
                op,
                value,
            })
        }
        Value::Array(_) => Err(CoreError::InvalidFilter(format!(
            "field '{}' cannot be matched against an array",
            key
        ))),
        scalar => Ok(Condition::Eq {
            field: key.to_string(),
            value: SqlValue::from_json(scalar),
        }),
    }
}

// =============================================================================
// Compilation
// =============================================================================

/// Compiles a filter with the default `AND` combinator.
pub fn compile_filter(filter: &Filter) -> String {
    compile_with(filter, Combinator::And)
}

/// Compiles a filter, joining top-level siblings with `combinator`.
pub fn compile_with(filter: &Filter, combinator: Combinator) -> String {
    match filter {
        Filter::Empty => String::new(),
        Filter::Raw(sql) => sql.clone(),
        Filter::Group(items) => compile_group(items, combinator),
        Filter::Fields(conditions) => {
            // A lone composition is already parenthesized
            if let [composite @ (Condition::And(_) | Condition::Or(_))] = conditions.as_slice() {
                return compile_condition(composite);
            }

            let fragments = non_empty(conditions.iter().map(compile_condition));
            format!("({})", fragments.join(combinator.separator()))
        }
    }
}

/// Compiles a filter into the body of a WHERE clause.
///
/// Returns `None` when there is nothing to filter on (empty text or `()`),
/// in which case callers omit the WHERE keyword.
pub fn where_clause(filter: &Filter) -> Option<String> {
    let compiled = compile_filter(filter);

    if compiled.trim().is_empty() || compiled == "()" {
        None
    } else {
        Some(compiled)
    }
}

fn compile_group(items: &[Filter], combinator: Combinator) -> String {
    // Each element resets to AND internally
    let fragments = non_empty(items.iter().map(compile_filter));
    format!("({})", fragments.join(combinator.separator()))
}

/// Drops fragments that compiled to nothing (`""` or `()`).
fn non_empty(fragments: impl Iterator<Item = String>) -> Vec<String> {
    fragments
        .filter(|fragment| !fragment.trim().is_empty() && fragment != "()")
        .collect()
}

fn compile_condition(condition: &Condition) -> String {
    match condition {
        Condition::Eq { field, value } => format!("{} = {}", field, literal::encode(value)),
        Condition::Compare { field, op, value } => format!(
            "{} {} {}",
            field,
            op.unwrap_or_default(),
            literal::encode(value)
        ),
        Condition::And(items) => compile_group(items, Combinator::And),
        Condition::Or(items) => compile_group(items, Combinator::Or),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
