//! # Join Compiler
//!
//! Translates join descriptors into JOIN clause text.
//!
//! ```text
//! Raw("LEFT JOIN t ON t.a = b.a")        ──►  " LEFT JOIN t ON t.a = b.a "
//! On { Inner, "items i", "i.sale_id = s.id" }
//!                                         ──►  " INNER JOIN items i ON i.sale_id = s.id "
//! [join1, join2]                          ──►  join1 + join2   (in order)
//! []                                      ──►  None            (no JOIN clause)
//! ```
//!
//! Table names and conditions are trusted SQL, like [`Filter::Raw`](crate::Filter::Raw).

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// The kind of a structured join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Left,
    Right,
    Inner,
    FullOuter,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Inner => "INNER",
            JoinKind::FullOuter => "FULL OUTER",
        }
    }
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl std::str::FromStr for JoinKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split(|c: char| c.is_whitespace() || c == '_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        match normalized.to_lowercase().as_str() {
            "left" => Ok(JoinKind::Left),
            "right" => Ok(JoinKind::Right),
            "inner" => Ok(JoinKind::Inner),
            "full outer" | "full" => Ok(JoinKind::FullOuter),
            other => Err(CoreError::InvalidJoin(format!("Unknown join type: '{}'", other))),
        }
    }
}

/// A single join descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Join {
    /// A pre-formed join clause.
    Raw(String),

    /// `{kind} JOIN {table} ON {condition}`
    On {
        kind: JoinKind,
        table: String,
        condition: String,
    },
}

impl Join {
    pub fn raw(sql: impl Into<String>) -> Self {
        Join::Raw(sql.into())
    }

    pub fn left(table: impl Into<String>, condition: impl Into<String>) -> Self {
        Join::on(JoinKind::Left, table, condition)
    }

    pub fn right(table: impl Into<String>, condition: impl Into<String>) -> Self {
        Join::on(JoinKind::Right, table, condition)
    }

    pub fn inner(table: impl Into<String>, condition: impl Into<String>) -> Self {
        Join::on(JoinKind::Inner, table, condition)
    }

    pub fn full_outer(table: impl Into<String>, condition: impl Into<String>) -> Self {
        Join::on(JoinKind::FullOuter, table, condition)
    }

    pub fn on(kind: JoinKind, table: impl Into<String>, condition: impl Into<String>) -> Self {
        Join::On {
            kind,
            table: table.into(),
            condition: condition.into(),
        }
    }

    /// Compiles this descriptor, padded with a space on each side.
    pub fn compile(&self) -> String {
        match self {
            Join::Raw(sql) => format!(" {} ", sql),
            Join::On {
                kind,
                table,
                condition,
            } => format!(" {} JOIN {} ON {} ", kind, table, condition),
        }
    }

    /// Parses a JSON join descriptor: a string, or
    /// `{ "type": "left", "table": "...", "condition": "..." }`.
    pub fn from_json(value: &serde_json::Value) -> CoreResult<Self> {
        use serde_json::Value;

        match value {
            Value::String(sql) => Ok(Join::Raw(sql.clone())),
            Value::Object(record) => {
                let field = |name: &str| {
                    record
                        .get(name)
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            CoreError::InvalidJoin(format!("join descriptor has no '{}'", name))
                        })
                };

                Ok(Join::On {
                    kind: field("type")?.parse()?,
                    table: field("table")?.to_string(),
                    condition: field("condition")?.to_string(),
                })
            }
            other => Err(CoreError::InvalidJoin(format!(
                "unsupported join descriptor: {}",
                other
            ))),
        }
    }
}

/// Compiles a sequence of joins, in order.
///
/// Returns `None` for an empty sequence; callers then leave out the clause.
pub fn compile_join(joins: &[Join]) -> Option<String> {
    if joins.is_empty() {
        return None;
    }

    Some(joins.iter().map(Join::compile).collect())
}

/// Parses a JSON join description: a single descriptor or an array of them.
pub fn joins_from_json(value: &serde_json::Value) -> CoreResult<Vec<Join>> {
    match value {
        serde_json::Value::Array(items) => items.iter().map(Join::from_json).collect(),
        single => Join::from_json(single).map(|join| vec![join]),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_join_is_padded() {
        assert_eq!(
            Join::raw("LEFT JOIN items ON items.sale_id = sales.id").compile(),
            " LEFT JOIN items ON items.sale_id = sales.id "
        );
    }

    #[test]
    fn test_structured_join() {
        assert_eq!(
            Join::full_outer("payments p", "p.sale_id = s.id").compile(),
            " FULL OUTER JOIN payments p ON p.sale_id = s.id "
        );
    }

    #[test]
    fn test_sequence_is_concatenated_in_order() {
        let joins = vec![
            Join::inner("a", "a.id = t.a_id"),
            Join::raw("LEFT JOIN b ON b.id = t.b_id"),
        ];
        assert_eq!(
            compile_join(&joins).unwrap(),
            " INNER JOIN a ON a.id = t.a_id  LEFT JOIN b ON b.id = t.b_id "
        );
    }

    #[test]
    fn test_empty_sequence_is_no_join() {
        assert_eq!(compile_join(&[]), None);
    }

    #[test]
    fn test_from_json() {
        let joins = joins_from_json(&json!([
            {"type": "left", "table": "items", "condition": "items.id = t.item_id"},
            "RIGHT JOIN x ON x.id = t.x_id"
        ]))
        .unwrap();
        assert_eq!(joins[0], Join::left("items", "items.id = t.item_id"));
        assert_eq!(joins[1], Join::raw("RIGHT JOIN x ON x.id = t.x_id"));

        let single = joins_from_json(&json!({
            "type": "full outer", "table": "p", "condition": "p.id = t.p_id"
        }))
        .unwrap();
        assert_eq!(single, vec![Join::full_outer("p", "p.id = t.p_id")]);
    }

    #[test]
    fn test_from_json_rejects_unsupported_shapes() {
        assert!(joins_from_json(&json!(5)).is_err());
        assert!(joins_from_json(&json!({"type": "cross", "table": "a", "condition": "1=1"})).is_err());
        assert!(joins_from_json(&json!({"type": "left", "table": "a"})).is_err());
    }

    #[test]
    fn test_join_kind_parsing() {
        assert_eq!("FULL_OUTER".parse::<JoinKind>().unwrap(), JoinKind::FullOuter);
        assert_eq!("Inner".parse::<JoinKind>().unwrap(), JoinKind::Inner);
    }
}
