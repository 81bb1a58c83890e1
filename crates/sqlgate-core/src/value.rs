//! # Scalar Values
//!
//! The value type carried by filters, payloads and bound parameters.
//!
//! ## Where Values Go
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SqlValue Routing                                │
//! │                                                                         │
//! │  Filter leaf (WHERE a = ?)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  literal::encode() ──► inlined into SQL text  ('abc', 42, NULL)        │
//! │                                                                         │
//! │  Payload field (INSERT / UPDATE SET)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  params::bind_*() ──► $1, $2 ... + values sent beside the text         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row returned by the driver: column name → JSON value, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A single SQL scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    /// Structured value bound or inlined as JSON text.
    Json(serde_json::Value),
}

impl SqlValue {
    /// Returns true for [`SqlValue::Null`].
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Converts a JSON value into a scalar.
    ///
    /// Integers that fit in `i64` become [`SqlValue::Int`], other numbers
    /// become [`SqlValue::Float`]. Arrays and objects are kept as
    /// [`SqlValue::Json`].
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int(i),
                None => SqlValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => SqlValue::Json(value.clone()),
        }
    }

    /// Converts the scalar back into JSON (used when comparing rows to payloads).
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::Int(i) => Value::from(*i),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Text(s) => Value::String(s.clone()),
            SqlValue::Uuid(u) => Value::String(u.to_string()),
            SqlValue::Timestamp(t) => Value::String(t.to_rfc3339()),
            SqlValue::Json(v) => v.clone(),
        }
    }
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Text(s) => write!(f, "{}", s),
            SqlValue::Uuid(u) => write!(f, "{}", u),
            SqlValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            SqlValue::Json(v) => write!(f, "{}", v),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for SqlValue {
                fn from(v: $t) -> Self {
                    SqlValue::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        SqlValue::Float(f64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        SqlValue::from_json(&v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
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
    fn test_from_json_scalars() {
        assert_eq!(SqlValue::from_json(&json!(null)), SqlValue::Null);
        assert_eq!(SqlValue::from_json(&json!(true)), SqlValue::Bool(true));
        assert_eq!(SqlValue::from_json(&json!(42)), SqlValue::Int(42));
        assert_eq!(SqlValue::from_json(&json!(1.5)), SqlValue::Float(1.5));
        assert_eq!(
            SqlValue::from_json(&json!("coke")),
            SqlValue::Text("coke".to_string())
        );
    }

    #[test]
    fn test_from_json_keeps_structures() {
        let value = json!({"tags": ["a", "b"]});
        assert_eq!(SqlValue::from_json(&value), SqlValue::Json(value.clone()));
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<i32> = None;
        assert!(SqlValue::from(none).is_null());
        assert_eq!(SqlValue::from(Some(7)), SqlValue::Int(7));
    }

    #[test]
    fn test_to_json() {
        let id = Uuid::nil();
        assert_eq!(
            SqlValue::from(id).to_json(),
            json!("00000000-0000-0000-0000-000000000000")
        );
        assert_eq!(SqlValue::Int(3).to_json(), json!(3));
        assert_eq!(SqlValue::Float(f64::NAN).to_json(), json!(null));
    }
}
