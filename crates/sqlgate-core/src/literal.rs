//! # Literal Encoder
//!
//! Turns a [`SqlValue`] into SQL literal text for inlining into filter
//! expressions.
//!
//! ## Encoding Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       encode(value)                                     │
//! │                                                                         │
//! │  Null / Text("NULL")        ──► NULL                                   │
//! │  Text("%coke%")             ──► '%coke%'        (wildcard passthrough) │
//! │  Text("O'Brien")            ──► 'O''Brien'                             │
//! │  Text("C:\tmp")             ──►  E'C:\\tmp'                            │
//! │  Bool / Int / Float         ──► true, 42, 1.5                          │
//! │  Uuid / Timestamp / Json    ──► quoted text form                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wildcard Passthrough
//! Text that starts and ends with `%` is meant for `LIKE` patterns and is
//! wrapped in quotes WITHOUT escaping. This is a limited-trust path: only
//! hand it patterns built by the application, never raw user input. Use
//! [`encode_strict`] when the pattern comes from outside.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::value::SqlValue;

/// Matches `%...%` on a single line, the shape of a LIKE wildcard literal.
static WILDCARD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^%.*%$").expect("valid regex"));

/// The literal text for SQL NULL.
pub const NULL_LITERAL: &str = "NULL";

/// Encodes a value as SQL literal text.
///
/// See the module docs for the wildcard passthrough.
pub fn encode(value: &SqlValue) -> String {
    match value {
        SqlValue::Text(s) if s == NULL_LITERAL => NULL_LITERAL.to_string(),
        SqlValue::Text(s) if is_wildcard(s) => format!("'{}'", s),
        other => encode_strict(other),
    }
}

/// Encodes a value as SQL literal text, always escaping text.
///
/// Unlike [`encode`], `%...%` text is escaped like any other string.
pub fn encode_strict(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => NULL_LITERAL.to_string(),
        SqlValue::Bool(b) => b.to_string(),
        SqlValue::Int(i) => i.to_string(),
        SqlValue::Float(f) => encode_float(*f),
        SqlValue::Text(s) => quote_text(s),
        SqlValue::Uuid(u) => quote_text(&u.to_string()),
        SqlValue::Timestamp(t) => quote_text(&t.to_rfc3339()),
        SqlValue::Json(v) => quote_text(&v.to_string()),
    }
}

/// Returns true when `text` takes the unescaped wildcard path in [`encode`].
#[inline]
pub fn is_wildcard(text: &str) -> bool {
    WILDCARD_RE.is_match(text)
}

/// Quotes text as a PostgreSQL string literal.
///
/// Single quotes are doubled. When a backslash is present the literal uses
/// the escape-string form (` E'...'`) with backslashes doubled, so the
/// result is correct whatever `standard_conforming_strings` is set to.
fn quote_text(text: &str) -> String {
    let mut has_backslash = false;
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');

    for c in text.chars() {
        match c {
            '\'' => quoted.push_str("''"),
            '\\' => {
                quoted.push_str("\\\\");
                has_backslash = true;
            }
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');

    if has_backslash {
        format!(" E{}", quoted)
    } else {
        quoted
    }
}

fn encode_float(f: f64) -> String {
    if f.is_nan() {
        "'NaN'".to_string()
    } else if f.is_infinite() {
        if f.is_sign_positive() {
            "'Infinity'".to_string()
        } else {
            "'-Infinity'".to_string()
        }
    } else {
        f.to_string()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
