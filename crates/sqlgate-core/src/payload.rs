//! # Payload
//!
//! An ordered field → value map for INSERT and UPDATE statements.
//!
//! Keys are unique. Re-inserting a key replaces its value in place, so the
//! position (and therefore the `$n` placeholder) of a field never moves.

use crate::error::{CoreError, CoreResult};
use crate::value::SqlValue;

/// Ordered, unique-keyed field map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    entries: Vec<(String, SqlValue)>,
}

impl Payload {
    pub fn new() -> Self {
        Payload::default()
    }

    /// Builder-style [`Payload::insert`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Sets `field`, returning the previous value if the field existed.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<SqlValue>) -> Option<SqlValue> {
        let field = field.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((field, value));
                None
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&SqlValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Builds a payload from a JSON object, in key order.
    pub fn from_json(value: &serde_json::Value) -> CoreResult<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(CoreError::InvalidPayload(format!(
                "expected an object, got {}",
                value
            )));
        };

        Ok(map
            .iter()
            .fold(Payload::new(), |payload, (field, value)| {
                payload.with(field.clone(), SqlValue::from_json(value))
            }))
    }
}

impl<K, V> FromIterator<(K, V)> for Payload
where
    K: Into<String>,
    V: Into<SqlValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Payload::new(), |payload, (field, value)| payload.with(field, value))
    }
}

impl IntoIterator for Payload {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<(String, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
