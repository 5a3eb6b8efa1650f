//! Loosely typed records.

use crate::key::RecordKey;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of a table: an opaque key plus named fields.
///
/// The store and the tree engine address fields by name only; which
/// names carry tree semantics is decided by the engine's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    key: RecordKey,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record with a fresh random key.
    #[must_use]
    pub fn new() -> Self {
        Self::with_key(RecordKey::new())
    }

    /// Creates an empty record with the given key.
    #[must_use]
    pub fn with_key(key: RecordKey) -> Self {
        Self {
            key,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_field(name, value);
        self
    }

    /// Returns the record key.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        self.key
    }

    /// Returns a field value, if present.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sets a field value.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Removes a field, returning its previous value.
    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Returns a text field, treating anything else as absent.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get_field(name).and_then(Value::as_text)
    }

    /// Returns an integer field, treating anything else as absent.
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get_field(name).and_then(Value::as_int)
    }

    /// Returns a boolean field, treating anything else as absent.
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.get_field(name).and_then(Value::as_bool)
    }

    /// Iterates over all fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}
