//! Record structure for Tabula.
//!
//! A `Record` is an open map from field name to `Value`. Tables address records
//! internally by `RowId`; the user-facing identity is the `id` field.

use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Internal identifier for a stored record. Monotonic per table, so ordering by
/// `RowId` is insertion order.
pub type RowId = u64;

/// Field holding the record identity.
pub const ID_FIELD: &str = "id";
/// Placeholder id that asks the store to generate one.
pub const AUTO_INCREMENT: &str = "AUTO_INCREMENT";
/// Creation timestamp field (timestamps mode).
pub const CREATED_AT: &str = "created_at";
/// Modification timestamp field (timestamps mode).
pub const UPDATED_AT: &str = "updated_at";
/// Logical deletion marker (soft-delete mode).
pub const DELETED_AT: &str = "deleted_at";

static NULL: Value = Value::Null;

/// A record in a table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from a JSON object.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        match Value::from(json) {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::invalid_input(format!(
                "record must be an object, got {}",
                other.type_name()
            ))),
        }
    }

    /// Adds a field and returns the record, for building records inline.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Gets a field if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Gets a field, reading a missing field as `Null`.
    pub fn value(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }

    /// Sets a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Returns true if the field is present (even when `Null`).
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns the record id, if one is set.
    pub fn id(&self) -> Option<&Value> {
        self.fields.get(ID_FIELD).filter(|v| !v.is_null())
    }

    /// Returns true when the store must generate an id for this record.
    pub fn needs_id(&self) -> bool {
        match self.fields.get(ID_FIELD) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s == AUTO_INCREMENT,
            Some(_) => false,
        }
    }

    /// Returns true if the record carries a deletion timestamp.
    pub fn is_soft_deleted(&self) -> bool {
        !self.value(DELETED_AT).is_null()
    }

    /// Shallow-merges `patch` into this record; patch fields win.
    pub fn merge(&mut self, patch: &Record) {
        for (k, v) in &patch.fields {
            self.fields.insert(k.clone(), v.clone());
        }
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the field names in name order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if this record has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consumes the record, returning the field map.
    pub fn into_fields(self) -> BTreeMap<String, Value> {
        self.fields
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.fields)
    }
}
