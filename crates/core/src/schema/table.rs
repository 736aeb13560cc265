//! Table schema: an ordered list of field rules.

use super::rule::FieldRule;
use crate::error::{Error, Result};
use crate::record::Record;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Validation rules for a table, in declaration order.
///
/// Rules are checked in declaration order and the first failure is reported.
/// Fields not named by the schema are accepted as-is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    fields: Vec<(String, FieldRule)>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field rule, replacing any earlier rule for the same field.
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = rule,
            None => self.fields.push((name, rule)),
        }
        self
    }

    /// Returns the rule for a field.
    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// Iterates rules in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Names of fields covered by auto-indexing, in declaration order.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, r)| r.is_indexed())
            .map(|(n, _)| n.as_str())
    }

    /// Returns the number of rules.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the schema has no rules.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validates a whole record.
    pub fn validate(&self, record: &Record) -> Result<()> {
        for (name, rule) in &self.fields {
            rule.check(record.value(name))
                .map_err(|failure| Error::validation(name.as_str(), failure))?;
        }
        Ok(())
    }

    /// Validates records in order, stopping at the first failure.
    pub fn validate_all<'a>(&self, records: impl IntoIterator<Item = &'a Record>) -> Result<()> {
        records.into_iter().try_for_each(|r| self.validate(r))
    }

    /// Validates only the fields present in `patch`.
    ///
    /// Used for partial updates: `required` is enforced only for fields the
    /// patch sets (setting a required field to null fails).
    pub fn validate_fields(&self, patch: &Record) -> Result<()> {
        for (name, rule) in &self.fields {
            if let Some(value) = patch.get(name) {
                rule.check(value)
                    .map_err(|failure| Error::validation(name.as_str(), failure))?;
            }
        }
        Ok(())
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, rule) in &self.fields {
            map.serialize_entry(name, rule)?;
        }
        map.end()
    }
}

struct SchemaVisitor;

impl<'de> Visitor<'de> for SchemaVisitor {
    type Value = Schema;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of field name to rule")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> core::result::Result<Schema, A::Error> {
        let mut schema = Schema::new();
        while let Some((name, rule)) = access.next_entry::<String, FieldRule>()? {
            schema = schema.field(name, rule);
        }
        Ok(schema)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        deserializer.deserialize_map(SchemaVisitor)
    }
}

/// Validates a record against a schema.
pub fn validate(record: &Record, schema: &Schema) -> Result<()> {
    schema.validate(record)
}

/// Validates a sequence of records against a schema.
pub fn validate_all<'a>(records: impl IntoIterator<Item = &'a Record>, schema: &Schema) -> Result<()> {
    schema.validate_all(records)
}
