//! Serializable whole-store snapshots.
//!
//! The on-disk and backup shape is `{ "<table>": { rows, schema, metadata } }`.

use crate::relationship::Relationship;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabula_core::schema::Schema;
use tabula_core::Record;

/// Non-record table state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Fields with a secondary index.
    #[serde(default)]
    pub indexes: Vec<String>,
}

/// One table: records in insertion order plus schema and metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub rows: Vec<Record>,
    #[serde(default)]
    pub schema: Option<Schema>,
    #[serde(default)]
    pub metadata: TableMetadata,
}

/// Every table by name.
pub type DatabaseSnapshot = BTreeMap<String, TableSnapshot>;
