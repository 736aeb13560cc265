//! Table registry.
//!
//! `TableStore` owns every `RowStore` by name.

use crate::row_store::RowStore;
use crate::snapshot::DatabaseSnapshot;
use std::collections::BTreeMap;
use tabula_core::schema::Schema;
use tabula_core::{Error, Result};

/// All tables, by name.
#[derive(Clone, Debug, Default)]
pub struct TableStore {
    tables: BTreeMap<String, RowStore>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table.
    pub fn create_table(&mut self, name: &str, schema: Option<Schema>) -> Result<&mut RowStore> {
        if self.tables.contains_key(name) {
            return Err(Error::table_exists(name));
        }
        Ok(self
            .tables
            .entry(name.to_string())
            .or_insert_with(|| RowStore::with_schema(name, schema)))
    }

    /// Removes a table with its schema, indexes, triggers and relationships.
    pub fn drop_table(&mut self, name: &str) -> Result<RowStore> {
        self.tables
            .remove(name)
            .ok_or_else(|| Error::table_not_found(name))
    }

    /// Adds or replaces a table.
    pub fn put_table(&mut self, store: RowStore) {
        self.tables.insert(store.name().to_string(), store);
    }

    pub fn table(&self, name: &str) -> Result<&RowStore> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::table_not_found(name))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut RowStore> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::table_not_found(name))
    }

    pub fn get_table(&self, name: &str) -> Option<&RowStore> {
        self.tables.get(name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names in name order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn total_row_count(&self) -> usize {
        self.tables.values().map(RowStore::len).sum()
    }

    pub fn tables(&self) -> impl Iterator<Item = &RowStore> {
        self.tables.values()
    }

    pub(crate) fn tables_mut(&mut self) -> &mut BTreeMap<String, RowStore> {
        &mut self.tables
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }

    /// Serializable copy of every table.
    pub fn to_snapshot(&self) -> DatabaseSnapshot {
        self.tables
            .iter()
            .map(|(name, store)| (name.clone(), store.to_snapshot()))
            .collect()
    }

    /// Builds a store from a snapshot, failing on the first invalid table.
    pub fn from_snapshot(snapshot: DatabaseSnapshot) -> Result<Self> {
        let mut tables = BTreeMap::new();
        for (name, table) in snapshot {
            let store = RowStore::from_snapshot(name.as_str(), table)?;
            tables.insert(name, store);
        }
        Ok(Self { tables })
    }
}
