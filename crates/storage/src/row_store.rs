//! Record storage for a single table.
//!
//! `RowStore` keeps records in insertion order (keyed by a monotonic `RowId`),
//! a primary map from `id` value to row, and one `BTreeIndex` per indexed
//! field. Records are `Rc`-shared so snapshots are structural.

use crate::relationship::Relationship;
use crate::snapshot::{TableMetadata, TableSnapshot};
use crate::trigger::TriggerRegistry;
use hashbrown::{HashMap, HashSet};
use std::collections::BTreeMap;
use std::rc::Rc;
use tabula_core::schema::Schema;
use tabula_core::{Error, Record, Result, RowId, Value};
use tabula_index::{BTreeIndex, Index};

/// Saved table state for transaction rollback.
#[derive(Clone, Debug)]
pub struct TableCheckpoint {
    rows: BTreeMap<RowId, Rc<Record>>,
    next_row_id: RowId,
    schema: Option<Schema>,
    triggers: TriggerRegistry,
    relationships: Vec<Relationship>,
    index_fields: Vec<String>,
}

impl TableCheckpoint {
    /// Number of records captured.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Record storage for a single table.
#[derive(Clone, Debug)]
pub struct RowStore {
    name: String,
    rows: BTreeMap<RowId, Rc<Record>>,
    next_row_id: RowId,
    /// `id` value → row.
    ids: HashMap<Value, RowId>,
    indexes: BTreeMap<String, BTreeIndex<Value>>,
    /// Rows whose index entries are waiting for `flush_pending`.
    pending: Vec<RowId>,
    schema: Option<Schema>,
    triggers: TriggerRegistry,
    relationships: Vec<Relationship>,
}

impl RowStore {
    /// Creates an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
            next_row_id: 1,
            ids: HashMap::new(),
            indexes: BTreeMap::new(),
            pending: Vec::new(),
            schema: None,
            triggers: TriggerRegistry::new(),
            relationships: Vec::new(),
        }
    }

    /// Creates an empty table with a schema.
    pub fn with_schema(name: impl Into<String>, schema: Option<Schema>) -> Self {
        Self {
            schema,
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Replaces the schema without revalidating existing records.
    pub fn set_schema(&mut self, schema: Option<Schema>) {
        self.schema = schema;
    }

    pub fn triggers(&self) -> &TriggerRegistry {
        &self.triggers
    }

    pub fn triggers_mut(&mut self) -> &mut TriggerRegistry {
        &mut self.triggers
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    pub fn set_relationships(&mut self, relationships: Vec<Relationship>) {
        self.relationships = relationships;
    }

    /// Returns the number of records (including soft-deleted ones).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a record and indexes it. The record must carry an `id`.
    pub fn insert(&mut self, record: Record) -> Result<RowId> {
        self.flush_pending();
        let row_id = self.append(record)?;
        if let Some(record) = self.rows.get(&row_id) {
            for (field, index) in self.indexes.iter_mut() {
                index.insert(record.value(field).clone(), row_id);
            }
        }
        Ok(row_id)
    }

    /// Appends a record but defers its index entries until `flush_pending`.
    pub fn insert_deferred(&mut self, record: Record) -> Result<RowId> {
        let row_id = self.append(record)?;
        self.pending.push(row_id);
        Ok(row_id)
    }

    /// Number of rows whose index entries are deferred.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Writes deferred index entries with one sorted bulk insert per index.
    /// Returns the number of rows flushed.
    pub fn flush_pending(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let pending = std::mem::take(&mut self.pending);
        for (field, index) in self.indexes.iter_mut() {
            let rows = &self.rows;
            index.bulk_insert(pending.iter().filter_map(|row_id| {
                rows.get(row_id)
                    .map(|record| (record.value(field).clone(), *row_id))
            }));
        }
        pending.len()
    }

    fn append(&mut self, record: Record) -> Result<RowId> {
        let id = record
            .id()
            .cloned()
            .ok_or_else(|| Error::invalid_input(format!("record in table {} has no id", self.name)))?;
        if self.ids.contains_key(&id) {
            return Err(Error::duplicate_id(&self.name, id));
        }

        let row_id = self.next_row_id;
        self.next_row_id += 1;
        self.ids.insert(id, row_id);
        self.rows.insert(row_id, Rc::new(record));
        Ok(row_id)
    }

    /// Replaces a record in place, keeping its position, and repairs indexes.
    /// Returns the previous record.
    pub fn update(&mut self, row_id: RowId, record: Record) -> Result<Rc<Record>> {
        self.flush_pending();
        let old = self
            .rows
            .get(&row_id)
            .cloned()
            .ok_or_else(|| Error::invalid_input(format!("row {row_id} not found in table {}", self.name)))?;

        let new_id = record
            .id()
            .cloned()
            .ok_or_else(|| Error::invalid_input(format!("record in table {} has no id", self.name)))?;
        if old.id() != Some(&new_id) {
            if self.ids.get(&new_id).is_some_and(|&other| other != row_id) {
                return Err(Error::duplicate_id(&self.name, new_id));
            }
            if let Some(old_id) = old.id() {
                self.ids.remove(old_id);
            }
            self.ids.insert(new_id, row_id);
        }

        for (field, index) in self.indexes.iter_mut() {
            let (before, after) = (old.value(field), record.value(field));
            if before != after {
                index.remove(before, Some(row_id));
                index.insert(after.clone(), row_id);
            }
        }

        self.rows.insert(row_id, Rc::new(record));
        Ok(old)
    }

    /// Removes a record and its index entries.
    pub fn remove(&mut self, row_id: RowId) -> Option<Rc<Record>> {
        self.flush_pending();
        let record = self.rows.remove(&row_id)?;
        if let Some(id) = record.id() {
            self.ids.remove(id);
        }
        for (field, index) in self.indexes.iter_mut() {
            index.remove(record.value(field), Some(row_id));
        }
        Some(record)
    }

    /// Removes every record, keeping schema, index definitions, triggers and
    /// relationships.
    pub fn truncate(&mut self) {
        self.rows.clear();
        self.ids.clear();
        self.pending.clear();
        for index in self.indexes.values_mut() {
            index.clear();
        }
    }

    /// Replaces every record. All ids must be present and unique; on error
    /// nothing changes.
    pub fn replace_all(&mut self, records: Vec<Record>) -> Result<()> {
        {
            let mut seen = HashSet::with_capacity(records.len());
            for record in &records {
                let id = record.id().ok_or_else(|| {
                    Error::invalid_input(format!("record in table {} has no id", self.name))
                })?;
                if !seen.insert(id) {
                    return Err(Error::duplicate_id(&self.name, id.clone()));
                }
            }
        }

        self.truncate();
        for record in records {
            self.append(record)?;
        }
        self.rebuild_indexes();
        Ok(())
    }

    pub fn get(&self, row_id: RowId) -> Option<&Rc<Record>> {
        self.rows.get(&row_id)
    }

    /// Finds the row holding the given `id` value.
    pub fn row_id_of(&self, id: &Value) -> Option<RowId> {
        self.ids.get(id).copied()
    }

    pub fn contains_id(&self, id: &Value) -> bool {
        self.ids.contains_key(id)
    }

    /// Iterates rows in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (RowId, &Rc<Record>)> {
        self.rows.iter().map(|(&row_id, record)| (row_id, record))
    }

    /// Iterates records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.rows.values().map(|r| r.as_ref())
    }

    /// Creates an index on `field` and backfills it. Returns false if the
    /// index already existed.
    pub fn create_index(&mut self, field: &str) -> bool {
        if self.indexes.contains_key(field) {
            return false;
        }
        self.flush_pending();
        let mut index = BTreeIndex::new();
        index.bulk_insert(
            self.rows
                .iter()
                .map(|(&row_id, record)| (record.value(field).clone(), row_id)),
        );
        self.indexes.insert(field.to_string(), index);
        true
    }

    pub fn drop_index(&mut self, field: &str) -> bool {
        self.indexes.remove(field).is_some()
    }

    pub fn has_index(&self, field: &str) -> bool {
        self.indexes.contains_key(field)
    }

    /// Returns the index on `field`. Deferred rows are not visible until
    /// `flush_pending`.
    pub fn index(&self, field: &str) -> Option<&BTreeIndex<Value>> {
        self.indexes.get(field)
    }

    pub fn indexed_fields(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(|k| k.as_str())
    }

    /// Rebuilds every index from the current records.
    pub fn rebuild_indexes(&mut self) {
        self.pending.clear();
        let fields: Vec<String> = self.indexes.keys().cloned().collect();
        self.indexes.clear();
        for field in fields {
            self.create_index(&field);
        }
    }

    /// Sets `column` to `default` on every record that lacks it.
    pub fn add_column(&mut self, column: &str, default: &Value) {
        self.flush_pending();
        for record in self.rows.values_mut() {
            if !record.contains(column) {
                Rc::make_mut(record).set(column, default.clone());
            }
        }
        if self.indexes.contains_key(column) {
            self.indexes.remove(column);
            self.create_index(column);
        }
    }

    /// Removes `column` from every record and discards its index.
    pub fn drop_column(&mut self, column: &str) {
        self.flush_pending();
        for record in self.rows.values_mut() {
            if record.contains(column) {
                Rc::make_mut(record).remove(column);
            }
        }
        self.indexes.remove(column);
    }

    /// Captures records, schema, relationships and index names.
    pub fn to_snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            rows: self.rows.values().map(|r| Record::clone(r)).collect(),
            schema: self.schema.clone(),
            metadata: TableMetadata {
                relationships: self.relationships.clone(),
                indexes: self.indexes.keys().cloned().collect(),
            },
        }
    }

    /// Captures the table for rollback. Records are shared, not copied;
    /// indexes are recorded by field and rebuilt on restore.
    pub fn checkpoint(&self) -> TableCheckpoint {
        TableCheckpoint {
            rows: self.rows.clone(),
            next_row_id: self.next_row_id,
            schema: self.schema.clone(),
            triggers: self.triggers.clone(),
            relationships: self.relationships.clone(),
            index_fields: self.indexes.keys().cloned().collect(),
        }
    }

    /// Rebuilds a table from a checkpoint, including its indexes.
    pub fn from_checkpoint(name: impl Into<String>, checkpoint: TableCheckpoint) -> Self {
        let ids = checkpoint
            .rows
            .iter()
            .filter_map(|(&row_id, record)| record.id().map(|id| (id.clone(), row_id)))
            .collect();
        let mut store = Self {
            rows: checkpoint.rows,
            next_row_id: checkpoint.next_row_id,
            ids,
            schema: checkpoint.schema,
            triggers: checkpoint.triggers,
            relationships: checkpoint.relationships,
            ..Self::new(name)
        };
        for field in &checkpoint.index_fields {
            store.create_index(field);
        }
        store
    }

    /// Builds a table from a snapshot.
    pub fn from_snapshot(name: impl Into<String>, snapshot: TableSnapshot) -> Result<Self> {
        let mut store = Self::with_schema(name, snapshot.schema);
        store.relationships = snapshot.metadata.relationships;
        for field in &snapshot.metadata.indexes {
            store.create_index(field);
        }
        store.replace_all(snapshot.rows)?;
        Ok(store)
    }
}
