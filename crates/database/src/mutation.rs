//! Insert, update and delete.
//!
//! Every mutation checks that the table exists before anything else happens.
//! `update` and `delete` select their targets with the pending query state
//! and clear it, whether they succeed or not.

use crate::database::{timestamp, Database};
use tabula_core::schema::Schema;
use tabula_core::{Error, Record, Result, Value, CREATED_AT, DELETED_AT, ID_FIELD, UPDATED_AT};
use tabula_query::Cursor;
use tabula_storage::TriggerEvent;

impl Database {
    /// Inserts a record and returns its id, or `None` when a `BeforeInsert`
    /// trigger vetoed it.
    ///
    /// A missing, null or `"AUTO_INCREMENT"` id is replaced with a generated
    /// one. The record is validated against the table schema first.
    pub fn insert(&mut self, table: &str, record: Record) -> Result<Option<Value>> {
        let id = self.insert_one(table, record, false)?;
        if id.is_some() {
            self.persist(Some(table));
        }
        Ok(id)
    }

    /// Inserts records one by one with the same rules as `insert`.
    ///
    /// Not atomic: when a record fails, the records before it stay inserted
    /// and the error is returned. Vetoed records are skipped. With
    /// `performance` on, index entries are written in chunks of
    /// `chunk_size` rows.
    pub fn bulk_insert(&mut self, table: &str, records: Vec<Record>) -> Result<Vec<Value>> {
        self.store.table(table)?;
        let deferred = self.config.performance;
        let chunk = self.config.effective_chunk_size();
        let total = records.len();
        let mut ids = Vec::with_capacity(total);

        let mut failure = None;
        for record in records {
            match self.insert_one(table, record, deferred) {
                Ok(Some(id)) => ids.push(id),
                Ok(None) => {}
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
            let store = self.store.table_mut(table)?;
            if store.pending_len() >= chunk {
                store.flush_pending();
            }
        }
        self.store.table_mut(table)?.flush_pending();

        self.logger
            .debug(|| format!("bulk inserted {} of {total} records into {table}", ids.len()));
        if !ids.is_empty() {
            self.persist(Some(table));
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(ids),
        }
    }

    fn insert_one(&mut self, table: &str, mut record: Record, deferred: bool) -> Result<Option<Value>> {
        let schema = self.store.table(table)?.schema().cloned();
        self.assign_id(&mut record);
        if self.config.timestamps {
            stamp_created(&mut record, &timestamp());
        }
        if let Some(schema) = &schema {
            schema.validate(&record)?;
        }

        let outcome = self.fire(table, &TriggerEvent::BeforeInsert, None, Some(&record))?;
        if outcome.vetoed {
            self.logger.debug(|| format!("insert into {table} vetoed by trigger"));
            return Ok(None);
        }

        let id = record.id().cloned().unwrap_or_default();
        let store = self.store.table_mut(table)?;
        let row_id = if deferred {
            store.insert_deferred(record)?
        } else {
            store.insert(record)?
        };
        self.last_insert_id = Some(id.clone());
        self.logger.debug(|| format!("inserted {id} into {table}"));

        if let Some(stored) = self.store.table(table)?.get(row_id).cloned() {
            self.fire(table, &TriggerEvent::AfterInsert, None, Some(stored.as_ref()))?;
        }
        Ok(Some(id))
    }

    /// Merges `patch` into every record selected by the pending query state
    /// and returns how many records changed.
    ///
    /// Only the patched fields are validated. The `id` cannot be patched.
    /// An `Update` trigger veto skips that record.
    pub fn update(&mut self, table: &str, patch: Record) -> Result<usize> {
        let state = self.query.take();
        let store = self.store.table(table)?;
        if patch.contains(ID_FIELD) {
            return Err(Error::invalid_input("update patch cannot change the id"));
        }
        if let Some(schema) = store.schema() {
            schema.validate_fields(&patch)?;
        }
        let targets = Cursor::new(store, state, self.cursor_options()).select()?;

        let now = self.config.timestamps.then(timestamp);
        let mut updated = 0;
        for (row_id, old) in targets {
            let mut new = Record::clone(&old);
            new.merge(&patch);
            if let Some(now) = &now {
                new.set(UPDATED_AT, now.as_str());
            }
            if self.fire(table, &TriggerEvent::Update, Some(old.as_ref()), Some(&new))?.vetoed {
                continue;
            }
            self.store.table_mut(table)?.update(row_id, new)?;
            updated += 1;
        }

        self.logger.debug(|| format!("updated {updated} records in {table}"));
        if updated > 0 {
            self.persist(Some(table));
        }
        Ok(updated)
    }

    /// Deletes every record selected by the pending query state and returns
    /// how many were deleted. In soft-delete mode records get `deleted_at`
    /// instead of being removed. A `Delete` trigger veto skips that record.
    pub fn delete(&mut self, table: &str) -> Result<usize> {
        let state = self.query.take();
        let store = self.store.table(table)?;
        let targets = Cursor::new(store, state, self.cursor_options()).select()?;

        let soft = self.config.soft_delete;
        let now = timestamp();
        let mut deleted = 0;
        for (row_id, old) in targets {
            if self.fire(table, &TriggerEvent::Delete, Some(old.as_ref()), None)?.vetoed {
                continue;
            }
            let store = self.store.table_mut(table)?;
            if soft {
                let trashed = Record::clone(&old).with(DELETED_AT, now.as_str());
                store.update(row_id, trashed)?;
            } else {
                store.remove(row_id);
            }
            deleted += 1;
        }

        self.logger.debug(|| {
            let mode = if soft { "soft" } else { "hard" };
            format!("{mode} deleted {deleted} records from {table}")
        });
        if deleted > 0 {
            self.persist(Some(table));
        }
        Ok(deleted)
    }

    /// Removes every record without firing triggers.
    pub fn truncate(&mut self, table: &str) -> Result<()> {
        self.store.table_mut(table)?.truncate();
        self.logger.debug(|| format!("truncated {table}"));
        self.persist(Some(table));
        Ok(())
    }

    /// Replaces a table's contents, creating the table if needed. Ids and
    /// timestamps are filled in and every record is validated before
    /// anything changes. Triggers do not fire.
    pub fn set_table(&mut self, table: &str, records: Vec<Record>, schema: Option<Schema>) -> Result<()> {
        self.replace_table(table, records, schema)?;
        self.persist(Some(table));
        Ok(())
    }

    pub(crate) fn replace_table(
        &mut self,
        table: &str,
        mut records: Vec<Record>,
        schema: Option<Schema>,
    ) -> Result<()> {
        let now = self.config.timestamps.then(timestamp);
        for record in records.iter_mut() {
            self.assign_id(record);
            if let Some(now) = &now {
                stamp_created(record, now);
            }
        }

        let effective = match &schema {
            Some(schema) => Some(schema),
            None => self.store.get_table(table).and_then(|t| t.schema()),
        };
        if let Some(schema) = effective {
            schema.validate_all(&records)?;
        }

        let created = !self.store.has_table(table);
        if created {
            self.create_table_quiet(table, schema.clone())?;
        }
        let store = self.store.table_mut(table)?;
        if let Err(err) = store.replace_all(records) {
            if created {
                self.store.drop_table(table)?;
            }
            return Err(err);
        }
        if let Some(schema) = schema {
            store.set_schema(Some(schema));
        }
        self.logger.debug(|| format!("replaced contents of {table}"));
        Ok(())
    }

    /// Sets `column` to `default` on every record that lacks it.
    pub fn add_column(&mut self, table: &str, column: &str, default: impl Into<Value>) -> Result<()> {
        let default = default.into();
        self.store.table_mut(table)?.add_column(column, &default);
        self.logger.debug(|| format!("added column {column} to {table}"));
        self.persist(Some(table));
        Ok(())
    }

    /// Removes `column` from every record. The `id` column cannot be dropped.
    pub fn drop_column(&mut self, table: &str, column: &str) -> Result<()> {
        let store = self.store.table_mut(table)?;
        if column == ID_FIELD {
            return Err(Error::invalid_input("the id column cannot be dropped"));
        }
        store.drop_column(column);
        self.logger.debug(|| format!("dropped column {column} from {table}"));
        self.persist(Some(table));
        Ok(())
    }
}

/// Sets `created_at` when absent and always refreshes `updated_at`.
fn stamp_created(record: &mut Record, now: &str) {
    if !record.contains(CREATED_AT) {
        record.set(CREATED_AT, now);
    }
    record.set(UPDATED_AT, now);
}
