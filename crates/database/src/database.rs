//! Database - Main entry point for Tabula.
//!
//! `Database` owns every table, the pending query state, the configuration
//! and the optional persistence adapter. Mutations live in `mutation.rs`,
//! reads in `query.rs`.

use crate::config::{DatabaseConfig, StorageMode};
use crate::id::{IdGenerator, RandomIdGenerator};
use crate::logger::Logger;
use chrono::{SecondsFormat, Utc};
use std::fmt;
use tabula_core::schema::Schema;
use tabula_core::{Record, Result, Value, ID_FIELD};
use tabula_query::{CursorOptions, QueryState};
use tabula_storage::{
    FireOutcome, JsonDirectoryAdapter, JsonFileAdapter, PersistenceAdapter, Relationship,
    RowStore, TableStore, TriggerAction, TriggerContext, TriggerEvent,
};

/// An embedded table store.
///
/// Query builder calls (`where_eq`, `order_by`, ...) accumulate on the
/// database itself and are consumed by the next terminal operation:
///
/// ```rust
/// use tabula_database::{Database, Direction};
/// use tabula_core::Record;
///
/// let mut db = Database::new();
/// db.create_table("p", None).unwrap();
/// for (id, price) in [(1, 10), (2, 50), (3, 90)] {
///     db.insert("p", Record::new().with("id", id).with("price", price)).unwrap();
/// }
///
/// let rows = db
///     .where_operator("price", ">", 20)
///     .order_by("price", Direction::Desc)
///     .get("p")
///     .unwrap();
/// assert_eq!(rows.len(), 2);
/// assert_eq!(db.get("p").unwrap().len(), 3);
/// ```
pub struct Database {
    pub(crate) store: TableStore,
    pub(crate) query: QueryState,
    pub(crate) config: DatabaseConfig,
    pub(crate) logger: Logger,
    pub(crate) ids: Box<dyn IdGenerator>,
    pub(crate) adapter: Option<Box<dyn PersistenceAdapter>>,
    pub(crate) last_insert_id: Option<Value>,
    pub(crate) in_transaction: bool,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("tables", &self.store.table_names())
            .field("config", &self.config)
            .field("persistent", &self.adapter.is_some())
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

impl Database {
    /// Creates an in-memory database with the default configuration.
    pub fn new() -> Self {
        Self::bare(DatabaseConfig::default(), None)
    }

    /// Opens a database. For the file and folder storage modes, existing
    /// data is loaded from the configured path.
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        let adapter: Option<Box<dyn PersistenceAdapter>> =
            match (config.storage_mode, config.storage_path()) {
                (StorageMode::File, Some(path)) => Some(Box::new(JsonFileAdapter::new(path))),
                (StorageMode::Folder, Some(path)) => Some(Box::new(JsonDirectoryAdapter::new(path))),
                _ => None,
            };
        Self::load(config, adapter)
    }

    /// Opens a database mirrored through `adapter`, whatever the configured
    /// storage mode.
    pub fn with_adapter<A>(config: DatabaseConfig, adapter: A) -> Result<Self>
    where
        A: PersistenceAdapter + 'static,
    {
        Self::load(config, Some(Box::new(adapter)))
    }

    /// Replaces the id generator.
    pub fn with_id_generator<G>(mut self, ids: G) -> Self
    where
        G: IdGenerator + 'static,
    {
        self.ids = Box::new(ids);
        self
    }

    fn bare(config: DatabaseConfig, adapter: Option<Box<dyn PersistenceAdapter>>) -> Self {
        Self {
            store: TableStore::new(),
            query: QueryState::new(),
            logger: Logger::new(config.logging.clone()),
            config,
            ids: Box::new(RandomIdGenerator),
            adapter,
            last_insert_id: None,
            in_transaction: false,
        }
    }

    fn load(config: DatabaseConfig, adapter: Option<Box<dyn PersistenceAdapter>>) -> Result<Self> {
        let mut db = Self::bare(config, adapter);
        if let Some(adapter) = db.adapter.as_mut() {
            let snapshot = adapter.load()?;
            db.store = TableStore::from_snapshot(snapshot)?;
        }

        let defaults = std::mem::take(&mut db.config.default_data);
        let mut seeded = false;
        for (table, rows) in &defaults {
            if !db.store.has_table(table) {
                db.replace_table(table, rows.clone(), None)?;
                seeded = true;
            }
        }
        db.config.default_data = defaults;

        db.logger.debug(|| {
            format!(
                "opened database with {} tables ({} records)",
                db.store.table_count(),
                db.store.total_row_count()
            )
        });
        if seeded {
            db.persist(None);
        }
        Ok(db)
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // ---- tables ----

    /// Creates an empty table. With `auto_index`, `id` and every indexed
    /// schema field get an index.
    pub fn create_table(&mut self, name: &str, schema: Option<Schema>) -> Result<()> {
        self.create_table_quiet(name, schema)?;
        self.logger.debug(|| format!("created table {name}"));
        self.persist(Some(name));
        Ok(())
    }

    pub(crate) fn create_table_quiet(&mut self, name: &str, schema: Option<Schema>) -> Result<()> {
        let auto_index = self.config.auto_index && self.config.performance;
        let table = self.store.create_table(name, schema)?;
        if auto_index {
            table.create_index(ID_FIELD);
            let fields: Vec<String> = table
                .schema()
                .map(|s| s.indexed_fields().map(str::to_string).collect())
                .unwrap_or_default();
            for field in fields {
                table.create_index(&field);
            }
        }
        Ok(())
    }

    /// Drops a table with its schema, indexes, triggers and relationships.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.store.drop_table(name)?;
        self.logger.debug(|| format!("dropped table {name}"));
        self.persist(Some(name));
        Ok(())
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.store.has_table(name)
    }

    /// Table names in name order.
    pub fn table_names(&self) -> Vec<String> {
        self.store.table_names().into_iter().map(str::to_string).collect()
    }

    /// Read access to a table's storage.
    pub fn table(&self, name: &str) -> Result<&RowStore> {
        self.store.table(name)
    }

    /// Number of stored records, soft-deleted ones included.
    pub fn raw_count(&self, name: &str) -> Result<usize> {
        Ok(self.store.table(name)?.len())
    }

    /// Id assigned by the most recent successful insert.
    pub fn last_insert_id(&self) -> Option<&Value> {
        self.last_insert_id.as_ref()
    }

    // ---- schema ----

    pub fn get_schema(&self, name: &str) -> Result<Option<Schema>> {
        Ok(self.store.table(name)?.schema().cloned())
    }

    /// Replaces a table's schema after checking every stored record against
    /// it. Nothing changes if any record fails.
    pub fn update_schema(&mut self, name: &str, schema: Schema) -> Result<()> {
        let auto_index = self.config.auto_index && self.config.performance;
        let table = self.store.table_mut(name)?;
        schema.validate_all(table.records())?;
        if auto_index {
            for field in schema.indexed_fields() {
                table.create_index(field);
            }
        }
        table.set_schema(Some(schema));
        self.logger.debug(|| format!("updated schema of {name}"));
        self.persist(Some(name));
        Ok(())
    }

    // ---- indexes ----

    /// Creates an index on `field`, backfilled from existing records.
    /// Returns `false` if it already existed.
    pub fn create_index(&mut self, name: &str, field: &str) -> Result<bool> {
        let created = self.store.table_mut(name)?.create_index(field);
        if created {
            self.logger.debug(|| format!("created index {name}.{field}"));
            self.persist(Some(name));
        }
        Ok(created)
    }

    // ---- triggers ----

    /// Registers a trigger on `table` for `event`.
    ///
    /// ```rust
    /// use tabula_database::{Database, TriggerAction, TriggerEvent};
    /// use tabula_core::Record;
    ///
    /// let mut db = Database::new();
    /// db.create_table("users", None).unwrap();
    /// db.create_trigger("users", "no_root", TriggerEvent::BeforeInsert, |ctx| {
    ///     let root = ctx.new.is_some_and(|r| r.value("name").as_str() == Some("root"));
    ///     Ok(if root { TriggerAction::Veto } else { TriggerAction::Proceed })
    /// })
    /// .unwrap();
    ///
    /// assert!(db.insert("users", Record::new().with("name", "root")).unwrap().is_none());
    /// assert_eq!(db.raw_count("users").unwrap(), 0);
    /// ```
    pub fn create_trigger<F>(&mut self, table: &str, name: &str, event: TriggerEvent, callback: F) -> Result<()>
    where
        F: Fn(&TriggerContext<'_>) -> anyhow::Result<TriggerAction> + 'static,
    {
        self.store
            .table_mut(table)?
            .triggers_mut()
            .create(table, name, event, callback)?;
        self.logger.debug(|| format!("created trigger {name} on {table}"));
        Ok(())
    }

    pub fn drop_trigger(&mut self, table: &str, name: &str) -> Result<()> {
        self.store.table_mut(table)?.triggers_mut().remove(table, name)?;
        self.logger.debug(|| format!("dropped trigger {name} on {table}"));
        Ok(())
    }

    /// Fires `event` on `table` by hand, typically a `TriggerEvent::Custom`.
    pub fn fire_trigger(
        &self,
        table: &str,
        event: &TriggerEvent,
        old: Option<&Record>,
        new: Option<&Record>,
    ) -> Result<FireOutcome> {
        self.fire(table, event, old, new)
    }

    pub(crate) fn fire(
        &self,
        table: &str,
        event: &TriggerEvent,
        old: Option<&Record>,
        new: Option<&Record>,
    ) -> Result<FireOutcome> {
        let outcome = self.store.table(table)?.triggers().fire(table, event, old, new);
        for failure in &outcome.failures {
            self.logger.notify(|| {
                format!(
                    "trigger {} on {table} failed during {event}: {}",
                    failure.trigger, failure.message
                )
            });
        }
        Ok(outcome)
    }

    // ---- relationships ----

    /// Declares a link from `table` to `relationship.target`. Used by
    /// `join_related`; not enforced on writes.
    pub fn add_relationship(&mut self, table: &str, relationship: Relationship) -> Result<()> {
        self.store.table_mut(table)?.add_relationship(relationship);
        self.persist(Some(table));
        Ok(())
    }

    pub fn relationships(&self, table: &str) -> Result<&[Relationship]> {
        Ok(self.store.table(table)?.relationships())
    }

    // ---- helpers ----

    pub(crate) fn cursor_options(&self) -> CursorOptions {
        CursorOptions {
            use_index: self.config.performance,
            soft_delete: self.config.soft_delete,
        }
    }

    /// Fills in a generated id when the record has none.
    pub(crate) fn assign_id(&mut self, record: &mut Record) {
        if record.needs_id() {
            record.set(ID_FIELD, self.ids.generate());
        }
    }

    /// Mirrors the store through the adapter. Failures are logged. Inside a
    /// transaction nothing is written until commit.
    pub(crate) fn persist(&mut self, table: Option<&str>) {
        if self.in_transaction {
            return;
        }
        let Some(adapter) = self.adapter.as_mut() else {
            return;
        };
        let snapshot = self.store.to_snapshot();
        if let Err(err) = adapter.persist(&snapshot, table) {
            self.logger.warn(&format!("persistence failed: {err}"));
        }
    }

    /// Writes every table through the adapter, returning any failure.
    pub fn save(&mut self) -> Result<()> {
        match self.adapter.as_mut() {
            Some(adapter) => adapter.persist(&self.store.to_snapshot(), None),
            None => Ok(()),
        }
    }
}

/// Current UTC time as ISO-8601 with milliseconds, e.g.
/// `2024-05-01T12:00:00.000Z`.
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::schema::FieldRule;

    #[test]
    fn test_create_table_auto_index() {
        let mut db = Database::new();
        let schema = Schema::new()
            .field("name", FieldRule::string())
            .field("bio", FieldRule::string().not_indexed());
        db.create_table("users", Some(schema)).unwrap();

        let users = db.table("users").unwrap();
        assert!(users.has_index("id"));
        assert!(users.has_index("name"));
        assert!(!users.has_index("bio"));
        assert!(db.create_table("users", None).unwrap_err().is_already_exists());
    }

    #[test]
    fn test_auto_index_disabled() {
        let config = DatabaseConfig::new().auto_index(false);
        let mut db = Database::open(config).unwrap();
        db.create_table("t", None).unwrap();
        assert_eq!(db.table("t").unwrap().indexed_fields().count(), 0);
        assert!(db.create_index("t", "x").unwrap());
        assert!(!db.create_index("t", "x").unwrap());
    }

    #[test]
    fn test_drop_table() {
        let mut db = Database::new();
        db.create_table("t", None).unwrap();
        db.drop_table("t").unwrap();
        assert!(!db.has_table("t"));
        assert!(db.drop_table("t").unwrap_err().is_not_found());
    }

    #[test]
    fn test_table_names() {
        let mut db = Database::new();
        db.create_table("b", None).unwrap();
        db.create_table("a", None).unwrap();
        assert_eq!(db.table_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_trigger_registration() {
        let mut db = Database::new();
        db.create_table("t", None).unwrap();
        let noop = |_: &TriggerContext<'_>| Ok(TriggerAction::Proceed);
        db.create_trigger("t", "audit", TriggerEvent::Update, noop).unwrap();
        assert!(db
            .create_trigger("t", "audit", TriggerEvent::Delete, noop)
            .unwrap_err()
            .is_already_exists());
        db.drop_trigger("t", "audit").unwrap();
        assert!(db.drop_trigger("t", "audit").unwrap_err().is_not_found());
        assert!(db
            .create_trigger("missing", "x", TriggerEvent::Update, noop)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[10..11], "T");
        assert_eq!(&ts[19..20], ".");
    }
}
