//! JSON backup and restore of the whole database.

use crate::database::Database;
use tabula_core::Result;
use tabula_storage::{DatabaseSnapshot, TableStore};

impl Database {
    /// Serializes every table (records, schema, relationships and index
    /// names) as pretty-printed JSON. Triggers are not included.
    pub fn backup(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.store.to_snapshot())?)
    }

    /// Replaces the whole database with a backup.
    ///
    /// Nothing changes if the document is malformed or any table in it is
    /// invalid. Tables that exist both before and after keep their triggers.
    pub fn restore(&mut self, json: &str) -> Result<()> {
        let snapshot: DatabaseSnapshot = serde_json::from_str(json)?;
        let mut restored = TableStore::from_snapshot(snapshot)?;

        for table in self.store.tables() {
            if let Ok(target) = restored.table_mut(table.name()) {
                *target.triggers_mut() = table.triggers().clone();
            }
        }
        self.store = restored;
        self.reset_query();

        self.logger.debug(|| {
            format!(
                "restored {} tables ({} records)",
                self.store.table_count(),
                self.store.total_row_count()
            )
        });
        self.persist(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, Relationship, TriggerAction, TriggerEvent};
    use tabula_core::schema::{FieldRule, Schema};
    use tabula_core::Record;

    fn sample() -> Database {
        let mut db = Database::new();
        let schema = Schema::new().field("name", FieldRule::string().required());
        db.create_table("users", Some(schema)).unwrap();
        db.create_table("posts", None).unwrap();
        db.insert("users", Record::new().with("id", 1).with("name", "ann")).unwrap();
        db.insert("posts", Record::new().with("id", 1).with("user_id", 1)).unwrap();
        db.add_relationship("posts", Relationship::belongs_to("users", "user_id")).unwrap();
        db
    }

    #[test]
    fn test_backup_restore() {
        let db = sample();
        let json = db.backup().unwrap();

        let mut copy = Database::new();
        copy.create_table("stale", None).unwrap();
        copy.restore(&json).unwrap();

        assert_eq!(copy.table_names(), vec!["posts", "users"]);
        let original: Vec<Record> = db.table("users").unwrap().records().cloned().collect();
        assert_eq!(copy.get("users").unwrap(), original);
        assert!(copy.get_schema("users").unwrap().is_some());
        assert!(copy.table("users").unwrap().has_index("name"));
        assert_eq!(copy.relationships("posts").unwrap().len(), 1);
        assert!(copy.insert("users", Record::new()).unwrap_err().is_validation());
    }

    #[test]
    fn test_restore_is_all_or_nothing() {
        let mut db = sample();
        assert!(db.restore("{not json").is_err());
        let dupes = r#"{"users": {"rows": [{"id": 1}, {"id": 1}]}}"#;
        assert!(db.restore(dupes).is_err());
        assert_eq!(db.table_names(), vec!["posts", "users"]);
        assert_eq!(db.raw_count("users").unwrap(), 1);
    }

    #[test]
    fn test_restore_keeps_triggers() {
        let mut db = sample();
        db.create_trigger("users", "veto", TriggerEvent::BeforeInsert, |_| Ok(TriggerAction::Veto))
            .unwrap();
        let json = db.backup().unwrap();
        db.restore(&json).unwrap();
        assert_eq!(db.insert("users", Record::new().with("name", "bob")).unwrap(), None);
    }
}
