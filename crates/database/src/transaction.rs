//! All-or-nothing blocks of database operations.

use crate::database::Database;
use std::panic::{self, AssertUnwindSafe};
use tabula_core::{Error, Result, Value};
use tabula_storage::Transaction;

impl Database {
    /// Runs `f` against the database as one unit.
    ///
    /// If `f` returns `Err` or panics, every table is restored to its state
    /// before the call (records, schemas, indexes, triggers and
    /// relationships), as are `last_insert_id` and the query builder. The
    /// error is returned and a panic is resumed after the rollback.
    ///
    /// Nothing is persisted while `f` runs; a successful block is persisted
    /// once. Transactions do not nest.
    ///
    /// ```rust
    /// use tabula_database::{Database, Error};
    /// use tabula_core::Record;
    ///
    /// let mut db = Database::new();
    /// db.create_table("accounts", None).unwrap();
    ///
    /// let result: Result<(), Error> = db.transaction(|db| {
    ///     db.insert("accounts", Record::new().with("id", 1))?;
    ///     db.insert("accounts", Record::new().with("id", 1))?;
    ///     Ok(())
    /// });
    ///
    /// assert!(result.is_err());
    /// assert_eq!(db.raw_count("accounts").unwrap(), 0);
    /// ```
    pub fn transaction<T, E, F>(&mut self, f: F) -> core::result::Result<T, E>
    where
        F: FnOnce(&mut Database) -> core::result::Result<T, E>,
        E: From<Error>,
    {
        if self.in_transaction {
            return Err(Error::invalid_input("nested transaction").into());
        }

        let tx = Transaction::begin(&self.store);
        let last_insert_id = self.last_insert_id.clone();
        self.in_transaction = true;
        self.logger.debug(|| format!("transaction {} started", tx.id()));

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(self)));
        self.in_transaction = false;

        match outcome {
            Ok(Ok(value)) => {
                let id = tx.id();
                tx.commit()?;
                self.logger.debug(|| format!("transaction {id} committed"));
                self.persist(None);
                Ok(value)
            }
            Ok(Err(err)) => {
                self.roll_back(tx, last_insert_id)?;
                Err(err)
            }
            Err(payload) => {
                self.roll_back(tx, last_insert_id)?;
                panic::resume_unwind(payload)
            }
        }
    }

    /// Whether a `transaction` block is running.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn roll_back(&mut self, tx: Transaction, last_insert_id: Option<Value>) -> Result<()> {
        let id = tx.id();
        tx.rollback(&mut self.store)?;
        self.last_insert_id = last_insert_id;
        self.reset_query();
        self.logger.debug(|| format!("transaction {id} rolled back"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, Error, MemoryAdapter, TriggerAction, TriggerEvent};
    use std::panic::{self, AssertUnwindSafe};
    use tabula_core::schema::{FieldRule, Schema};
    use tabula_core::{Record, Value};

    fn seeded() -> Database {
        let mut db = Database::new();
        db.create_table("t", None).unwrap();
        for i in 0..3 {
            db.insert("t", Record::new().with("id", i)).unwrap();
        }
        db
    }

    #[test]
    fn test_commit_keeps_changes() {
        let mut db = seeded();
        let n: Result<usize, Error> = db.transaction(|db| {
            db.insert("t", Record::new().with("id", 10))?;
            db.where_eq("id", 0).delete("t")
        });
        assert_eq!(n.unwrap(), 1);
        assert_eq!(db.raw_count("t").unwrap(), 3);
        assert_eq!(db.last_insert_id(), Some(&Value::from(10)));
        assert!(!db.in_transaction());
    }

    #[test]
    fn test_rollback_restores_everything() {
        let mut db = seeded();
        db.create_index("t", "v").unwrap();
        let before = db.get("t").unwrap();

        let result: Result<(), Error> = db.transaction(|db| {
            db.insert("t", Record::new().with("id", 3).with("v", 1))?;
            db.insert("t", Record::new().with("id", 4).with("v", 1))?;
            db.update_schema("t", Schema::new().field("v", FieldRule::number()))?;
            db.create_table("scratch", None)?;
            db.drop_table("t")?;
            Err(Error::invalid_input("abort"))
        });

        assert!(result.is_err());
        assert_eq!(db.get("t").unwrap(), before);
        assert!(!db.has_table("scratch"));
        assert!(db.get_schema("t").unwrap().is_none());
        assert!(db.table("t").unwrap().has_index("v"));
        assert_eq!(db.where_eq("v", 1).count("t").unwrap(), 0);
        assert_eq!(db.last_insert_id(), Some(&Value::from(2)));
    }

    #[test]
    fn test_rollback_keeps_triggers() {
        let mut db = seeded();
        db.create_trigger("t", "veto_all", TriggerEvent::BeforeInsert, |_| Ok(TriggerAction::Veto))
            .unwrap();
        let result: Result<(), Error> = db.transaction(|db| {
            db.drop_trigger("t", "veto_all")?;
            Err(Error::invalid_input("abort"))
        });
        assert!(result.is_err());
        assert_eq!(db.insert("t", Record::new()).unwrap(), None);
    }

    #[test]
    fn test_custom_error_type() {
        #[derive(Debug)]
        enum AppError {
            Db(Error),
            Business,
        }
        impl From<Error> for AppError {
            fn from(err: Error) -> Self {
                AppError::Db(err)
            }
        }

        let mut db = seeded();
        let result: Result<(), AppError> = db.transaction(|db| {
            db.insert("t", Record::new().with("id", 7))?;
            Err(AppError::Business)
        });
        assert!(matches!(result, Err(AppError::Business)));
        assert_eq!(db.raw_count("t").unwrap(), 3);

        let result: Result<(), AppError> = db.transaction(|db| {
            db.insert("t", Record::new().with("id", 0))?;
            Ok(())
        });
        assert!(matches!(result, Err(AppError::Db(Error::DuplicateId { .. }))));
    }

    #[test]
    fn test_nested_transaction_rejected() {
        let mut db = seeded();
        let result: Result<(), Error> = db.transaction(|db| {
            db.insert("t", Record::new().with("id", 5))?;
            db.transaction(|_| Ok::<(), Error>(()))
        });
        let err = result.unwrap_err();
        assert!(err.to_string().contains("nested transaction"));
        assert_eq!(db.raw_count("t").unwrap(), 3);
    }

    #[test]
    fn test_panic_rolls_back() {
        let mut db = seeded();
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), Error> = db.transaction(|db| {
                db.insert("t", Record::new().with("id", 9)).unwrap();
                panic!("boom");
            });
        }));
        assert!(caught.is_err());
        assert!(!db.in_transaction());
        assert_eq!(db.raw_count("t").unwrap(), 3);
    }

    #[test]
    fn test_persists_once_on_commit() {
        let adapter = MemoryAdapter::new();
        let mut db = Database::with_adapter(Default::default(), adapter.clone()).unwrap();
        db.create_table("t", None).unwrap();
        let writes = adapter.persist_count();

        let _: Result<(), Error> = db.transaction(|db| {
            for i in 0..5 {
                db.insert("t", Record::new().with("id", i))?;
            }
            Ok(())
        });
        assert_eq!(adapter.persist_count(), writes + 1);
        assert_eq!(adapter.snapshot()["t"].rows.len(), 5);

        let _: Result<(), Error> = db.transaction(|db| {
            db.insert("t", Record::new().with("id", 99))?;
            Err(Error::invalid_input("abort"))
        });
        assert_eq!(adapter.persist_count(), writes + 1);
    }
}
