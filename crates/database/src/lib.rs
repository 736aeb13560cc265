//! Tabula - An embedded in-memory table store.
//!
//! This crate is the public entry point. It ties the lower layers together:
//!
//! - `Database`: tables, the chainable query builder, mutations, triggers,
//!   relationships, transactions and backup
//! - `DatabaseConfig`: storage mode, timestamps, soft delete, logging,
//!   index usage and seed data
//! - `IdGenerator`: how missing record ids are filled in
//!
//! # Example
//!
//! ```rust
//! use tabula_database::{Database, DatabaseConfig, Direction, FieldRule, Record, Schema};
//!
//! let config = DatabaseConfig::new().timestamps(true).soft_delete(true);
//! let mut db = Database::open(config).unwrap();
//!
//! let schema = Schema::new()
//!     .field("name", FieldRule::string().required())
//!     .field("age", FieldRule::number().min(0.0));
//! db.create_table("users", Some(schema)).unwrap();
//!
//! db.insert("users", Record::new().with("name", "Alice").with("age", 31)).unwrap();
//! db.insert("users", Record::new().with("name", "Bob").with("age", 25)).unwrap();
//!
//! let adults = db
//!     .where_operator("age", ">=", 30)
//!     .order_by("name", Direction::Asc)
//!     .get("users")
//!     .unwrap();
//! assert_eq!(adults.len(), 1);
//!
//! db.where_eq("name", "Bob").delete("users").unwrap();
//! assert_eq!(db.count("users").unwrap(), 1);
//! assert_eq!(db.with_trashed().count("users").unwrap(), 2);
//! ```

mod backup;
pub mod config;
mod database;
pub mod id;
mod logger;
mod mutation;
mod query;
mod transaction;

pub use config::{DatabaseConfig, Logging, StorageMode};
pub use database::Database;
pub use id::{IdGenerator, RandomIdGenerator, SequentialIdGenerator};

pub use tabula_core::schema::{FieldRule, FieldType, Schema};
pub use tabula_core::{Error, Record, Result, Value};
pub use tabula_query::{Direction, Operator, Page, Pagination};
pub use tabula_storage::{
    FireOutcome, JsonDirectoryAdapter, JsonFileAdapter, MemoryAdapter, PersistenceAdapter,
    RelationKind, Relationship, TriggerAction, TriggerContext, TriggerEvent,
};
