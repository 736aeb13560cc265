//! Tabula Storage - Storage layer for the Tabula table store.
//!
//! This crate provides the storage layer including:
//!
//! - `RowStore`: Record storage for one table with index maintenance
//! - `TableStore`: All tables by name
//! - `TriggerRegistry`: Per-table mutation hooks
//! - `Relationship`: Declarative links between tables
//! - `Transaction`: Snapshot transactions with rollback
//! - `PersistenceAdapter`: Snapshot mirroring (memory, JSON file, JSON directory)
//!
//! # Example
//!
//! ```rust
//! use tabula_storage::{TableStore, Transaction};
//! use tabula_core::Record;
//!
//! let mut store = TableStore::new();
//! store.create_table("users", None).unwrap();
//!
//! let tx = Transaction::begin(&store);
//! store
//!     .table_mut("users")
//!     .unwrap()
//!     .insert(Record::new().with("id", 1).with("name", "Alice"))
//!     .unwrap();
//! tx.rollback(&mut store).unwrap();
//!
//! assert!(store.table("users").unwrap().is_empty());
//! ```

pub mod persist;
pub mod relationship;
pub mod row_store;
pub mod snapshot;
pub mod store;
pub mod transaction;
pub mod trigger;

pub use persist::{JsonDirectoryAdapter, JsonFileAdapter, MemoryAdapter, PersistenceAdapter};
pub use relationship::{RelationKind, Relationship};
pub use row_store::{RowStore, TableCheckpoint};
pub use snapshot::{DatabaseSnapshot, TableMetadata, TableSnapshot};
pub use store::TableStore;
pub use transaction::{Transaction, TransactionId, TransactionState};
pub use trigger::{
    FireOutcome, Trigger, TriggerAction, TriggerContext, TriggerEvent, TriggerFailure, TriggerFn,
    TriggerRegistry,
};
