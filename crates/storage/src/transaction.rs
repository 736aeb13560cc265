//! Snapshot transactions for Tabula.
//!
//! `Transaction::begin` captures every table (records are `Rc`-shared, so this
//! is structural). `rollback` restores the captured tables exactly: tables
//! created since `begin` are removed, dropped tables come back, and indexes
//! are rebuilt from the restored records.

use crate::row_store::{RowStore, TableCheckpoint};
use crate::store::TableStore;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tabula_core::{Error, Result};

/// Global transaction ID counter.
static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

/// Transaction ID type.
pub type TransactionId = u64;

/// Transaction state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

/// A snapshot transaction over a `TableStore`.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    saved: BTreeMap<String, TableCheckpoint>,
    state: TransactionState,
}

impl Transaction {
    /// Captures the current state of every table.
    pub fn begin(store: &TableStore) -> Self {
        let saved = store
            .tables()
            .map(|table| (table.name().to_string(), table.checkpoint()))
            .collect();
        Self {
            id: NEXT_TX_ID.fetch_add(1, Ordering::SeqCst),
            saved,
            state: TransactionState::Active,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Number of tables captured at `begin`.
    pub fn table_count(&self) -> usize {
        self.saved.len()
    }

    fn check_active(&self) -> Result<()> {
        if self.state != TransactionState::Active {
            return Err(Error::invalid_input("transaction is not active"));
        }
        Ok(())
    }

    /// Keeps every mutation made since `begin` and drops the snapshot.
    pub fn commit(mut self) -> Result<()> {
        self.check_active()?;
        self.state = TransactionState::Committed;
        self.saved.clear();
        Ok(())
    }

    /// Restores every table to its state at `begin`.
    pub fn rollback(mut self, store: &mut TableStore) -> Result<()> {
        self.check_active()?;
        self.state = TransactionState::RolledBack;

        let tables = store.tables_mut();
        tables.clear();
        for (name, checkpoint) in std::mem::take(&mut self.saved) {
            let table = RowStore::from_checkpoint(name.as_str(), checkpoint);
            tables.insert(name, table);
        }
        Ok(())
    }
}
