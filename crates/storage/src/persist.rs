//! Persistence adapters.
//!
//! An adapter mirrors whole-store snapshots to some medium. Writes are not
//! crash-safe beyond the atomic rename used for single files.

use crate::snapshot::{DatabaseSnapshot, TableSnapshot};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tabula_core::{Error, Result};

/// Mirrors database snapshots to a storage medium.
pub trait PersistenceAdapter {
    /// Writes the snapshot. `table` names the only table that changed, when
    /// known; adapters may use it to write less.
    fn persist(&mut self, snapshot: &DatabaseSnapshot, table: Option<&str>) -> Result<()>;

    /// Reads the last persisted snapshot (empty when nothing was written).
    fn load(&mut self) -> Result<DatabaseSnapshot>;
}

/// Keeps the last snapshot in memory. Clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct MemoryAdapter {
    inner: Rc<RefCell<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: DatabaseSnapshot,
    persist_count: usize,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `snapshot` as the persisted state.
    pub fn with_snapshot(snapshot: DatabaseSnapshot) -> Self {
        let adapter = Self::new();
        adapter.inner.borrow_mut().snapshot = snapshot;
        adapter
    }

    /// Returns a copy of the last persisted snapshot.
    pub fn snapshot(&self) -> DatabaseSnapshot {
        self.inner.borrow().snapshot.clone()
    }

    /// Number of `persist` calls so far.
    pub fn persist_count(&self) -> usize {
        self.inner.borrow().persist_count
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn persist(&mut self, snapshot: &DatabaseSnapshot, table: Option<&str>) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        match table {
            Some(name) => match snapshot.get(name) {
                Some(t) => {
                    state.snapshot.insert(name.to_string(), t.clone());
                }
                None => {
                    state.snapshot.remove(name);
                }
            },
            None => state.snapshot = snapshot.clone(),
        }
        state.persist_count += 1;
        Ok(())
    }

    fn load(&mut self) -> Result<DatabaseSnapshot> {
        Ok(self.inner.borrow().snapshot.clone())
    }
}

/// Stores the whole snapshot in one JSON file.
#[derive(Clone, Debug)]
pub struct JsonFileAdapter {
    path: PathBuf,
}

impl JsonFileAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceAdapter for JsonFileAdapter {
    fn persist(&mut self, snapshot: &DatabaseSnapshot, _table: Option<&str>) -> Result<()> {
        write_json_atomic(&self.path, snapshot)?;
        tracing::debug!(path = %self.path.display(), tables = snapshot.len(), "persisted snapshot");
        Ok(())
    }

    fn load(&mut self) -> Result<DatabaseSnapshot> {
        if !self.path.exists() {
            return Ok(DatabaseSnapshot::new());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(DatabaseSnapshot::new());
        }
        serde_json::from_str(&text).map_err(|err| {
            Error::persistence(format!("{}: {err}", self.path.display()))
        })
    }
}

/// Stores each table in its own `<table>.json` file inside a directory.
#[derive(Clone, Debug)]
pub struct JsonDirectoryAdapter {
    dir: PathBuf,
}

const TABLE_EXT: &str = "json";

impl JsonDirectoryAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn table_path(&self, table: &str) -> Result<PathBuf> {
        let valid = !table.is_empty()
            && !table.starts_with('.')
            && !table.contains(['/', '\\', '\0']);
        if !valid {
            return Err(Error::persistence(format!(
                "table name {table:?} cannot be used as a file name"
            )));
        }
        Ok(self.dir.join(format!("{table}.{TABLE_EXT}")))
    }

    fn write_table(&self, name: &str, table: &TableSnapshot) -> Result<()> {
        write_json_atomic(&self.table_path(name)?, table)
    }

    fn remove_table(&self, name: &str) -> Result<()> {
        let path = self.table_path(name)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Table names with a file in the directory.
    fn stored_tables(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TABLE_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl PersistenceAdapter for JsonDirectoryAdapter {
    fn persist(&mut self, snapshot: &DatabaseSnapshot, table: Option<&str>) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        match table {
            Some(name) => match snapshot.get(name) {
                Some(t) => self.write_table(name, t)?,
                None => self.remove_table(name)?,
            },
            None => {
                for (name, t) in snapshot {
                    self.write_table(name, t)?;
                }
                for name in self.stored_tables()? {
                    if !snapshot.contains_key(&name) {
                        self.remove_table(&name)?;
                    }
                }
            }
        }
        tracing::debug!(dir = %self.dir.display(), table, "persisted tables");
        Ok(())
    }

    fn load(&mut self) -> Result<DatabaseSnapshot> {
        let mut snapshot = DatabaseSnapshot::new();
        for name in self.stored_tables()? {
            let path = self.table_path(&name)?;
            let text = fs::read_to_string(&path)?;
            let table: TableSnapshot = serde_json::from_str(&text)
                .map_err(|err| Error::persistence(format!("{}: {err}", path.display())))?;
            snapshot.insert(name, table);
        }
        Ok(snapshot)
    }
}

/// Writes pretty JSON to a sibling temp file, then renames it over `path`.
fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| Error::persistence(err.to_string()))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
