//! Database configuration.
//!
//! `DatabaseConfig` deserializes from the camelCase JSON shape:
//!
//! ```json
//! {
//!   "storageMode": "file",
//!   "path": "data/app.json",
//!   "timestamps": true,
//!   "softDelete": false,
//!   "logging": true,
//!   "performance": true,
//!   "autoIndex": true,
//!   "chunkSize": 1000,
//!   "defaultData": { "users": [{ "name": "admin" }] }
//! }
//! ```
//!
//! A log callback cannot come from JSON; set it with
//! [`DatabaseConfig::log_to`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use tabula_core::{Record, Result};

/// Default rows per index flush in `bulk_insert`.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// File used by `StorageMode::File` when no path is set.
pub const DEFAULT_FILE_PATH: &str = "tabula.json";
/// Directory used by `StorageMode::Folder` when no path is set.
pub const DEFAULT_FOLDER_PATH: &str = "tabula_data";

/// Where tables are mirrored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Nothing is persisted.
    #[default]
    Memory,
    /// One JSON file holding every table.
    File,
    /// One JSON file per table inside a directory.
    Folder,
}

/// Log sink for database events.
#[derive(Clone, Default)]
pub enum Logging {
    #[default]
    Off,
    /// `tracing` debug events.
    Tracing,
    /// `tracing` events plus a user callback receiving each message.
    Callback(Rc<dyn Fn(&str)>),
}

impl Logging {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Logging::Off)
    }
}

impl fmt::Debug for Logging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logging::Off => f.write_str("Off"),
            Logging::Tracing => f.write_str("Tracing"),
            Logging::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<bool> for Logging {
    fn from(enabled: bool) -> Self {
        if enabled {
            Logging::Tracing
        } else {
            Logging::Off
        }
    }
}

impl Serialize for Logging {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_bool(self.is_enabled())
    }
}

impl<'de> Deserialize<'de> for Logging {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        bool::deserialize(deserializer).map(Logging::from)
    }
}

/// Options recognized by `Database`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    pub storage_mode: StorageMode,
    /// File or directory for the persistent storage modes.
    pub path: Option<PathBuf>,
    /// Stamp `created_at` / `updated_at`.
    pub timestamps: bool,
    /// Mark deletions with `deleted_at` instead of removing records.
    pub soft_delete: bool,
    pub logging: Logging,
    /// Index-assisted lookups and chunked bulk inserts.
    pub performance: bool,
    /// Index `id` and every indexed schema field on `create_table`.
    pub auto_index: bool,
    pub chunk_size: usize,
    /// Rows for tables that do not exist after loading.
    pub default_data: BTreeMap<String, Vec<Record>>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            storage_mode: StorageMode::Memory,
            path: None,
            timestamps: false,
            soft_delete: false,
            logging: Logging::Off,
            performance: true,
            auto_index: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            default_data: BTreeMap::new(),
        }
    }
}

impl DatabaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Mirrors every table into one JSON file.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_mode = StorageMode::File;
        self.path = Some(path.into());
        self
    }

    /// Mirrors each table into its own file under `dir`.
    pub fn folder(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_mode = StorageMode::Folder;
        self.path = Some(dir.into());
        self
    }

    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn soft_delete(mut self, enabled: bool) -> Self {
        self.soft_delete = enabled;
        self
    }

    pub fn logging(mut self, logging: impl Into<Logging>) -> Self {
        self.logging = logging.into();
        self
    }

    /// Sends every log message to `sink`.
    pub fn log_to<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + 'static,
    {
        self.logging = Logging::Callback(Rc::new(sink));
        self
    }

    pub fn performance(mut self, enabled: bool) -> Self {
        self.performance = enabled;
        self
    }

    pub fn auto_index(mut self, enabled: bool) -> Self {
        self.auto_index = enabled;
        self
    }

    pub fn chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = rows;
        self
    }

    /// Seeds `table` with `rows` when it does not exist after loading.
    pub fn default_table(mut self, table: impl Into<String>, rows: Vec<Record>) -> Self {
        self.default_data.insert(table.into(), rows);
        self
    }

    /// Path for the configured storage mode, with defaults applied.
    pub fn storage_path(&self) -> Option<PathBuf> {
        match self.storage_mode {
            StorageMode::Memory => None,
            StorageMode::File => Some(
                self.path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_PATH)),
            ),
            StorageMode::Folder => Some(
                self.path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_FOLDER_PATH)),
            ),
        }
    }

    /// Rows per index flush; never zero.
    pub(crate) fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.storage_mode, StorageMode::Memory);
        assert!(config.performance);
        assert!(config.auto_index);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(!config.logging.is_enabled());
        assert_eq!(config.storage_path(), None);
    }

    #[test]
    fn test_from_json() {
        let config = DatabaseConfig::from_json(
            r#"{
                "storageMode": "folder",
                "softDelete": true,
                "logging": true,
                "chunkSize": 50,
                "defaultData": {"users": [{"name": "admin"}]}
            }"#,
        )
        .unwrap();
        assert_eq!(config.storage_mode, StorageMode::Folder);
        assert!(config.soft_delete);
        assert!(config.logging.is_enabled());
        assert_eq!(config.chunk_size, 50);
        assert!(config.performance);
        assert_eq!(config.default_data["users"].len(), 1);
        assert_eq!(config.storage_path(), Some(PathBuf::from(DEFAULT_FOLDER_PATH)));
    }

    #[test]
    fn test_from_json_rejects_unknown_mode() {
        assert!(DatabaseConfig::from_json(r#"{"storageMode": "browser"}"#).is_err());
    }

    #[test]
    fn test_builder() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let config = DatabaseConfig::new()
            .file("db.json")
            .timestamps(true)
            .chunk_size(0)
            .log_to(move |msg| sink.borrow_mut().push(msg.to_string()));

        assert_eq!(config.storage_path(), Some(PathBuf::from("db.json")));
        assert_eq!(config.effective_chunk_size(), 1);
        match &config.logging {
            Logging::Callback(f) => f("hello"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(seen.borrow().as_slice(), ["hello"]);
    }

    #[test]
    fn test_logging_serializes_as_bool() {
        let json = serde_json::to_value(DatabaseConfig::new().logging(true)).unwrap();
        assert_eq!(json["logging"], serde_json::json!(true));
        assert_eq!(json["storageMode"], serde_json::json!("memory"));
    }
}
