// Store Configuration
//
// Selects and opens the storage backend. Loaded from JSON; the built-in
// default keeps settings in `.appconf/settings.json` under the working
// directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::{JsonFileStorage, MemoryStorage, SettingStorage, StorageError};
use crate::store::ConfigStore;

pub const DEFAULT_DATA_FILE: &str = ".appconf/settings.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to open storage: {0}")]
    Storage(#[from] StorageError),
}

/// Backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Nothing survives the process.
    Memory,

    /// Single JSON document on disk.
    File { path: PathBuf },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::File {
            path: PathBuf::from(DEFAULT_DATA_FILE),
        }
    }
}

/// Store configuration loaded from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub storage: StorageConfig,
}

impl StoreConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Point file storage at `path`, whatever the configured backend was.
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage = StorageConfig::File { path: path.into() };
        self
    }

    pub fn open_storage(&self) -> Result<Box<dyn SettingStorage>, ConfigError> {
        let storage: Box<dyn SettingStorage> = match &self.storage {
            StorageConfig::Memory => Box::new(MemoryStorage::new()),
            StorageConfig::File { path } => Box::new(JsonFileStorage::open(path)?),
        };
        Ok(storage)
    }

    pub fn open_store(&self) -> Result<ConfigStore, ConfigError> {
        Ok(ConfigStore::new(self.open_storage()?))
    }
}
