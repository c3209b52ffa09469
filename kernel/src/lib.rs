// Appconf Kernel
//
// Versioned configuration store: append-only setting history, per-key
// locking, and key filtering.

pub mod config;
pub mod filter;
pub mod setting;
pub mod storage;
pub mod store;

pub use config::{ConfigError, StorageConfig, StoreConfig};
pub use filter::{Filter, FilterError};
pub use setting::{ConfigurationSnapshot, SettingError, VersionRecord, VersionedSetting};
pub use storage::{JsonFileStorage, MemoryStorage, SettingStorage, StorageError};
pub use store::{ConfigStore, KeyValue, StoreError};
