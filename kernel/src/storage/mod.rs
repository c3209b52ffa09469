// Setting Storage Abstraction
//
// Defines the durability contract for persisted settings.
// The configuration store owns exactly one backend and serializes every
// call into it, so implementations need no internal locking.

use crate::setting::VersionedSetting;

mod file;
mod memory;

pub use file::JsonFileStorage;
pub use memory::MemoryStorage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Storage backend for settings, keyed by setting key.
///
/// Implementations MUST:
/// - Store each setting as one document, replaced whole on `save`
/// - Keep a key either fully present or fully absent
/// - Return settings exactly as saved (history order included)
pub trait SettingStorage: Send {
    /// Look up a setting by key.
    fn load(&self, key: &str) -> Result<Option<VersionedSetting>, StorageError>;

    /// Insert or replace the document for `setting.key()`.
    fn save(&mut self, setting: &VersionedSetting) -> Result<(), StorageError>;

    /// Remove a setting. Returns whether it existed.
    fn remove(&mut self, key: &str) -> Result<bool, StorageError>;

    /// Every stored key, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

impl<S: SettingStorage + ?Sized> SettingStorage for Box<S> {
    fn load(&self, key: &str) -> Result<Option<VersionedSetting>, StorageError> {
        (**self).load(key)
    }

    fn save(&mut self, setting: &VersionedSetting) -> Result<(), StorageError> {
        (**self).save(setting)
    }

    fn remove(&mut self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        (**self).keys()
    }
}
