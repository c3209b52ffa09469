use std::collections::BTreeMap;

use super::{SettingStorage, StorageError};
use crate::setting::VersionedSetting;

/// Volatile backend. Used by tests and by `{"kind": "memory"}` configs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    settings: BTreeMap<String, VersionedSetting>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

impl SettingStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<VersionedSetting>, StorageError> {
        Ok(self.settings.get(key).cloned())
    }

    fn save(&mut self, setting: &VersionedSetting) -> Result<(), StorageError> {
        self.settings.insert(setting.key().to_string(), setting.clone());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, StorageError> {
        Ok(self.settings.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.settings.keys().cloned().collect())
    }
}
