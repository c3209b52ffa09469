// Configuration Store
//
// Single source of truth for all settings. Every operation, read or
// write, runs inside one global critical section that also covers the
// storage call, so the store is linearizable at whole-store granularity.
//
// The only mutation primitive is read-modify-replace: load the current
// document, transform an owned copy, save it back. Nothing outside the
// critical section can observe the intermediate state.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::filter::{Filter, FilterError};
use crate::setting::{SettingError, VersionRecord, VersionedSetting};
use crate::storage::{MemoryStorage, SettingStorage, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("setting `{key}` does not exist")]
    NotFound { key: String },

    #[error("setting `{key}` already exists")]
    AlreadyExists { key: String },

    #[error("setting `{key}` is locked")]
    Locked { key: String },

    /// A stored setting has no versions. Indicates a defect or a corrupted
    /// backend, never a normal user error.
    #[error("internal consistency fault: {0}")]
    EmptyHistory(#[from] SettingError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("storage {operation} failed for `{key}`: {source}")]
    Storage {
        operation: &'static str,
        key: String,
        #[source]
        source: StorageError,
    },
}

impl StoreError {
    /// Whether the error describes a bad request rather than a fault.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidKey(_)
                | StoreError::NotFound { .. }
                | StoreError::AlreadyExists { .. }
                | StoreError::Locked { .. }
                | StoreError::Filter(_)
        )
    }
}

/// Head-version view of one setting, as returned by [`ConfigStore::search`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
    pub last_modified: DateTime<Utc>,
    pub locked: bool,
}

/// Versioned key/value store over a [`SettingStorage`] backend.
///
/// Share it between threads behind an `Arc`; every method takes `&self`.
pub struct ConfigStore<S = Box<dyn SettingStorage>> {
    storage: Mutex<S>,
}

impl ConfigStore<MemoryStorage> {
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }
}

impl<S: SettingStorage> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage: Mutex::new(storage),
        }
    }

    /// Write a new value. Creates the setting on first write, otherwise
    /// prepends a new head version. Fails if the setting is locked.
    pub fn put(
        &self,
        key: &str,
        value: impl Into<String>,
    ) -> Result<VersionedSetting, StoreError> {
        validate_key(key)?;
        let value = value.into();
        let mut storage = self.storage.lock();

        if load(&*storage, key, "put")?.is_none() {
            debug!("Setting does not exist, creating: {}", key);
            return create_in(&mut *storage, key, value);
        }

        update_in(&mut *storage, key, "put", |setting| {
            if setting.is_locked() {
                warn!("Rejected write to locked setting: {}", key);
                return Err(StoreError::Locked {
                    key: key.to_string(),
                });
            }
            setting.append_version(value);
            Ok(())
        })
    }

    /// Create a setting that must not already exist.
    pub fn create(
        &self,
        key: &str,
        value: impl Into<String>,
    ) -> Result<VersionedSetting, StoreError> {
        validate_key(key)?;
        let mut storage = self.storage.lock();

        if load(&*storage, key, "create")?.is_some() {
            return Err(StoreError::AlreadyExists {
                key: key.to_string(),
            });
        }

        create_in(&mut *storage, key, value.into())
    }

    /// Value of the latest version.
    pub fn get(&self, key: &str) -> Result<String, StoreError> {
        let record = self.latest_version(key)?;
        Ok(record.value)
    }

    /// Latest version record: value, timestamp and id.
    pub fn latest_version(&self, key: &str) -> Result<VersionRecord, StoreError> {
        validate_key(key)?;
        let storage = self.storage.lock();

        let setting = require(&*storage, key, "get")?;
        let record = head(&setting)?.clone();
        debug!("get({}) = {}", key, record.value);
        Ok(record)
    }

    /// Full setting including its version history.
    pub fn setting(&self, key: &str) -> Result<VersionedSetting, StoreError> {
        validate_key(key)?;
        let storage = self.storage.lock();
        require(&*storage, key, "get")
    }

    /// Remove a setting and its whole history.
    ///
    /// Deleting is allowed while the setting is locked: the lock guards
    /// version creation only.
    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut storage = self.storage.lock();

        let removed = storage.remove(key).map_err(|source| StoreError::Storage {
            operation: "delete",
            key: key.to_string(),
            source,
        })?;

        if !removed {
            return Err(StoreError::NotFound {
                key: key.to_string(),
            });
        }

        info!("Deleted setting: {}", key);
        Ok(())
    }

    /// Make a setting read-only. Idempotent.
    pub fn lock(&self, key: &str) -> Result<VersionedSetting, StoreError> {
        validate_key(key)?;
        let mut storage = self.storage.lock();

        let setting = update_in(&mut *storage, key, "lock", |setting| {
            setting.lock();
            Ok(())
        })?;
        info!("Locked setting: {}", key);
        Ok(setting)
    }

    /// Make a setting writable again. Idempotent.
    pub fn unlock(&self, key: &str) -> Result<VersionedSetting, StoreError> {
        validate_key(key)?;
        let mut storage = self.storage.lock();

        let setting = update_in(&mut *storage, key, "unlock", |setting| {
            setting.unlock();
            Ok(())
        })?;
        info!("Unlocked setting: {}", key);
        Ok(setting)
    }

    /// Every present key, sorted.
    pub fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        self.list_keys_matching(&Filter::All)
    }

    /// Present keys accepted by `filter`, sorted.
    pub fn list_keys_matching(&self, filter: &Filter) -> Result<Vec<String>, StoreError> {
        let storage = self.storage.lock();
        sorted_keys(&*storage, filter)
    }

    /// Head values of every setting whose key matches `filter`, sorted by key.
    ///
    /// All settings are read inside one critical section, so the result is a
    /// consistent view with respect to concurrent writers.
    pub fn search(&self, filter: &Filter) -> Result<Vec<KeyValue>, StoreError> {
        let storage = self.storage.lock();

        let keys = sorted_keys(&*storage, filter)?;
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let setting = require(&*storage, &key, "search")?;
            let record = head(&setting)?;
            values.push(KeyValue {
                value: record.value.clone(),
                last_modified: record.created_at,
                locked: setting.is_locked(),
                key,
            });
        }

        Ok(values)
    }
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("key must not be empty".into()));
    }
    Ok(())
}

fn storage_error(operation: &'static str, key: &str) -> impl FnOnce(StorageError) -> StoreError {
    let key = key.to_string();
    move |source| StoreError::Storage {
        operation,
        key,
        source,
    }
}

fn load<S: SettingStorage + ?Sized>(
    storage: &S,
    key: &str,
    operation: &'static str,
) -> Result<Option<VersionedSetting>, StoreError> {
    storage.load(key).map_err(storage_error(operation, key))
}

fn require<S: SettingStorage + ?Sized>(
    storage: &S,
    key: &str,
    operation: &'static str,
) -> Result<VersionedSetting, StoreError> {
    load(storage, key, operation)?.ok_or_else(|| StoreError::NotFound {
        key: key.to_string(),
    })
}

fn head(setting: &VersionedSetting) -> Result<&VersionRecord, StoreError> {
    setting.latest().map_err(|err| {
        error!("Stored setting violates the non-empty history invariant: {}", err);
        StoreError::from(err)
    })
}

fn sorted_keys<S: SettingStorage + ?Sized>(
    storage: &S,
    filter: &Filter,
) -> Result<Vec<String>, StoreError> {
    let keys = storage.keys().map_err(storage_error("list", "*"))?;
    let mut keys = filter.apply(keys);
    keys.sort();
    Ok(keys)
}

fn create_in<S: SettingStorage + ?Sized>(
    storage: &mut S,
    key: &str,
    value: String,
) -> Result<VersionedSetting, StoreError> {
    let setting = VersionedSetting::new(key, value);
    storage.save(&setting).map_err(storage_error("create", key))?;

    info!("Created setting: {}", key);
    Ok(setting)
}

/// Read-modify-replace. The caller must hold the store lock.
///
/// `apply` works on an owned copy; nothing is saved if it fails. A stored
/// setting with no versions is reported, never written back.
fn update_in<S, F>(
    storage: &mut S,
    key: &str,
    operation: &'static str,
    apply: F,
) -> Result<VersionedSetting, StoreError>
where
    S: SettingStorage + ?Sized,
    F: FnOnce(&mut VersionedSetting) -> Result<(), StoreError>,
{
    let mut setting = require(storage, key, operation)?;
    head(&setting)?;
    apply(&mut setting)?;
    storage.save(&setting).map_err(storage_error(operation, key))?;
    Ok(setting)
}
