// JSON File Backend
//
// All settings live in one JSON document on disk. The document is read
// once on open and rewritten on every mutation through a temporary
// sibling file and an atomic rename, so a crash never leaves a torn file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{SettingStorage, StorageError};
use crate::setting::VersionedSetting;

type Document = BTreeMap<String, VersionedSetting>;

#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    settings: Document,
}

impl JsonFileStorage {
    /// Open the document at `path`, creating it (and its directory) if needed.
    ///
    /// Opening an existing document never modifies it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let settings = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Document::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            let empty = Document::new();
            write_document(&path, &empty)?;
            info!("Created settings document at {}", path.display());
            empty
        };

        for (key, setting) in &settings {
            if key != setting.key() {
                return Err(StorageError::Backend(format!(
                    "document entry `{}` holds setting `{}`",
                    key,
                    setting.key()
                )));
            }
        }

        debug!("Opened {} with {} settings", path.display(), settings.len());

        Ok(Self { path, settings })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&mut self, next: Document) -> Result<(), StorageError> {
        write_document(&self.path, &next)?;
        self.settings = next;
        Ok(())
    }
}

fn write_document(path: &Path, document: &Document) -> Result<(), StorageError> {
    let content = serde_json::to_string_pretty(document)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

impl SettingStorage for JsonFileStorage {
    fn load(&self, key: &str) -> Result<Option<VersionedSetting>, StorageError> {
        Ok(self.settings.get(key).cloned())
    }

    fn save(&mut self, setting: &VersionedSetting) -> Result<(), StorageError> {
        let mut next = self.settings.clone();
        next.insert(setting.key().to_string(), setting.clone());
        self.commit(next)
    }

    fn remove(&mut self, key: &str) -> Result<bool, StorageError> {
        if !self.settings.contains_key(key) {
            return Ok(false);
        }

        let mut next = self.settings.clone();
        next.remove(key);
        self.commit(next)?;
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.settings.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_directory_and_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let storage = JsonFileStorage::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(storage.path(), path.as_path());
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut storage = JsonFileStorage::open(&path).unwrap();
        storage.save(&VersionedSetting::new("k", "v")).unwrap();
        drop(storage);

        let storage = JsonFileStorage::open(&path).unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["k"]);
    }

    #[test]
    fn mutations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut setting = VersionedSetting::new("app.url", "http://a");
        setting.append_version("http://b");
        setting.lock();

        {
            let mut storage = JsonFileStorage::open(&path).unwrap();
            storage.save(&setting).unwrap();
            storage.save(&VersionedSetting::new("gone", "x")).unwrap();
            assert!(storage.remove("gone").unwrap());
        }

        let storage = JsonFileStorage::open(&path).unwrap();
        assert_eq!(storage.load("app.url").unwrap(), Some(setting));
        assert!(storage.load("gone").unwrap().is_none());
    }

    #[test]
    fn corrupt_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStorage::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Json(_)));
    }

    #[test]
    fn mismatched_entry_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut document = Document::new();
        document.insert("a".into(), VersionedSetting::new("b", "v"));
        write_document(&path, &document).unwrap();

        let err = JsonFileStorage::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
    }
}
