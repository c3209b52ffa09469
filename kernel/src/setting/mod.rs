// Versioned Setting Model
//
// A setting is a named value with an append-only version history.
// New versions are prepended, so the head of the history is always the
// latest value. This module is pure: no I/O, no locking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod snapshot;

pub use snapshot::ConfigurationSnapshot;

/// One immutable recorded value of a setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub value: String,
    pub created_at: DateTime<Utc>,
    /// External reference only. Never used for ordering.
    pub id: Uuid,
}

impl VersionRecord {
    fn new(value: String, created_at: DateTime<Utc>) -> Self {
        Self {
            value,
            created_at,
            id: Uuid::new_v4(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingError {
    #[error("setting `{key}` has no versions")]
    EmptyHistory { key: String },
}

/// A key's full version history plus its lock flag.
///
/// Versions are ordered newest-first. A setting built through [`VersionedSetting::new`]
/// always holds at least one version; only a corrupted persisted document can
/// violate that, which [`VersionedSetting::latest`] reports as
/// [`SettingError::EmptyHistory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedSetting {
    key: String,
    versions: Vec<VersionRecord>,
    locked: bool,
}

impl VersionedSetting {
    /// Create a setting with a single initial version.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut setting = Self {
            key: key.into(),
            versions: Vec::new(),
            locked: false,
        };
        setting.append_version(value);
        setting
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Full history, newest first.
    pub fn versions(&self) -> &[VersionRecord] {
        &self.versions
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Prepend a new head version and return it.
    ///
    /// The new timestamp never precedes the previous head's, even if the
    /// wall clock stepped backwards. Lock state is not checked here; that is
    /// the store's job.
    pub fn append_version(&mut self, value: impl Into<String>) -> &VersionRecord {
        let now = Utc::now();
        let created_at = match self.versions.first() {
            Some(head) if head.created_at > now => head.created_at,
            _ => now,
        };

        self.versions.insert(0, VersionRecord::new(value.into(), created_at));
        &self.versions[0]
    }

    /// The head version.
    pub fn latest(&self) -> Result<&VersionRecord, SettingError> {
        self.versions.first().ok_or_else(|| SettingError::EmptyHistory {
            key: self.key.clone(),
        })
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Copy of this setting carrying only its head version.
    pub fn head_copy(&self) -> Result<Self, SettingError> {
        let head = self.latest()?.clone();
        Ok(Self {
            key: self.key.clone(),
            versions: vec![head],
            locked: self.locked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_setting_has_one_version() {
        let setting = VersionedSetting::new("k", "v1");

        assert_eq!(setting.key(), "k");
        assert_eq!(setting.versions().len(), 1);
        assert_eq!(setting.latest().unwrap().value, "v1");
        assert!(!setting.is_locked());
    }

    #[test]
    fn append_prepends_new_head() {
        let mut setting = VersionedSetting::new("k", "v1");
        setting.append_version("v2");
        setting.append_version("v3");

        let values: Vec<_> = setting.versions().iter().map(|v| v.value.as_str()).collect();
        assert_eq!(values, vec!["v3", "v2", "v1"]);
        assert_eq!(setting.latest().unwrap().value, "v3");
    }

    #[test]
    fn timestamps_are_monotonic_and_ids_unique() {
        let mut setting = VersionedSetting::new("k", "v1");
        for i in 2..=20 {
            setting.append_version(format!("v{i}"));
        }

        let versions = setting.versions();
        for pair in versions.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
            assert_ne!(pair[0].id, pair[1].id);
        }
    }

    #[test]
    fn append_clamps_to_future_head_timestamp() {
        let future = Utc::now() + chrono::Duration::hours(1);
        let mut setting: VersionedSetting = serde_json::from_value(serde_json::json!({
            "key": "k",
            "versions": [{
                "value": "v1",
                "created_at": future,
                "id": Uuid::new_v4(),
            }],
            "locked": false,
        }))
        .unwrap();

        let head = setting.append_version("v2").clone();
        assert_eq!(head.created_at, future);
    }

    #[test]
    fn empty_history_is_reported() {
        let setting: VersionedSetting = serde_json::from_str(
            r#"{ "key": "broken", "versions": [], "locked": false }"#,
        )
        .unwrap();

        let err = setting.latest().unwrap_err();
        assert_eq!(
            err,
            SettingError::EmptyHistory {
                key: "broken".into()
            }
        );
    }

    #[test]
    fn lock_flag_does_not_touch_history() {
        let mut setting = VersionedSetting::new("k", "v1");
        setting.lock();
        setting.lock();
        assert!(setting.is_locked());
        assert_eq!(setting.versions().len(), 1);

        setting.unlock();
        assert!(!setting.is_locked());
        assert_eq!(setting.versions().len(), 1);
    }

    #[test]
    fn head_copy_keeps_only_latest() {
        let mut setting = VersionedSetting::new("k", "v1");
        setting.append_version("v2");
        setting.lock();

        let copy = setting.head_copy().unwrap();
        assert_eq!(copy.versions().len(), 1);
        assert_eq!(copy.latest().unwrap(), setting.latest().unwrap());
        assert!(copy.is_locked());
    }
}
