// Configuration Snapshot
//
// Data shape for point-in-time exports. There is no store read/write path
// for snapshots yet; this only defines what a captured snapshot holds.

use serde::{Deserialize, Serialize};

use super::{SettingError, VersionedSetting};

/// Single-version copies of settings as they were at capture time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationSnapshot {
    #[serde(rename = "snapshots")]
    pub settings: Vec<VersionedSetting>,
}

impl ConfigurationSnapshot {
    /// Capture the head version of every given setting.
    pub fn capture<'a, I>(settings: I) -> Result<Self, SettingError>
    where
        I: IntoIterator<Item = &'a VersionedSetting>,
    {
        let settings = settings
            .into_iter()
            .map(VersionedSetting::head_copy)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { settings })
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_keeps_head_versions_only() {
        let mut a = VersionedSetting::new("a", "a1");
        a.append_version("a2");
        let b = VersionedSetting::new("b", "b1");

        let snapshot = ConfigurationSnapshot::capture([&a, &b]).unwrap();

        assert!(!snapshot.is_empty());
        assert_eq!(snapshot.settings.len(), 2);
        assert!(snapshot.settings.iter().all(|s| s.versions().len() == 1));
        assert_eq!(snapshot.settings[0].latest().unwrap().value, "a2");
    }

    #[test]
    fn capture_of_nothing_is_empty() {
        let none = std::iter::empty::<&VersionedSetting>();
        let snapshot = ConfigurationSnapshot::capture(none).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn capture_fails_on_empty_history() {
        let broken: VersionedSetting =
            serde_json::from_str(r#"{ "key": "x", "versions": [], "locked": true }"#).unwrap();

        assert!(ConfigurationSnapshot::capture([&broken]).is_err());
    }
}
