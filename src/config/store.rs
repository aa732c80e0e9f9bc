//! Load and save profiles.json.
//!
//! Saves are atomic (write to a sibling temp file, then rename). A file
//! that fails to parse is moved aside instead of deleted so nothing the
//! user captured is ever silently destroyed.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::profile::{Profile, ProfilesRoot};
use crate::constants;
use crate::normalize::{normalize_path, normalize_url};

pub struct ProfileStore {
    path: PathBuf,
    pub data: ProfilesRoot,
}

impl ProfileStore {
    /// Default location under the platform config dir.
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::config::APP_DIR);
        path.push(constants::config::PROFILES_FILE);
        path
    }

    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: ProfilesRoot::default(),
        }
    }

    /// Load the file, creating defaults when missing and quarantining it
    /// when unreadable. Legacy data is repaired on the way in.
    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "profiles file not found, writing defaults");
            self.data = ProfilesRoot {
                version: 1,
                ..Default::default()
            };
            self.save()?;
            return Ok(());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        match serde_json::from_str::<ProfilesRoot>(&contents) {
            Ok(root) => {
                self.data = normalize_data(root);
                info!(profiles = self.data.profiles.len(), "profiles loaded");
                Ok(())
            }
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "profiles file unreadable, quarantining");
                let secs = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                let quarantine = self.path.with_file_name(format!(
                    "{}.broken.{secs}",
                    constants::config::PROFILES_FILE
                ));
                let _ = fs::rename(&self.path, &quarantine);
                self.data = ProfilesRoot {
                    version: 1,
                    ..Default::default()
                };
                self.save()?;
                Ok(())
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(&self.data).context("failed to serialize profiles")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    /// Insert or replace a profile by name.
    pub fn upsert_profile(&mut self, profile: Profile) -> Result<()> {
        match self
            .data
            .profiles
            .iter_mut()
            .find(|p| p.name == profile.name)
        {
            Some(existing) => *existing = profile,
            None => self.data.profiles.push(profile),
        }
        self.save()
    }

    pub fn delete_profile(&mut self, name: &str) -> Result<bool> {
        let before = self.data.profiles.len();
        self.data.profiles.retain(|p| p.name != name);
        let removed = self.data.profiles.len() != before;
        if removed {
            self.save()?;
        }
        Ok(removed)
    }
}

/// Repair legacy data: collapse doubled path separators and derive missing
/// URL keys. Files from before the version field get version 1.
fn normalize_data(mut root: ProfilesRoot) -> ProfilesRoot {
    if root.version == 0 {
        root.version = 1;
    }
    for profile in &mut root.profiles {
        for window in &mut profile.windows {
            window.path = normalize_path(&window.path);
            if window.rule.url_key.is_empty() && !window.rule.url.is_empty() {
                window.rule.url_key = normalize_url(&window.rule.url);
            }
        }
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::profile::{MatchRule, SavedWindow};

    fn temp_path(test: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("winkeep-tests")
            .join(format!("{}-{test}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir.join("profiles.json")
    }

    #[test]
    fn test_load_creates_defaults_when_missing() {
        let path = temp_path("create");
        let mut store = ProfileStore::new(path.clone());
        store.load().unwrap();

        assert!(path.exists());
        assert_eq!(store.data.version, 1);
        assert!(store.data.profiles.is_empty());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let path = temp_path("roundtrip");
        let mut store = ProfileStore::new(path.clone());
        store.load().unwrap();
        store
            .upsert_profile(Profile {
                id: "p1".to_string(),
                name: "Work".to_string(),
                sync: true,
                ..Default::default()
            })
            .unwrap();

        let mut reloaded = ProfileStore::new(path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.data.profiles.len(), 1);
        assert_eq!(reloaded.data.profiles[0].name, "Work");
        assert!(reloaded.data.profiles[0].sync);
    }

    #[test]
    fn test_unreadable_file_is_quarantined_not_lost() {
        let path = temp_path("broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ this is not json").unwrap();

        let mut store = ProfileStore::new(path.clone());
        store.load().unwrap();
        assert!(store.data.profiles.is_empty());

        // Fresh defaults were written and the broken original kept
        assert!(path.exists());
        let quarantined = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().contains(".broken."));
        assert!(quarantined);
    }

    #[test]
    fn test_load_repairs_legacy_fields() {
        let path = temp_path("legacy");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let json = r#"{
            "version": 0,
            "profiles": [{
                "name": "old",
                "windows": [{
                    "match": {"exe": "chrome.exe", "url": "HTTPS://Example.COM/p?q=1"},
                    "path": "C:\\\\apps\\\\chrome.exe",
                    "rect": {"x": 0, "y": 0, "w": 100, "h": 100},
                    "minMax": 0
                }]
            }]
        }"#;
        fs::write(&path, json).unwrap();

        let mut store = ProfileStore::new(path);
        store.load().unwrap();

        assert_eq!(store.data.version, 1);
        let window = &store.data.profiles[0].windows[0];
        assert_eq!(window.path, "C:\\apps\\chrome.exe");
        assert_eq!(window.rule.url_key, "https://example.com/p");
    }

    #[test]
    fn test_upsert_replaces_by_name_and_delete_removes() {
        let path = temp_path("upsert");
        let mut store = ProfileStore::new(path);
        store.load().unwrap();

        let make = |n: usize| Profile {
            name: "Work".to_string(),
            windows: vec![SavedWindow {
                rule: MatchRule {
                    exe: format!("app{n}.exe"),
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        };

        store.upsert_profile(make(1)).unwrap();
        store.upsert_profile(make(2)).unwrap();
        assert_eq!(store.data.profiles.len(), 1);
        assert_eq!(store.data.profiles[0].windows[0].rule.exe, "app2.exe");

        assert!(store.delete_profile("Work").unwrap());
        assert!(!store.delete_profile("Work").unwrap());
        assert!(store.data.profiles.is_empty());
    }
}
