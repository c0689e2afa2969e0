//! Settings persistence for DropLauncher.
//!
//! Settings are flat key/value strings grouped by section. The
//! [`SettingsStore`] trait is the only thing the rest of the crate depends on;
//! [`YamlSettingsStore`] backs it with a plain-text YAML file and
//! [`MemoryStore`] keeps everything in memory.

use crate::models::{DROPLAUNCHER_SECTION, LauncherKey, LauncherSettings};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;
use thiserror::Error;

/// Sections in file order, each an ordered map of key to value.
pub type Sections = IndexMap<String, IndexMap<String, String>>;

/// Errors raised by a settings backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write settings file {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        source: serde_yaml_ng::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_yaml_ng::Error),
}

/// Key/value settings grouped by section.
///
/// `set` must be durable by the time it returns: callers rely on the store
/// never lagging behind the in-memory configuration.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore {
    fn get(&self, section: &str, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&mut self, section: &str, key: &str, value: &str) -> Result<(), StoreError>;

    fn has_value(&self, section: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(section, key)?.is_some())
    }

    fn remove(&mut self, section: &str, key: &str) -> Result<(), StoreError>;

    /// Remove every section.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// In-memory settings, for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sections: Sections,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &Sections {
        &self.sections
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, section: &str, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lookup(&self.sections, section, key))
    }

    fn set(&mut self, section: &str, key: &str, value: &str) -> Result<(), StoreError> {
        insert(&mut self.sections, section, key, value);
        Ok(())
    }

    fn remove(&mut self, section: &str, key: &str) -> Result<(), StoreError> {
        delete(&mut self.sections, section, key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.sections.clear();
        Ok(())
    }
}

/// Settings persisted to a YAML file of `section -> {key: value}`.
///
/// The whole file is rewritten on every mutation.
#[derive(Debug, Clone)]
pub struct YamlSettingsStore {
    path: Utf8PathBuf,
    sections: Sections,
}

impl YamlSettingsStore {
    /// Open the settings file at `path`, starting empty if it doesn't exist.
    pub fn open<P: AsRef<Utf8Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            tracing::warn!("Settings file not found at {}, starting empty", path);
            return Ok(Self {
                path,
                sections: Sections::new(),
            });
        }

        let contents = fs::read_to_string(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;

        let sections: Sections = if contents.trim().is_empty() {
            Sections::new()
        } else {
            serde_yaml_ng::from_str(&contents).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?
        };

        tracing::info!("Loaded settings from {}", path);
        Ok(Self { path, sections })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn sections(&self) -> &Sections {
        &self.sections
    }

    fn save(&self) -> Result<(), StoreError> {
        let yaml_string = serde_yaml_ng::to_string(&self.sections)?;

        fs::write(&self.path, yaml_string).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!("Saved settings to {}", self.path);
        Ok(())
    }
}

impl SettingsStore for YamlSettingsStore {
    fn get(&self, section: &str, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lookup(&self.sections, section, key))
    }

    fn set(&mut self, section: &str, key: &str, value: &str) -> Result<(), StoreError> {
        insert(&mut self.sections, section, key, value);
        self.save()
    }

    fn remove(&mut self, section: &str, key: &str) -> Result<(), StoreError> {
        if delete(&mut self.sections, section, key) {
            self.save()?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.sections.clear();
        self.save()
    }
}

fn lookup(sections: &Sections, section: &str, key: &str) -> Option<String> {
    sections.get(section).and_then(|s| s.get(key)).cloned()
}

fn insert(sections: &mut Sections, section: &str, key: &str, value: &str) {
    sections
        .entry(section.to_string())
        .or_default()
        .insert(key.to_string(), value.to_string());
}

fn delete(sections: &mut Sections, section: &str, key: &str) -> bool {
    sections
        .get_mut(section)
        .is_some_and(|s| s.shift_remove(key).is_some())
}

/// Read `<base>0`, `<base>1`, ... until the first missing index.
///
/// Entries after a gap are not reached.
pub fn read_indexed<S: SettingsStore + ?Sized>(
    store: &S,
    section: &str,
    base: &str,
) -> Result<Vec<String>, StoreError> {
    let mut values = Vec::new();
    while let Some(value) = store.get(section, &format!("{}{}", base, values.len()))? {
        values.push(value);
    }
    Ok(values)
}

/// Write `values` as `<base>0..<base>n` and drop the stale run that follows.
pub fn write_indexed<S: SettingsStore + ?Sized>(
    store: &mut S,
    section: &str,
    base: &str,
    values: &[String],
) -> Result<(), StoreError> {
    for (index, value) in values.iter().enumerate() {
        store.set(section, &format!("{}{}", base, index), value)?;
    }

    let mut index = values.len();
    while store.has_value(section, &format!("{}{}", base, index))? {
        store.remove(section, &format!("{}{}", base, index))?;
        index += 1;
    }
    Ok(())
}

/// Outcome of [`ensure_default_settings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsCheck {
    /// Settings were already written by this version (or are brand new).
    Current,
    /// Settings came from another version and were wiped.
    VersionChanged { previous: String, current: String },
}

/// Make sure the launcher section exists and belongs to this version.
///
/// Settings written by a different version are cleared entirely before the
/// defaults are written back.
pub fn ensure_default_settings<S: SettingsStore + ?Sized>(
    store: &mut S,
    current_version: &str,
) -> Result<SettingsCheck, StoreError> {
    let version_key = LauncherKey::Version.as_str();

    let check = match store.get(DROPLAUNCHER_SECTION, version_key)? {
        Some(previous) if !previous.eq_ignore_ascii_case(current_version) => {
            tracing::warn!(
                "Settings were written by version {}, running {}; clearing all settings",
                previous,
                current_version
            );
            store.clear()?;
            SettingsCheck::VersionChanged {
                previous,
                current: current_version.to_string(),
            }
        }
        _ => SettingsCheck::Current,
    };

    if !store.has_value(DROPLAUNCHER_SECTION, version_key)? {
        store.set(DROPLAUNCHER_SECTION, version_key, current_version)?;
    }

    for (key, default) in LauncherKey::TOGGLE_DEFAULTS {
        if !store.has_value(DROPLAUNCHER_SECTION, key.as_str())? {
            store.set(DROPLAUNCHER_SECTION, key.as_str(), &default.to_string())?;
        }
    }

    Ok(check)
}

/// Read the launcher section, falling back to defaults for missing or
/// unparsable values.
pub fn load_launcher_settings<S: SettingsStore + ?Sized>(
    store: &S,
) -> Result<LauncherSettings, StoreError> {
    let defaults = LauncherSettings::default();
    let flag = |key: LauncherKey, default: bool| -> Result<bool, StoreError> {
        Ok(store
            .get(DROPLAUNCHER_SECTION, key.as_str())?
            .and_then(|v| v.trim().parse::<bool>().ok())
            .unwrap_or(default))
    };

    Ok(LauncherSettings {
        version: store
            .get(DROPLAUNCHER_SECTION, LauncherKey::Version.as_str())?
            .unwrap_or(defaults.version),
        auto_eject_bot: flag(LauncherKey::AutoEjectBot, defaults.auto_eject_bot)?,
        auto_bot_rejoin: flag(LauncherKey::AutoBotRejoin, defaults.auto_bot_rejoin)?,
        show_log_window: flag(LauncherKey::ShowLogWindow, defaults.show_log_window)?,
        clean_starcraft_dir: flag(LauncherKey::CleanStarcraftDir, defaults.clean_starcraft_dir)?,
        warn_unknown_bwapi_dll: flag(
            LauncherKey::WarnUnknownBwapiDll,
            defaults.warn_unknown_bwapi_dll,
        )?,
        copy_write_read: flag(LauncherKey::CopyWriteRead, defaults.copy_write_read)?,
    })
}

/// Settings manager for locating and opening the settings file.
///
/// The settings file lives in a data directory next to the launcher
/// (`DropLauncher Data/droplauncher.yaml` by default).
#[derive(Debug, Clone)]
pub struct SettingsManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl SettingsManager {
    pub const DEFAULT_DIR: &'static str = "DropLauncher Data";
    pub const SETTINGS_FILE: &'static str = "droplauncher.yaml";

    /// Create a manager for `config_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();
        Self::with_settings_path(config_dir.join(Self::SETTINGS_FILE))
    }

    /// Create a manager for an explicit settings file path.
    pub fn with_settings_path<P: AsRef<Utf8Path>>(settings_path: P) -> Result<Self> {
        let settings_path = settings_path.as_ref().to_path_buf();
        let config_dir = settings_path
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_dir,
            settings_path,
        })
    }

    /// Open the store and bring the launcher section up to date.
    pub fn open_store(&self) -> Result<(YamlSettingsStore, SettingsCheck)> {
        let mut store = YamlSettingsStore::open(&self.settings_path)
            .with_context(|| format!("Failed to open settings: {}", self.settings_path))?;
        let check = ensure_default_settings(&mut store, crate::VERSION)
            .context("Failed to write default settings")?;
        Ok((store, check))
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BWHEADLESS_SECTION;
    use tempfile::TempDir;

    fn create_test_store() -> (YamlSettingsStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let store = YamlSettingsStore::open(dir.join("settings.yaml")).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_set_get_has_value() {
        let mut store = MemoryStore::new();
        assert!(!store.has_value("bwheadless", "bot_name").unwrap());

        store.set("bwheadless", "bot_name", "MyBot").unwrap();
        assert_eq!(
            store.get("bwheadless", "bot_name").unwrap(),
            Some("MyBot".to_string())
        );

        store.set("bwheadless", "bot_name", "Other").unwrap();
        assert_eq!(
            store.get("bwheadless", "bot_name").unwrap(),
            Some("Other".to_string())
        );
        assert_eq!(store.get("droplauncher", "bot_name").unwrap(), None);
    }

    #[test]
    fn test_yaml_store_persists_each_set() {
        let (mut store, _temp_dir) = create_test_store();
        store.set("bwheadless", "bot_race", "Zerg").unwrap();

        let reopened = YamlSettingsStore::open(store.path()).unwrap();
        assert_eq!(
            reopened.get("bwheadless", "bot_race").unwrap(),
            Some("Zerg".to_string())
        );
    }

    #[test]
    fn test_yaml_store_empty_file() {
        let (store, _temp_dir) = create_test_store();
        fs::write(store.path(), "").unwrap();

        let reopened = YamlSettingsStore::open(store.path()).unwrap();
        assert!(reopened.sections().is_empty());
    }

    #[test]
    fn test_yaml_store_rejects_garbage() {
        let (store, _temp_dir) = create_test_store();
        fs::write(store.path(), "- just\n- a list\n").unwrap();

        let err = YamlSettingsStore::open(store.path()).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn test_indexed_round_trip_and_gap() {
        let mut store = MemoryStore::new();
        let files = vec!["a.txt".to_string(), "b.txt".to_string()];
        write_indexed(&mut store, BWHEADLESS_SECTION, "extra_file_", &files).unwrap();
        assert_eq!(
            read_indexed(&store, BWHEADLESS_SECTION, "extra_file_").unwrap(),
            files
        );

        // Index 2 is missing, so index 3 is never reached.
        store.set(BWHEADLESS_SECTION, "extra_file_3", "d.txt").unwrap();
        assert_eq!(
            read_indexed(&store, BWHEADLESS_SECTION, "extra_file_")
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_write_indexed_drops_stale_entries() {
        let mut store = MemoryStore::new();
        let three = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        write_indexed(&mut store, BWHEADLESS_SECTION, "x", &three).unwrap();
        write_indexed(&mut store, BWHEADLESS_SECTION, "x", &three[..1]).unwrap();

        assert_eq!(
            read_indexed(&store, BWHEADLESS_SECTION, "x").unwrap(),
            vec!["a".to_string()]
        );
        assert!(!store.has_value(BWHEADLESS_SECTION, "x2").unwrap());
    }

    #[test]
    fn test_ensure_defaults_on_fresh_store() {
        let mut store = MemoryStore::new();
        let check = ensure_default_settings(&mut store, "1.0.0").unwrap();
        assert_eq!(check, SettingsCheck::Current);

        let settings = load_launcher_settings(&store).unwrap();
        assert_eq!(settings.version, "1.0.0");
        assert!(settings.auto_eject_bot);
        assert!(!settings.auto_bot_rejoin);
        assert!(settings.copy_write_read);
        assert_eq!(
            store.get(DROPLAUNCHER_SECTION, "copy_write_read").unwrap(),
            Some("true".to_string())
        );
    }

    #[test]
    fn test_ensure_defaults_keeps_user_choices() {
        let mut store = MemoryStore::new();
        ensure_default_settings(&mut store, "1.0.0").unwrap();
        store
            .set(DROPLAUNCHER_SECTION, "auto_bot_rejoin", "true")
            .unwrap();

        ensure_default_settings(&mut store, "1.0.0").unwrap();
        assert!(load_launcher_settings(&store).unwrap().auto_bot_rejoin);
    }

    #[test]
    fn test_version_change_clears_everything() {
        let mut store = MemoryStore::new();
        ensure_default_settings(&mut store, "0.8.0").unwrap();
        store.set(BWHEADLESS_SECTION, "bot_name", "OldBot").unwrap();

        let check = ensure_default_settings(&mut store, "0.9.0").unwrap();
        assert_eq!(
            check,
            SettingsCheck::VersionChanged {
                previous: "0.8.0".to_string(),
                current: "0.9.0".to_string(),
            }
        );
        assert!(!store.has_value(BWHEADLESS_SECTION, "bot_name").unwrap());
        assert_eq!(
            store.get(DROPLAUNCHER_SECTION, "version").unwrap(),
            Some("0.9.0".to_string())
        );
    }

    #[test]
    fn test_settings_manager_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().join("nested")).unwrap();
        let manager = SettingsManager::new(&dir).unwrap();

        assert!(dir.exists());
        assert_eq!(manager.settings_path(), dir.join("droplauncher.yaml").as_path());

        let (store, check) = manager.open_store().unwrap();
        assert_eq!(check, SettingsCheck::Current);
        assert!(manager.settings_path().exists());
        assert!(store.has_value(DROPLAUNCHER_SECTION, "version").unwrap());
    }
}
