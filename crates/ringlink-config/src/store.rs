// ── File-backed settings ──
//
// Flat string map persisted as TOML. Every write rewrites the file through
// a temporary sibling and a rename, so a crash never leaves it half written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use ringlink_core::{CoreError, SettingsStore};
use tracing::debug;

use crate::{ConfigError, settings_path};

/// [`SettingsStore`] over a TOML file. Holds the session tokens, so the
/// file is created owner-readable only on Unix.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSettings {
    /// Open (or lazily create) the settings file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), "settings opened");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Open the settings file in the platform data directory.
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::open(settings_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `edit` to a copy of the map, persist it, then commit it.
    fn update(&self, edit: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), CoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = values.clone();
        edit(&mut next);
        if next == *values {
            return Ok(());
        }
        self.write(&next).map_err(|e| CoreError::Settings {
            message: format!("failed to write {}: {e}", self.path.display()),
        })?;
        *values = next;
        Ok(())
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string(values)?;
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, text)?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl SettingsStore for FileSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.update(|values| {
            values.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.update(|values| {
            values.remove(key);
        })
    }
}
