// ── Persistent settings store ──
//
// The engine persists tokens and its hardware id through an abstract
// string key/value store. The CLI backs it with a TOML file; embedders and
// tests use `MemorySettings`.

use dashmap::DashMap;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;

/// Settings keys the engine reads and writes.
pub mod keys {
    pub const SESSION_TOKEN: &str = "sessionToken";
    pub const BEARER_TOKEN: &str = "bearerToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    /// Write-only trigger: storing `{"username":..,"password":..}` here
    /// starts a login. The engine removes it once consumed.
    pub const RAW_CREDENTIALS: &str = "rawCredentials";
    pub const HARDWARE_ID: &str = "hardwareId";
}

/// String key/value persistence used by the session layer.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;

    fn remove(&self, key: &str) -> Result<(), CoreError>;
}

/// In-memory store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: DashMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from `(key, value)` pairs.
    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        for (k, v) in values {
            store.values.insert(k.to_owned(), v.to_owned());
        }
        store
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Payload of the `rawCredentials` setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCredentials {
    pub username: String,
    pub password: String,
}

impl RawCredentials {
    pub fn new(username: impl Into<String>, password: &SecretString) -> Self {
        Self {
            username: username.into(),
            password: password.expose_secret().to_owned(),
        }
    }

    /// Parse the JSON payload. `Basic` credential strings from older
    /// installations are rejected; only the refresh-token flow is supported.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if raw.trim_start().starts_with("Basic ") {
            return Err(CoreError::Credential {
                message: "legacy Basic credentials are not supported, log in again".into(),
            });
        }
        serde_json::from_str(raw).map_err(|e| CoreError::Settings {
            message: format!("rawCredentials is not valid JSON credentials: {e}"),
        })
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::Internal(e.to_string()))
    }
}

/// Load the installation's hardware id, generating and persisting a new
/// UUID the first time.
///
/// The vendor binds session tokens to this value, so a failed write is
/// logged rather than fatal: the id still holds for this process.
pub fn resolve_hardware_id(settings: &dyn SettingsStore) -> String {
    if let Some(id) = settings.get(keys::HARDWARE_ID).filter(|id| !id.is_empty()) {
        return id;
    }

    let id = uuid::Uuid::new_v4().to_string();
    debug!(hardware_id = %id, "generated new hardware id");
    if let Err(e) = settings.set(keys::HARDWARE_ID, &id) {
        warn!(error = %e, "failed to persist hardware id");
    }
    id
}

/// Read a non-empty secret value.
pub(crate) fn get_secret(settings: &dyn SettingsStore, key: &str) -> Option<SecretString> {
    settings
        .get(key)
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hardware_id_is_generated_once() {
        let settings = MemorySettings::new();
        let first = resolve_hardware_id(&settings);
        let second = resolve_hardware_id(&settings);
        assert_eq!(first, second);
        assert_eq!(settings.get(keys::HARDWARE_ID).as_deref(), Some(first.as_str()));
        assert!(uuid::Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn existing_hardware_id_is_kept() {
        let settings = MemorySettings::with_values([(keys::HARDWARE_ID, "fixed-id")]);
        assert_eq!(resolve_hardware_id(&settings), "fixed-id");
    }

    #[test]
    fn raw_credentials_parse() {
        let creds = RawCredentials::parse(r#"{"username":"a@b.c","password":"pw"}"#).unwrap();
        assert_eq!(creds.username, "a@b.c");
        assert_eq!(creds.password, "pw");

        let err = RawCredentials::parse("not json").unwrap_err();
        assert!(matches!(err, CoreError::Settings { .. }));
    }

    #[test]
    fn legacy_basic_credentials_are_rejected() {
        let err = RawCredentials::parse("Basic YTpiOmM=").unwrap_err();
        assert!(matches!(err, CoreError::Credential { .. }));
    }

    #[test]
    fn empty_values_are_not_secrets() {
        let settings = MemorySettings::with_values([(keys::REFRESH_TOKEN, "")]);
        assert!(get_secret(&settings, keys::REFRESH_TOKEN).is_none());
    }
}
