//! Configuration for the ringlink CLI.
//!
//! TOML config, password resolution (env + keyring + plaintext), the
//! file-backed [`SettingsStore`](ringlink_core::SettingsStore) that holds the
//! session tokens, and translation to [`ringlink_core::EngineConfig`].

mod store;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use ringlink_api::{Endpoints, TransportConfig};
use ringlink_core::{EngineConfig, PollIntervals};

pub use store::FileSettings;

/// Keyring service name; entries are keyed `"{username}/password"`.
pub const KEYRING_SERVICE: &str = "ringlink";

/// Environment variable consulted first for the account password.
pub const PASSWORD_ENV: &str = "RINGLINK_PASSWORD";

const ENV_PREFIX: &str = "RINGLINK_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no account configured")]
    NoAccount,

    #[error("no password found for '{username}'")]
    NoPassword { username: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub account: Account,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub polling: Polling,

    #[serde(default)]
    pub snapshots: Snapshots,

    /// Host overrides, mostly for testing against a local mock.
    #[serde(default)]
    pub endpoints: EndpointOverrides,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Account {
    pub username: Option<String>,

    /// Plaintext password. Prefer the keyring or `RINGLINK_PASSWORD`.
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// Poll periods and the alarm hold, all in seconds.
#[derive(Debug, Deserialize, Serialize)]
pub struct Polling {
    #[serde(default = "default_dings_secs")]
    pub dings_secs: u64,

    #[serde(default = "default_devices_secs")]
    pub devices_secs: u64,

    #[serde(default = "default_modes_secs")]
    pub location_modes_secs: u64,

    #[serde(default = "default_verify_secs")]
    pub verify_secs: u64,

    #[serde(default = "default_alarm_hold_secs")]
    pub alarm_hold_secs: u64,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            dings_secs: default_dings_secs(),
            devices_secs: default_devices_secs(),
            location_modes_secs: default_modes_secs(),
            verify_secs: default_verify_secs(),
            alarm_hold_secs: default_alarm_hold_secs(),
        }
    }
}

fn default_dings_secs() -> u64 {
    5
}
fn default_devices_secs() -> u64 {
    600
}
fn default_modes_secs() -> u64 {
    60
}
fn default_verify_secs() -> u64 {
    60
}
fn default_alarm_hold_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Snapshots {
    #[serde(default = "default_snapshot_attempts")]
    pub attempts: u32,

    #[serde(default = "default_snapshot_interval_ms")]
    pub interval_ms: u64,
}

impl Default for Snapshots {
    fn default() -> Self {
        Self {
            attempts: default_snapshot_attempts(),
            interval_ms: default_snapshot_interval_ms(),
        }
    }
}

fn default_snapshot_attempts() -> u32 {
    3
}
fn default_snapshot_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EndpointOverrides {
    /// Route every host to this base URL. Per-host overrides win over it.
    pub base: Option<String>,
    pub oauth: Option<String>,
    pub api: Option<String>,
    pub app: Option<String>,
    pub snapshots: Option<String>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "ringlink", "ringlink")
}

fn home_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("ringlink");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where [`FileSettings`] keeps the session tokens and hardware id.
pub fn settings_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share").join("settings.toml"),
        |dirs| dirs.data_dir().join("settings.toml"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load the config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Merge defaults, the TOML file at `path` (if present), and
/// `RINGLINK_`-prefixed variables. Nested keys use a double underscore:
/// `RINGLINK_ACCOUNT__USERNAME`, `RINGLINK_POLLING__DINGS_SECS`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    Ok(config)
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// The configured account username.
pub fn resolve_username(cfg: &Config) -> Result<String, ConfigError> {
    cfg.account
        .username
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or(ConfigError::NoAccount)
}

/// Resolve the password for `username`: `RINGLINK_PASSWORD`, then the
/// system keyring, then plaintext in the config.
pub fn resolve_password(cfg: &Config, username: &str) -> Result<SecretString, ConfigError> {
    // 1. Env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(SecretString::from(pw));
        }
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(username)) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config, only for the configured account
    if cfg.account.username.as_deref() == Some(username) {
        if let Some(ref pw) = cfg.account.password {
            return Ok(SecretString::from(pw.clone()));
        }
    }

    Err(ConfigError::NoPassword {
        username: username.into(),
    })
}

/// Save a password to the system keyring.
pub fn store_password(username: &str, password: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(username))?;
    entry.set_password(password.expose_secret())?;
    Ok(())
}

fn keyring_user(username: &str) -> String {
    format!("{username}/password")
}

// ── Engine translation ──────────────────────────────────────────────

/// Build an [`EngineConfig`] from the loaded config.
pub fn to_engine_config(cfg: &Config) -> Result<EngineConfig, ConfigError> {
    let p = &cfg.polling;
    let intervals = PollIntervals {
        dings: positive_secs("polling.dings_secs", p.dings_secs)?,
        devices: positive_secs("polling.devices_secs", p.devices_secs)?,
        location_modes: positive_secs("polling.location_modes_secs", p.location_modes_secs)?,
        verify: positive_secs("polling.verify_secs", p.verify_secs)?,
    };

    if cfg.snapshots.attempts == 0 {
        return Err(ConfigError::Validation {
            field: "snapshots.attempts".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(EngineConfig {
        endpoints: resolve_endpoints(&cfg.endpoints)?,
        transport: TransportConfig::default()
            .with_timeout(positive_secs("defaults.timeout", cfg.defaults.timeout)?),
        intervals,
        alarm_hold: Duration::from_secs(p.alarm_hold_secs),
        snapshot_attempts: cfg.snapshots.attempts,
        snapshot_interval: Duration::from_millis(cfg.snapshots.interval_ms),
    })
}

fn positive_secs(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn resolve_endpoints(overrides: &EndpointOverrides) -> Result<Endpoints, ConfigError> {
    let mut endpoints = match overrides.base {
        Some(ref base) => Endpoints::single(parse_url("endpoints.base", base)?),
        None => Endpoints::default(),
    };
    if let Some(ref url) = overrides.oauth {
        endpoints.oauth = parse_url("endpoints.oauth", url)?;
    }
    if let Some(ref url) = overrides.api {
        endpoints.api = parse_url("endpoints.api", url)?;
    }
    if let Some(ref url) = overrides.app {
        endpoints.app = parse_url("endpoints.app", url)?;
    }
    if let Some(ref url) = overrides.snapshots {
        endpoints.snapshots = parse_url("endpoints.snapshots", url)?;
    }
    Ok(endpoints)
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_engine_defaults() {
        let engine = to_engine_config(&Config::default()).unwrap();
        let reference = EngineConfig::default();
        assert_eq!(engine.intervals, reference.intervals);
        assert_eq!(engine.alarm_hold, reference.alarm_hold);
        assert_eq!(engine.snapshot_attempts, reference.snapshot_attempts);
        assert_eq!(engine.snapshot_interval, reference.snapshot_interval);
        assert_eq!(engine.endpoints, Endpoints::default());
    }

    #[test]
    fn file_and_env_are_layered() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    [account]
                    username = "file@example.com"

                    [polling]
                    dings_secs = 2
                    devices_secs = 300
                "#,
            )?;
            jail.set_env("RINGLINK_POLLING__DEVICES_SECS", "120");

            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.account.username.as_deref(), Some("file@example.com"));
            assert_eq!(cfg.polling.dings_secs, 2);
            assert_eq!(cfg.polling.devices_secs, 120);
            assert_eq!(cfg.polling.verify_secs, 60);
            assert_eq!(cfg.defaults.output, "table");
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let cfg = load_config_from(Path::new("absent.toml")).map_err(|e| e.to_string())?;
            assert!(cfg.account.username.is_none());
            assert_eq!(cfg.snapshots.attempts, 3);
            Ok(())
        });
    }

    #[test]
    fn password_env_wins() {
        Jail::expect_with(|jail| {
            jail.set_env(PASSWORD_ENV, "from-env");
            let cfg = Config {
                account: Account {
                    username: Some("user@example.com".into()),
                    password: Some("from-file".into()),
                },
                ..Config::default()
            };
            let pw = resolve_password(&cfg, "user@example.com").map_err(|e| e.to_string())?;
            assert_eq!(pw.expose_secret(), "from-env");
            Ok(())
        });
    }

    #[test]
    fn empty_username_is_no_account() {
        let mut cfg = Config::default();
        assert!(matches!(resolve_username(&cfg), Err(ConfigError::NoAccount)));
        cfg.account.username = Some(String::new());
        assert!(matches!(resolve_username(&cfg), Err(ConfigError::NoAccount)));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut cfg = Config::default();
        cfg.polling.dings_secs = 0;
        let err = to_engine_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "polling.dings_secs"));
    }

    #[test]
    fn endpoint_overrides_apply_per_host() {
        let cfg = Config {
            endpoints: EndpointOverrides {
                base: Some("http://127.0.0.1:9000".into()),
                snapshots: Some("http://127.0.0.1:9001".into()),
                ..EndpointOverrides::default()
            },
            ..Config::default()
        };
        let endpoints = to_engine_config(&cfg).unwrap().endpoints;
        assert_eq!(endpoints.oauth.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(endpoints.app.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(endpoints.snapshots.as_str(), "http://127.0.0.1:9001/");
    }

    #[test]
    fn bad_override_url_is_rejected() {
        let cfg = Config {
            endpoints: EndpointOverrides {
                api: Some("not a url".into()),
                ..EndpointOverrides::default()
            },
            ..Config::default()
        };
        assert!(matches!(
            to_engine_config(&cfg),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn save_then_load_keeps_account() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            account: Account {
                username: Some("saved@example.com".into()),
                password: None,
            },
            ..Config::default()
        };
        save_config(&cfg, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let loaded: Config = toml::from_str(&text).unwrap();
        assert_eq!(loaded.account.username.as_deref(), Some("saved@example.com"));
    }
}
