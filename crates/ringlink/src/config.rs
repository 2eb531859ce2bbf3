//! CLI configuration: thin wrapper around `ringlink_config`.
//!
//! Adds resolution that respects `GlobalOpts` overrides (--config,
//! --settings, --timeout).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ringlink_config::{Config, FileSettings};
use ringlink_core::EngineConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file in effect: `--config` or the platform default.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(ringlink_config::config_path)
}

/// Settings file in effect: `--settings` or the platform default.
pub fn active_settings_path(global: &GlobalOpts) -> PathBuf {
    global
        .settings
        .clone()
        .unwrap_or_else(ringlink_config::settings_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(ringlink_config::load_config_from(&active_config_path(global))?)
}

pub fn open_settings(global: &GlobalOpts) -> Result<Arc<FileSettings>, CliError> {
    Ok(Arc::new(FileSettings::open(active_settings_path(global))?))
}

/// Translate the loaded config into an `EngineConfig`, applying `--timeout`.
pub fn engine_config(cfg: &Config, global: &GlobalOpts) -> Result<EngineConfig, CliError> {
    let mut engine = ringlink_config::to_engine_config(cfg)?;
    if let Some(secs) = global.timeout {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }
        engine.transport = engine.transport.with_timeout(Duration::from_secs(secs));
    }
    Ok(engine)
}
