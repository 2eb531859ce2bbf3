//! Shared helpers for command handlers.

use std::time::Duration;

use ringlink_core::{AuthState, RingEngine};

use crate::error::CliError;

/// Bring the session up, refreshing an expired one from the stored token.
pub async fn connect(engine: &RingEngine) -> Result<(), CliError> {
    if engine.auth_state() == AuthState::NoCredentials {
        return Err(CliError::NotLoggedIn);
    }
    engine.ensure_session().await?;
    Ok(())
}

/// Connect and load the device list into the registry.
pub async fn load_devices(engine: &RingEngine) -> Result<(), CliError> {
    connect(engine).await?;
    engine.scheduler().poll_devices().await?;
    Ok(())
}

/// Display name for a device id, falling back to the id itself.
pub fn device_name(engine: &RingEngine, id: u64) -> String {
    engine
        .registry()
        .get(id)
        .map_or_else(|| id.to_string(), |d| d.name.clone())
}

/// Parse a human duration such as `90s` or `10m`.
pub fn parse_duration(field: &str, raw: &str) -> Result<Duration, CliError> {
    humantime::parse_duration(raw).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("{e} (try e.g. 90s or 10m)"),
    })
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}
