//! Login and logout.

use std::io::{self, IsTerminal};

use dialoguer::Input;
use secrecy::SecretString;

use ringlink_config::{Config, ConfigError};
use ringlink_core::settings::keys;
use ringlink_core::{CoreError, RingEngine, SettingsStore};

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config;
use crate::error::CliError;

use super::util;

/// Password login, prompting for a two-factor code when the account asks
/// for one.
pub async fn login(
    engine: &RingEngine,
    cfg: &Config,
    args: LoginArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let interactive = io::stdin().is_terminal();
    let username = resolve_username(cfg, args.username, interactive)?;
    let password = resolve_password(cfg, &username, interactive)?;

    match engine.login(&username, password.clone()).await {
        Ok(()) => {}
        Err(CoreError::MfaRequired { delivery }) => {
            if !interactive {
                return Err(CliError::MfaRequired);
            }
            let prompt = match delivery {
                Some(d) => format!("Verification code (sent via {d})"),
                None => "Verification code".into(),
            };
            let code: String = Input::new()
                .with_prompt(prompt)
                .interact_text()
                .map_err(util::prompt_err)?;
            engine.submit_mfa_code(code.trim()).await?;
        }
        Err(e) => return Err(e.into()),
    }

    if args.save_password {
        ringlink_config::store_password(&username, &password)?;
    }
    if !global.quiet {
        eprintln!("Logged in as {username}");
    }
    Ok(())
}

/// Drop the stored tokens. The hardware id is kept.
pub fn logout(global: &GlobalOpts) -> Result<(), CliError> {
    let settings = config::open_settings(global)?;
    for key in [keys::SESSION_TOKEN, keys::BEARER_TOKEN, keys::REFRESH_TOKEN] {
        settings.remove(key)?;
    }
    if !global.quiet {
        eprintln!("Session tokens removed");
    }
    Ok(())
}

fn resolve_username(
    cfg: &Config,
    flag: Option<String>,
    interactive: bool,
) -> Result<String, CliError> {
    if let Some(username) = flag.filter(|u| !u.is_empty()) {
        return Ok(username);
    }
    match ringlink_config::resolve_username(cfg) {
        Ok(username) => Ok(username),
        Err(ConfigError::NoAccount) if interactive => Input::new()
            .with_prompt("Ring account email")
            .interact_text()
            .map_err(util::prompt_err),
        Err(e) => Err(e.into()),
    }
}

fn resolve_password(
    cfg: &Config,
    username: &str,
    interactive: bool,
) -> Result<SecretString, CliError> {
    match ringlink_config::resolve_password(cfg, username) {
        Ok(password) => Ok(password),
        Err(ConfigError::NoPassword { .. }) if interactive => {
            let password = rpassword::prompt_password("Password: ").map_err(util::prompt_err)?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "cannot be empty".into(),
                });
            }
            Ok(SecretString::from(password))
        }
        Err(e) => Err(e.into()),
    }
}
