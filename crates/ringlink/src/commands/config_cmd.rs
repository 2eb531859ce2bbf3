//! Config subcommand handlers.

use serde::Serialize;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Paths {
    config: String,
    settings: String,
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let paths = Paths {
                config: config::active_config_path(global).display().to_string(),
                settings: config::active_settings_path(global).display().to_string(),
            };
            let out = output::render_single(
                &global.output,
                &paths,
                |p| format!("config:   {}\nsettings: {}", p.config, p.settings),
                |p| p.config.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let mut cfg = config::load(global)?;
            if cfg.account.password.is_some() {
                cfg.account.password = Some("****".into());
            }
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("# unrenderable: {e}")),
                |c| c.account.username.clone().unwrap_or_default(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
