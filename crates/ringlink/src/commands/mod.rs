//! Command dispatch: bridges CLI args -> engine calls -> output formatting.

pub mod actions;
pub mod auth;
pub mod config_cmd;
pub mod devices;
pub mod dings;
pub mod modes;
pub mod snapshot;
pub mod util;
pub mod watch;

use ringlink_config::Config;
use ringlink_core::RingEngine;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a cloud-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    engine: &RingEngine,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(engine, cfg, args, global).await,
        Command::Devices => devices::handle(engine, global).await,
        Command::Dings => dings::handle(engine, global).await,
        Command::Modes(args) => modes::handle(engine, args, global).await,
        Command::Watch(args) => watch::handle(engine, &args, global).await,
        Command::Snapshot(args) => snapshot::handle(engine, args, global).await,
        Command::Chime(args) => actions::chime(engine, &args, global).await,
        Command::Light(args) => actions::light(engine, &args, global).await,
        Command::Siren(args) => actions::siren(engine, &args, global).await,
        Command::Motion(args) => actions::motion(engine, &args, global).await,
        // Handled before the engine is built
        Command::Config(_) | Command::Logout | Command::Completions(_) => unreachable!(),
    }
}
