//! Location security modes.

use tabled::Tabled;

use ringlink_core::{LocationMode, RingEngine};

use crate::cli::{GlobalOpts, ModesArgs, ModesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ModeRow {
    #[tabled(rename = "Location")]
    location_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Mode")]
    mode: String,
}

impl From<&LocationMode> for ModeRow {
    fn from(m: &LocationMode) -> Self {
        Self {
            location_id: m.location_id.clone(),
            name: m.name.clone(),
            mode: m.mode.clone(),
        }
    }
}

pub async fn handle(
    engine: &RingEngine,
    args: ModesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::connect(engine).await?;

    match args.command.unwrap_or(ModesCommand::List) {
        ModesCommand::List => {
            engine.scheduler().poll_location_modes().await?;
            let modes = engine.location_modes();
            let out = output::render_list(
                &global.output,
                &modes,
                |m| ModeRow::from(m),
                |m| format!("{}\t{}", m.location_id, m.mode),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ModesCommand::Set { location, mode } => {
            let applied = engine.set_location_mode(&location, &mode).await?;
            if !global.quiet {
                eprintln!("Location {location} is now in {applied} mode");
            }
            Ok(())
        }
    }
}
