//! Active dings.

use tabled::Tabled;

use ringlink_core::{DingEvent, RingEngine};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct DingRow {
    #[tabled(rename = "Device")]
    device: u64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Ringing")]
    ringing: bool,
    #[tabled(rename = "Motion")]
    motion: bool,
}

impl From<&DingEvent> for DingRow {
    fn from(d: &DingEvent) -> Self {
        Self {
            device: d.doorbot_id,
            name: d.description.clone().unwrap_or_default(),
            kind: d.kind.to_string(),
            ringing: d.ringing,
            motion: d.motion,
        }
    }
}

pub async fn handle(engine: &RingEngine, global: &GlobalOpts) -> Result<(), CliError> {
    util::connect(engine).await?;

    // The poll publishes through the fanout, so subscribe first.
    let mut dings = engine.fanout().subscribe_dings();
    engine.scheduler().poll_dings().await?;
    let batch = dings.recv().await.unwrap_or_default();

    let out = output::render_list(
        &global.output,
        batch.as_slice(),
        |d| DingRow::from(d),
        |d| d.doorbot_id.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
