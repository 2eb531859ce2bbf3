//! Device listing.

use std::sync::Arc;

use tabled::Tabled;

use ringlink_core::{DeviceRecord, RingEngine};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "Light")]
    light: String,
    #[tabled(rename = "Siren")]
    siren: String,
    #[tabled(rename = "Location")]
    location: String,
}

impl From<&Arc<DeviceRecord>> for DeviceRow {
    fn from(d: &Arc<DeviceRecord>) -> Self {
        Self {
            id: d.id,
            name: d.name.clone(),
            kind: d.kind.to_string(),
            model: d.info.kind.clone().unwrap_or_default(),
            battery: d
                .state
                .battery
                .map_or_else(|| "-".into(), |b| format!("{b}%")),
            light: output::switch_label(d.state.floodlight),
            siren: output::switch_label(d.state.siren),
            location: d.location_id().unwrap_or("-").to_owned(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(engine: &RingEngine, global: &GlobalOpts) -> Result<(), CliError> {
    util::load_devices(engine).await?;
    let snap = engine.devices();
    let out = output::render_list(
        &global.output,
        snap.as_slice(),
        |d| DeviceRow::from(d),
        |d| d.id.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
