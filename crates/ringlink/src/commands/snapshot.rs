//! Snapshot capture.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use ringlink_core::RingEngine;

use crate::cli::{GlobalOpts, SnapshotArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct SnapshotSummary {
    device_id: u64,
    path: String,
    bytes: usize,
    fresh: bool,
    requested_at: DateTime<Utc>,
}

fn detail(s: &SnapshotSummary) -> String {
    let freshness = if s.fresh {
        "new capture"
    } else {
        "latest stored image (no new capture confirmed)"
    };
    [
        format!("Device:  {}", s.device_id),
        format!("File:    {}", s.path),
        format!("Size:    {} bytes", s.bytes),
        format!("Image:   {freshness}"),
    ]
    .join("\n")
}

fn spinner(quiet: bool) -> ProgressBar {
    if quiet || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message("Requesting a fresh capture...");
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

pub async fn handle(
    engine: &RingEngine,
    args: SnapshotArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::load_devices(engine).await?;

    let bar = spinner(global.quiet);
    let result = engine.grab_image(args.device).await;
    bar.finish_and_clear();
    let snapshot = result?;

    let path = args
        .file
        .unwrap_or_else(|| PathBuf::from(format!("snapshot-{}.jpg", args.device)));
    std::fs::write(&path, &snapshot.bytes)?;

    let summary = SnapshotSummary {
        device_id: snapshot.device_id,
        path: path.display().to_string(),
        bytes: snapshot.bytes.len(),
        fresh: snapshot.fresh,
        requested_at: snapshot.requested_at,
    };
    let out = output::render_single(&global.output, &summary, detail, |s| s.path.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
