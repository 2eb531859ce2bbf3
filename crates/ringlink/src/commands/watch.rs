//! Live event stream: debounced alarms, new dings, mode changes, and
//! session status, until Ctrl-C or `--duration` elapses.

use std::collections::HashSet;

use owo_colors::Style;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use ringlink_core::{AlarmChange, DingEvent, ModeChange, RingEngine, StatusEvent};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchEvent<'a> {
    Ding(&'a DingEvent),
    Alarm(AlarmChange),
    ModeChange(&'a ModeChange),
    Status { name: &'static str, detail: String },
}

struct Printer {
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl Printer {
    fn emit(&self, event: &WatchEvent<'_>, engine: &RingEngine) {
        let line = structured(&self.format, event).unwrap_or_else(|| self.text(event, engine));
        output::print_output(&line, self.quiet);
    }

    fn text(&self, event: &WatchEvent<'_>, engine: &RingEngine) -> String {
        let time = chrono::Local::now().format("%H:%M:%S").to_string();
        let (label, style, body) = match event {
            WatchEvent::Ding(d) => (
                "ding",
                Style::new().cyan().bold(),
                format!("{} {}", util::device_name(engine, d.doorbot_id), d.kind),
            ),
            WatchEvent::Alarm(a) => {
                let state = if a.active { "raised" } else { "cleared" };
                let style = if a.active {
                    Style::new().red().bold()
                } else {
                    Style::new().green()
                };
                (
                    "alarm",
                    style,
                    format!("{} {} {state}", util::device_name(engine, a.device_id), a.kind),
                )
            }
            WatchEvent::ModeChange(m) => (
                "mode",
                Style::new().yellow().bold(),
                format!("{} {} -> {}", m.name, m.old, m.new),
            ),
            WatchEvent::Status { name, detail } => {
                ("status", Style::new().dimmed(), format!("{name} {detail}"))
            }
        };
        format!(
            "{} {:<6} {body}",
            output::paint(&time, Style::new().dimmed(), self.color),
            output::paint(label, style, self.color),
        )
    }
}

/// JSON lines or a stream of YAML documents; `None` for the text formats.
fn structured(format: &OutputFormat, event: &WatchEvent<'_>) -> Option<String> {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => Some(output::render_json_compact(event)),
        OutputFormat::Yaml => Some(output::render_yaml_document(event)),
        OutputFormat::Table | OutputFormat::Plain => None,
    }
}

pub async fn handle(
    engine: &RingEngine,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let limit = args
        .duration
        .as_deref()
        .map(|d| util::parse_duration("duration", d))
        .transpose()?;

    util::load_devices(engine).await?;

    let printer = Printer {
        format: global.output.clone(),
        color: output::should_color(&global.color),
        quiet: global.quiet,
    };

    let mut dings = engine.fanout().subscribe_dings();
    let mut modes = engine.fanout().subscribe_modes();
    let mut alarms = engine.debouncer().subscribe();
    let mut status = engine.subscribe_status();
    engine.start().await;

    let deadline = async {
        match limit {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    // A ding stays in the active list for several polls; print it once.
    let mut seen: HashSet<(u64, Option<u64>)> = HashSet::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            () = &mut deadline => break,
            Some(batch) = dings.recv() => {
                seen.retain(|key| batch.iter().any(|d| (d.doorbot_id, d.id) == *key));
                for ding in batch.iter().filter(|d| d.ringing) {
                    if seen.insert((ding.doorbot_id, ding.id)) {
                        printer.emit(&WatchEvent::Ding(ding), engine);
                    }
                }
            }
            Some(change) = modes.recv() => {
                printer.emit(&WatchEvent::ModeChange(&change), engine);
            }
            result = alarms.recv() => match result {
                Ok(change) => printer.emit(&WatchEvent::Alarm(change), engine),
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "alarm stream lagged"),
                Err(RecvError::Closed) => break,
            },
            Ok(event) = status.recv() => {
                let detail = match &event {
                    StatusEvent::Error(message) => message.clone(),
                    StatusEvent::MfaRequired { delivery } => delivery.clone().unwrap_or_default(),
                    StatusEvent::ApiInit | StatusEvent::Authenticated => String::new(),
                };
                printer.emit(&WatchEvent::Status { name: event.name(), detail }, engine);
            }
        }
    }

    engine.shutdown().await;
    Ok(())
}
