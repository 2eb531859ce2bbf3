// ── Polling scheduler ──
//
// Three independent pollers (devices, dings, location modes) plus the
// session verify timer. Each `poll_*` call holds an in-flight guard, so a
// cycle that starts while the previous one of the same poller is still
// running is skipped rather than queued.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollIntervals;
use crate::error::CoreError;
use crate::fanout::StateFanout;
use crate::model::{DingEvent, LocationMode, ModeChange};
use crate::registry::DeviceRegistry;
use crate::session::SessionManager;

/// Result of one poll call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    /// The previous cycle of this poller was still in flight.
    Skipped,
}

// ── In-flight guard ──────────────────────────────────────────────────

#[derive(Default)]
struct InFlight(AtomicBool);

struct InFlightGuard<'a>(&'a AtomicBool);

impl InFlight {
    fn try_enter(&self) -> Option<InFlightGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(&self.0))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ── Scheduler ────────────────────────────────────────────────────────

/// Owns the poll cycles and the remembered location modes.
pub struct PollingScheduler {
    session: Arc<SessionManager>,
    registry: Arc<DeviceRegistry>,
    fanout: Arc<StateFanout>,
    intervals: PollIntervals,
    modes: Mutex<HashMap<String, LocationMode>>,
    devices_in_flight: InFlight,
    dings_in_flight: InFlight,
    modes_in_flight: InFlight,
}

impl PollingScheduler {
    pub fn new(
        session: Arc<SessionManager>,
        registry: Arc<DeviceRegistry>,
        fanout: Arc<StateFanout>,
        intervals: PollIntervals,
    ) -> Self {
        Self {
            session,
            registry,
            fanout,
            intervals,
            modes: Mutex::new(HashMap::new()),
            devices_in_flight: InFlight::default(),
            dings_in_flight: InFlight::default(),
            modes_in_flight: InFlight::default(),
        }
    }

    pub fn intervals(&self) -> PollIntervals {
        self.intervals
    }

    /// Remembered modes, ordered by location id.
    pub fn location_modes(&self) -> Vec<LocationMode> {
        let mut modes: Vec<LocationMode> = self
            .modes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        modes.sort_by(|a, b| a.location_id.cmp(&b.location_id));
        modes
    }

    // ── Poll cycles ──────────────────────────────────────────────────

    /// Fetch the device list, upsert it into the registry, and publish the
    /// full payload.
    pub async fn poll_devices(&self) -> Result<PollOutcome, CoreError> {
        let Some(_guard) = self.devices_in_flight.try_enter() else {
            debug!("device poll still in flight, skipping");
            return Ok(PollOutcome::Skipped);
        };

        let devices = self
            .session
            .authed(|gw, tokens| async move { gw.list_devices(&tokens).await })
            .await?;
        let summary = self.registry.apply_devices(&devices);
        if summary.created > 0 {
            info!(created = summary.created, total = self.registry.len(), "discovered devices");
        }
        self.fanout.publish_devices(devices);
        Ok(PollOutcome::Completed)
    }

    /// Fetch active dings and publish them, even when the list is empty.
    pub async fn poll_dings(&self) -> Result<PollOutcome, CoreError> {
        let Some(_guard) = self.dings_in_flight.try_enter() else {
            debug!("ding poll still in flight, skipping");
            return Ok(PollOutcome::Skipped);
        };

        let dings = self
            .session
            .authed(|gw, tokens| async move { gw.active_dings(&tokens).await })
            .await?;
        let events: Vec<DingEvent> = dings.into_iter().map(DingEvent::from).collect();
        if !events.is_empty() {
            debug!(count = events.len(), "active dings");
        }
        self.fanout.publish_dings(events);
        Ok(PollOutcome::Completed)
    }

    /// Fetch every location's mode and publish a change for each location
    /// whose mode differs from the remembered one.
    ///
    /// The remembered mode is always updated; a location seen for the
    /// first time is recorded without a notification. A failed mode fetch
    /// skips that location only.
    pub async fn poll_location_modes(&self) -> Result<PollOutcome, CoreError> {
        let Some(_guard) = self.modes_in_flight.try_enter() else {
            debug!("location-mode poll still in flight, skipping");
            return Ok(PollOutcome::Skipped);
        };

        let locations = self
            .session
            .authed(|gw, tokens| async move { gw.list_locations(&tokens).await })
            .await?;

        let fetches = locations.iter().map(|location| {
            let id = location.location_id.as_str();
            self.session
                .authed(move |gw, tokens| async move { gw.location_mode(&tokens, id).await })
        });
        let results = join_all(fetches).await;

        let mut changes = Vec::new();
        {
            let mut remembered = self.modes.lock().unwrap_or_else(PoisonError::into_inner);
            for (location, result) in locations.iter().zip(results) {
                let mode = match result {
                    Ok(mode) => mode,
                    Err(e) => {
                        warn!(location_id = %location.location_id, error = %e, "mode fetch failed");
                        continue;
                    }
                };
                let current = LocationMode {
                    location_id: location.location_id.clone(),
                    name: location.name.clone(),
                    mode,
                };
                if let Some(previous) = remembered.insert(current.location_id.clone(), current.clone())
                {
                    if previous.mode != current.mode {
                        changes.push(ModeChange {
                            location_id: current.location_id,
                            name: current.name,
                            old: previous.mode,
                            new: current.mode,
                        });
                    }
                }
            }
        }

        for change in changes {
            info!(
                location = %change.name,
                old = %change.old,
                new = %change.new,
                "location mode changed"
            );
            self.fanout.publish_mode_change(change);
        }
        Ok(PollOutcome::Completed)
    }

    // ── Background tasks ─────────────────────────────────────────────

    /// Spawn the three pollers and the session verifier. All stop when
    /// `cancel` fires.
    pub fn spawn(self: &Arc<Self>, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(4);

        let s = Arc::clone(self);
        handles.push(tokio::spawn(poll_task(
            "dings",
            self.intervals.dings,
            cancel.clone(),
            move || {
                let s = Arc::clone(&s);
                async move { s.poll_dings().await }
            },
        )));

        let s = Arc::clone(self);
        handles.push(tokio::spawn(poll_task(
            "devices",
            self.intervals.devices,
            cancel.clone(),
            move || {
                let s = Arc::clone(&s);
                async move { s.poll_devices().await }
            },
        )));

        let s = Arc::clone(self);
        handles.push(tokio::spawn(poll_task(
            "location_modes",
            self.intervals.location_modes,
            cancel.clone(),
            move || {
                let s = Arc::clone(&s);
                async move { s.poll_location_modes().await }
            },
        )));

        handles.push(tokio::spawn(verify_task(
            Arc::clone(&self.session),
            self.intervals.verify,
            cancel.clone(),
        )));

        handles
    }
}

/// Run `poll` every `period`, starting immediately. Failures are logged and
/// the cycle is skipped.
async fn poll_task<F, Fut>(name: &'static str, period: Duration, cancel: CancellationToken, poll: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<PollOutcome, CoreError>>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match poll().await {
                    Ok(_) => {}
                    // Expected while the session is down; the verifier recovers it.
                    Err(e @ (CoreError::AuthExpired { .. }
                        | CoreError::Credential { .. }
                        | CoreError::MfaRequired { .. })) => {
                        debug!(poller = name, error = %e, "poll skipped, not authenticated");
                    }
                    Err(e) => warn!(poller = name, error = %e, "poll failed"),
                }
            }
        }
    }
    debug!(poller = name, "poller stopped");
}

/// Periodically refresh an expired session.
async fn verify_task(session: Arc<SessionManager>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = session.verify().await {
                    warn!(error = %e, "session verification failed");
                }
            }
        }
    }
}
