// ── Alarm debouncer ──
//
// Ringing events are momentary; consumers want an alarm that stays on for a
// fixed window after the last event. Each `(device, kind)` owns at most one
// spawned timer. A new event aborts the old timer and starts another with a
// fresh generation number; a timer only clears the alarm if its generation
// is still current, so one that fired while being replaced does nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::model::AlarmKind;

const CHANGE_CHANNEL_SIZE: usize = 64;

/// An alarm switching on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlarmChange {
    pub device_id: u64,
    pub kind: AlarmKind,
    pub active: bool,
}

type AlarmKey = (u64, AlarmKind);

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Shared {
    timers: Mutex<HashMap<AlarmKey, Timer>>,
    next_generation: AtomicU64,
    changes: broadcast::Sender<AlarmChange>,
}

impl Shared {
    fn timers(&self) -> MutexGuard<'_, HashMap<AlarmKey, Timer>> {
        // Entries stay consistent across a panic elsewhere.
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Edges are published under the timers lock so the order subscribers
    /// see matches the order of map updates.
    fn expire(&self, key: AlarmKey, generation: u64) {
        let mut timers = self.timers();
        if !timers.get(&key).is_some_and(|t| t.generation == generation) {
            return;
        }
        timers.remove(&key);
        let (device_id, kind) = key;
        debug!(device_id, %kind, "alarm cleared");
        let _ = self.changes.send(AlarmChange {
            device_id,
            kind,
            active: false,
        });
    }
}

/// Holds alarms active for `hold` after their most recent trigger.
#[derive(Clone)]
pub struct AlarmDebouncer {
    hold: Duration,
    shared: Arc<Shared>,
}

impl AlarmDebouncer {
    pub fn new(hold: Duration) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_SIZE);
        Self {
            hold,
            shared: Arc::new(Shared {
                timers: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                changes,
            }),
        }
    }

    /// Set the alarm and restart its hold timer.
    ///
    /// Emits an [`AlarmChange`] only on the off → on edge.
    pub fn trigger(&self, device_id: u64, kind: AlarmKind) {
        let key = (device_id, kind);
        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);

        // The timer is registered under the same lock its task needs to
        // clear it, so it can never fire before it is in the map.
        let mut timers = self.shared.timers();
        let shared = Arc::clone(&self.shared);
        let hold = self.hold;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            shared.expire(key, generation);
        });

        if let Some(old) = timers.insert(key, Timer { generation, handle }) {
            old.handle.abort();
            debug!(device_id, %kind, "alarm hold extended");
        } else {
            debug!(device_id, %kind, "alarm raised");
            let _ = self.shared.changes.send(AlarmChange {
                device_id,
                kind,
                active: true,
            });
        }
    }

    /// Whether the alarm is currently held.
    pub fn is_active(&self, device_id: u64, kind: AlarmKind) -> bool {
        self.shared.timers().contains_key(&(device_id, kind))
    }

    /// Number of live timers.
    pub fn active_count(&self) -> usize {
        self.shared.timers().len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlarmChange> {
        self.shared.changes.subscribe()
    }

    /// Abort every timer without emitting clears. Used on shutdown.
    pub fn cancel_all(&self) {
        let drained: Vec<Timer> = self.shared.timers().drain().map(|(_, t)| t).collect();
        for timer in drained {
            timer.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Instant, advance, sleep_until};

    const HOLD: Duration = Duration::from_millis(10_000);

    async fn at(start: Instant, ms: u64) {
        sleep_until(start + Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn single_event_holds_for_window() {
        let debouncer = AlarmDebouncer::new(HOLD);
        let start = Instant::now();

        debouncer.trigger(1, AlarmKind::Ding);
        at(start, 9_999).await;
        assert!(debouncer.is_active(1, AlarmKind::Ding));

        at(start, 10_001).await;
        assert!(!debouncer.is_active(1, AlarmKind::Ding));
    }

    #[tokio::test(start_paused = true)]
    async fn retrigger_extends_from_last_event() {
        let debouncer = AlarmDebouncer::new(HOLD);
        let start = Instant::now();

        debouncer.trigger(1, AlarmKind::Motion);
        at(start, 6_000).await;
        debouncer.trigger(1, AlarmKind::Motion);

        at(start, 10_001).await;
        assert!(debouncer.is_active(1, AlarmKind::Motion));
        at(start, 15_999).await;
        assert!(debouncer.is_active(1, AlarmKind::Motion));
        at(start, 16_001).await;
        assert!(!debouncer.is_active(1, AlarmKind::Motion));
        assert_eq!(debouncer.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn kinds_are_independent() {
        let debouncer = AlarmDebouncer::new(HOLD);
        let start = Instant::now();

        debouncer.trigger(1, AlarmKind::Ding);
        at(start, 5_000).await;
        debouncer.trigger(1, AlarmKind::Motion);

        at(start, 10_001).await;
        assert!(!debouncer.is_active(1, AlarmKind::Ding));
        assert!(debouncer.is_active(1, AlarmKind::Motion));
    }

    #[tokio::test(start_paused = true)]
    async fn emits_one_raise_and_one_clear() {
        let debouncer = AlarmDebouncer::new(HOLD);
        let mut changes = debouncer.subscribe();

        debouncer.trigger(7, AlarmKind::Ding);
        debouncer.trigger(7, AlarmKind::Ding);
        advance(Duration::from_millis(10_001)).await;
        tokio::task::yield_now().await;

        let raised = changes.recv().await.ok();
        let cleared = changes.recv().await.ok();
        assert_eq!(
            raised,
            Some(AlarmChange {
                device_id: 7,
                kind: AlarmKind::Ding,
                active: true
            })
        );
        assert_eq!(cleared.map(|c| c.active), Some(false));
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_does_not_clear() {
        let debouncer = AlarmDebouncer::new(HOLD);
        debouncer.trigger(3, AlarmKind::Ding);
        let stale = debouncer.shared.timers()[&(3, AlarmKind::Ding)].generation;
        debouncer.trigger(3, AlarmKind::Ding);

        debouncer.shared.expire((3, AlarmKind::Ding), stale);
        assert!(debouncer.is_active(3, AlarmKind::Ding));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_stops_timers() {
        let debouncer = AlarmDebouncer::new(HOLD);
        debouncer.trigger(1, AlarmKind::Ding);
        debouncer.trigger(2, AlarmKind::Motion);
        debouncer.cancel_all();
        assert_eq!(debouncer.active_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn edges_alternate_when_retrigger_races_expiry() {
        let debouncer = AlarmDebouncer::new(Duration::from_millis(2));
        let mut changes = debouncer.subscribe();

        for _ in 0..100 {
            debouncer.trigger(5, AlarmKind::Motion);
            tokio::time::sleep(Duration::from_millis(2)).await;
            debouncer.trigger(5, AlarmKind::Motion);
            tokio::time::sleep(Duration::from_millis(30)).await;

            let mut last = None;
            while let Ok(change) = changes.try_recv() {
                assert_ne!(last, Some(change.active), "repeated edge {change:?}");
                last = Some(change.active);
            }
            assert_eq!(last, Some(false));
            assert!(!debouncer.is_active(5, AlarmKind::Motion));
        }
    }
}
