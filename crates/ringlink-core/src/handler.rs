// ── Device handlers ──
//
// Consume fan-out deltas on behalf of the registered devices: ringing
// events become debounced alarms, and alarm edges are written back into
// the device records.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::debounce::{AlarmChange, AlarmDebouncer};
use crate::fanout::Subscription;
use crate::model::DingEvent;
use crate::registry::DeviceRegistry;

/// Route one ding poll to the debouncer.
///
/// An event only counts for a registered device whose capabilities cover
/// the alarm it would raise. Returns the number of alarms triggered.
pub fn route_dings(
    registry: &DeviceRegistry,
    debouncer: &AlarmDebouncer,
    events: &[DingEvent],
) -> usize {
    let mut triggered = 0;
    for event in events {
        let Some(device) = registry.get(event.doorbot_id) else {
            debug!(doorbot_id = event.doorbot_id, "ding for unknown device");
            continue;
        };
        for alarm in event.alarms() {
            if device.has(alarm.capability()) {
                debouncer.trigger(device.id, alarm);
                triggered += 1;
            }
        }
    }
    triggered
}

/// Long-running dispatcher: ding deltas in, alarm state out.
///
/// The receivers are subscribed by the caller before the task is spawned,
/// so a batch published before the task first runs is still delivered.
pub(crate) async fn dispatch_task(
    registry: Arc<DeviceRegistry>,
    debouncer: AlarmDebouncer,
    mut dings: Subscription<Arc<Vec<DingEvent>>>,
    mut alarms: broadcast::Receiver<AlarmChange>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            batch = dings.recv() => {
                let Some(batch) = batch else { break };
                route_dings(&registry, &debouncer, &batch);
            }
            change = alarms.recv() => match change {
                Ok(change) => {
                    registry.set_alarm(change.device_id, change.kind, change.active);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "alarm dispatcher lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    debug!("ding dispatcher stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::fanout::StateFanout;
    use crate::model::{AlarmKind, DingKind};
    use serde_json::json;

    fn registry() -> DeviceRegistry {
        let registry = DeviceRegistry::new();
        registry.apply_devices(
            &serde_json::from_value(json!({
                "doorbots": [{ "id": 1 }],
                "stickup_cams": [{ "id": 2 }]
            }))
            .unwrap(),
        );
        registry
    }

    fn ding(doorbot_id: u64, kind: DingKind, ringing: bool, motion: bool) -> DingEvent {
        DingEvent {
            id: None,
            doorbot_id,
            kind,
            ringing,
            motion,
            description: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn routes_only_matching_devices() {
        let registry = registry();
        let debouncer = AlarmDebouncer::new(Duration::from_secs(10));

        let triggered = route_dings(
            &registry,
            &debouncer,
            &[
                ding(1, DingKind::Ding, true, true),
                ding(99, DingKind::Ding, true, false),
                ding(2, DingKind::Motion, false, false),
            ],
        );

        assert_eq!(triggered, 2);
        assert!(debouncer.is_active(1, AlarmKind::Ding));
        assert!(debouncer.is_active(1, AlarmKind::Motion));
        assert!(!debouncer.is_active(2, AlarmKind::Motion));
        assert!(!debouncer.is_active(99, AlarmKind::Ding));
    }

    #[tokio::test(start_paused = true)]
    async fn cameras_ignore_ding_alarms() {
        let registry = registry();
        let debouncer = AlarmDebouncer::new(Duration::from_secs(10));

        route_dings(&registry, &debouncer, &[ding(2, DingKind::Ding, true, false)]);
        assert!(!debouncer.is_active(2, AlarmKind::Ding));
    }

    #[tokio::test(start_paused = true)]
    async fn dispatcher_writes_alarm_edges_to_registry() {
        let registry = Arc::new(registry());
        let debouncer = AlarmDebouncer::new(Duration::from_secs(10));
        let fanout = Arc::new(StateFanout::new());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(dispatch_task(
            Arc::clone(&registry),
            debouncer.clone(),
            fanout.subscribe_dings(),
            debouncer.subscribe(),
            cancel.clone(),
        ));

        // Published before the dispatcher has been polled once.
        let mut devices = registry.subscribe();
        fanout.publish_dings(vec![ding(1, DingKind::Ding, true, false)]);
        devices.changed().await.unwrap();
        assert!(registry.get(1).unwrap().state.alarm_generic);

        // Paused clock auto-advances to the hold expiry.
        devices.changed().await.unwrap();
        assert!(!registry.get(1).unwrap().state.alarm_generic);

        cancel.cancel();
        task.await.unwrap();
    }
}
