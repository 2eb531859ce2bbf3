// ── Reactive device registry ──
//
// Concurrent storage with O(1) lookups and push-based change notification
// via `watch` channels. Records are created on the first poll that
// mentions a device and updated on every later one; nothing here removes
// them.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ringlink_api::{RawDevice, RingDevices};
use tokio::sync::watch;
use tracing::debug;

use crate::model::{AlarmKind, DeviceKind, DeviceRecord};

/// Outcome of applying one device-list poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SyncSummary {
    pub fn changed(&self) -> bool {
        self.created + self.updated > 0
    }
}

enum Upsert {
    Created,
    Updated,
    Unchanged,
}

/// Device records keyed by vendor id.
///
/// Every mutation bumps a version counter and rebuilds the snapshot that
/// subscribers receive.
pub struct DeviceRegistry {
    by_id: DashMap<u64, Arc<DeviceRecord>>,
    version: watch::Sender<u64>,
    snapshot: watch::Sender<Arc<Vec<Arc<DeviceRecord>>>>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_id: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Upsert every device in a `ring_devices` payload, diffing against the
    /// cached records.
    pub fn apply_devices(&self, devices: &RingDevices) -> SyncSummary {
        let families = [
            (DeviceKind::Doorbell, &devices.doorbots),
            (DeviceKind::Doorbell, &devices.authorized_doorbots),
            (DeviceKind::StickupCam, &devices.stickup_cams),
            (DeviceKind::Chime, &devices.chimes),
        ];

        let mut summary = SyncSummary::default();
        for (kind, list) in families {
            for raw in list {
                match self.upsert_entry(kind, raw.clone()) {
                    Upsert::Created => summary.created += 1,
                    Upsert::Updated => summary.updated += 1,
                    Upsert::Unchanged => summary.unchanged += 1,
                }
            }
        }

        if summary.changed() {
            self.rebuild_snapshot();
            self.bump_version();
        }
        debug!(
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            "device registry synced"
        );
        summary
    }

    /// Record an alarm edge from the debouncer. Returns `false` for an
    /// unknown device.
    pub fn set_alarm(&self, device_id: u64, kind: AlarmKind, active: bool) -> bool {
        let changed = {
            let Some(mut entry) = self.by_id.get_mut(&device_id) else {
                return false;
            };
            let mut record = DeviceRecord::clone(entry.value());
            let flag = match kind {
                AlarmKind::Ding => &mut record.state.alarm_generic,
                AlarmKind::Motion => &mut record.state.alarm_motion,
            };
            let changed = *flag != active;
            *flag = active;
            if changed {
                *entry.value_mut() = Arc::new(record);
            }
            changed
        };

        if changed {
            self.rebuild_snapshot();
            self.bump_version();
        }
        true
    }

    pub fn get(&self, id: u64) -> Option<Arc<DeviceRecord>> {
        self.by_id.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Current snapshot, ordered by id (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<Arc<DeviceRecord>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<DeviceRecord>>>> {
        self.snapshot.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn upsert_entry(&self, kind: DeviceKind, raw: RawDevice) -> Upsert {
        match self.by_id.entry(raw.id) {
            Entry::Vacant(slot) => {
                debug!(id = raw.id, %kind, "new device");
                slot.insert(Arc::new(DeviceRecord::from_raw(kind, raw)));
                Upsert::Created
            }
            Entry::Occupied(mut slot) => {
                let next = slot.get().updated(raw);
                if **slot.get() == next {
                    Upsert::Unchanged
                } else {
                    slot.insert(Arc::new(next));
                    Upsert::Updated
                }
            }
        }
    }

    fn rebuild_snapshot(&self) {
        let mut values: Vec<Arc<DeviceRecord>> =
            self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        values.sort_by_key(|r| r.id);
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn devices(value: serde_json::Value) -> RingDevices {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn first_poll_creates_records_by_family() {
        let registry = DeviceRegistry::new();
        let summary = registry.apply_devices(&devices(json!({
            "doorbots": [{ "id": 1, "description": "Front" }],
            "stickup_cams": [{ "id": 2, "led_status": "off" }],
            "chimes": [{ "id": 3 }]
        })));

        assert_eq!(summary.created, 3);
        assert_eq!(registry.get(1).unwrap().kind, DeviceKind::Doorbell);
        assert_eq!(registry.get(2).unwrap().kind, DeviceKind::StickupCam);
        assert_eq!(registry.get(3).unwrap().kind, DeviceKind::Chime);

        let ids: Vec<u64> = registry.snapshot().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn identical_poll_is_unchanged_and_keeps_version() {
        let registry = DeviceRegistry::new();
        let payload = devices(json!({ "doorbots": [{ "id": 1, "battery_life": "90" }] }));
        registry.apply_devices(&payload);
        let version = registry.version();

        let summary = registry.apply_devices(&payload);
        assert_eq!(summary.unchanged, 1);
        assert!(!summary.changed());
        assert_eq!(registry.version(), version);
    }

    #[test]
    fn later_poll_updates_without_removing() {
        let registry = DeviceRegistry::new();
        registry.apply_devices(&devices(json!({
            "doorbots": [{ "id": 1, "battery_life": "90" }, { "id": 2 }]
        })));

        let summary =
            registry.apply_devices(&devices(json!({ "doorbots": [{ "id": 1, "battery_life": "70" }] })));
        assert_eq!(summary.updated, 1);
        assert_eq!(registry.get(1).unwrap().state.battery, Some(70));
        assert!(registry.get(2).is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn alarm_edges_update_state() {
        let registry = DeviceRegistry::new();
        registry.apply_devices(&devices(json!({ "doorbots": [{ "id": 1 }] })));

        assert!(registry.set_alarm(1, AlarmKind::Ding, true));
        assert!(registry.get(1).unwrap().state.alarm_generic);
        assert!(registry.set_alarm(1, AlarmKind::Ding, false));
        assert!(!registry.get(1).unwrap().state.alarm_generic);
        assert!(!registry.set_alarm(99, AlarmKind::Motion, true));
    }

    #[tokio::test]
    async fn subscribers_see_new_snapshot() {
        let registry = DeviceRegistry::new();
        let mut rx = registry.subscribe();
        registry.apply_devices(&devices(json!({ "chimes": [{ "id": 3 }] })));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);
    }
}
