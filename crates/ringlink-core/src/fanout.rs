// ── State fan-out ──
//
// One typed broadcast channel per delta kind. Pollers publish, device
// handlers and external consumers subscribe. Each subscriber gets its own
// receiver, so a slow consumer only lags itself.

use std::sync::Arc;

use ringlink_api::RingDevices;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use crate::model::{DingEvent, ModeChange};

const CHANNEL_SIZE: usize = 64;

/// Typed publish/subscribe surface for poll deltas.
///
/// | channel | wire name | payload |
/// |---|---|---|
/// | dings | `refresh_device` | every event from one ding poll, possibly empty |
/// | devices | `refresh_devices` | full `ring_devices` payload |
/// | modes | `refresh_locationMode` | one [`ModeChange`] |
pub struct StateFanout {
    dings: broadcast::Sender<Arc<Vec<DingEvent>>>,
    devices: broadcast::Sender<Arc<RingDevices>>,
    modes: broadcast::Sender<ModeChange>,
}

impl Default for StateFanout {
    fn default() -> Self {
        Self::new()
    }
}

impl StateFanout {
    pub fn new() -> Self {
        let (dings, _) = broadcast::channel(CHANNEL_SIZE);
        let (devices, _) = broadcast::channel(CHANNEL_SIZE);
        let (modes, _) = broadcast::channel(CHANNEL_SIZE);
        Self {
            dings,
            devices,
            modes,
        }
    }

    // ── Publish ──────────────────────────────────────────────────────
    //
    // Return the number of subscribers reached. Zero is not an error.

    pub fn publish_dings(&self, events: Vec<DingEvent>) -> usize {
        self.dings.send(Arc::new(events)).unwrap_or(0)
    }

    pub fn publish_devices(&self, devices: RingDevices) -> usize {
        self.devices.send(Arc::new(devices)).unwrap_or(0)
    }

    pub fn publish_mode_change(&self, change: ModeChange) -> usize {
        self.modes.send(change).unwrap_or(0)
    }

    // ── Subscribe ────────────────────────────────────────────────────

    pub fn subscribe_dings(&self) -> Subscription<Arc<Vec<DingEvent>>> {
        Subscription::new("refresh_device", self.dings.subscribe())
    }

    pub fn subscribe_devices(&self) -> Subscription<Arc<RingDevices>> {
        Subscription::new("refresh_devices", self.devices.subscribe())
    }

    pub fn subscribe_modes(&self) -> Subscription<ModeChange> {
        Subscription::new("refresh_locationMode", self.modes.subscribe())
    }
}

/// A receiver for one delta kind.
pub struct Subscription<T> {
    channel: &'static str,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    fn new(channel: &'static str, rx: broadcast::Receiver<T>) -> Self {
        Self { channel, rx }
    }

    /// Next delta. Lagged messages are skipped with a warning; `None`
    /// once the fan-out has been dropped.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel = self.channel, skipped, "subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Convert into a `Stream`, dropping lagged gaps.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send + 'static {
        BroadcastStream::new(self.rx).filter_map(Result::ok)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::DingKind;

    fn ding(id: u64) -> DingEvent {
        DingEvent {
            id: Some(id),
            doorbot_id: 1,
            kind: DingKind::Ding,
            ringing: true,
            motion: false,
            description: None,
        }
    }

    #[tokio::test]
    async fn every_subscriber_receives_each_delta() {
        let fanout = StateFanout::new();
        let mut a = fanout.subscribe_dings();
        let mut b = fanout.subscribe_dings();

        assert_eq!(fanout.publish_dings(vec![ding(1)]), 2);
        assert_eq!(a.recv().await.unwrap()[0].id, Some(1));
        assert_eq!(b.recv().await.unwrap()[0].id, Some(1));
    }

    #[tokio::test]
    async fn empty_ding_list_is_still_published() {
        let fanout = StateFanout::new();
        let mut sub = fanout.subscribe_dings();
        fanout.publish_dings(Vec::new());
        assert!(sub.recv().await.unwrap().is_empty());
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let fanout = StateFanout::new();
        assert_eq!(fanout.publish_devices(RingDevices::default()), 0);
    }

    #[tokio::test]
    async fn subscription_streams_mode_changes() {
        let fanout = StateFanout::new();
        let mut stream = Box::pin(fanout.subscribe_modes().into_stream());
        fanout.publish_mode_change(ModeChange {
            location_id: "loc".into(),
            name: "Home".into(),
            old: "home".into(),
            new: "away".into(),
        });
        let change = stream.next().await.unwrap();
        assert_eq!(change.new, "away");
    }
}
