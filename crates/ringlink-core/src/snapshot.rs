// ── Image retrieval ──
//
// Snapshot capture is asynchronous on the vendor side: a capture request
// reports the timestamp of the latest stored image, which only moves past
// the request time once the camera has uploaded a new one.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::session::SessionManager;

/// Image bytes returned by [`ImageRetriever::grab_image`].
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub device_id: u64,
    pub bytes: Bytes,
    /// Whether a capture newer than the request was confirmed before the
    /// fetch. A stale snapshot is still the latest stored image.
    pub fresh: bool,
    pub requested_at: DateTime<Utc>,
}

/// Requests a fresh capture and fetches the latest image.
pub struct ImageRetriever {
    session: Arc<SessionManager>,
    attempts: u32,
    interval: Duration,
}

impl ImageRetriever {
    pub fn new(session: Arc<SessionManager>, attempts: u32, interval: Duration) -> Self {
        Self {
            session,
            attempts,
            interval,
        }
    }

    /// Ask for a new capture up to `attempts` times, `interval` apart,
    /// stopping once the reported timestamp is at or after the request
    /// time. Then always fetch the latest image.
    ///
    /// Each call refreshes the session once and retries once on an
    /// authorization failure.
    pub async fn grab_image(&self, device_id: u64) -> Result<Snapshot, CoreError> {
        let requested_at = Utc::now();
        let t0 = requested_at.timestamp_millis();
        let mut fresh = false;

        for attempt in 1..=self.attempts {
            if attempt > 1 {
                tokio::time::sleep(self.interval).await;
            }
            let timestamps = self
                .session
                .with_reauth(|gw, tokens| async move { gw.request_snapshot(&tokens, device_id).await })
                .await?;
            let reported = timestamps.for_device(device_id);
            debug!(device_id, attempt, ?reported, t0, "snapshot capture status");
            if reported.is_some_and(|ts| ts >= t0) {
                fresh = true;
                break;
            }
        }

        if !fresh {
            info!(device_id, attempts = self.attempts, "no fresh snapshot, returning latest stored image");
        }

        let bytes = self
            .session
            .with_reauth(|gw, tokens| async move { gw.snapshot_image(&tokens, device_id).await })
            .await?;

        Ok(Snapshot {
            device_id,
            bytes,
            fresh,
            requested_at,
        })
    }
}
