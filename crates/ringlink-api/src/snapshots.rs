// Snapshot endpoints
//
// `snapshots/timestamps` asks the camera for a capture and reports the
// time of the latest stored image; `snapshots/image/{id}` returns that
// image's bytes. Both are image-class calls (bearer + hardware id).

use bytes::Bytes;
use serde_json::json;
use tracing::debug;

use crate::auth::{Host, RequestAuth, TokenPair};
use crate::error::Error;
use crate::gateway::{ApiRequest, HttpGateway};
use crate::models::SnapshotTimestamps;

impl HttpGateway {
    /// Request a capture and read back the latest snapshot timestamps.
    ///
    /// `POST snapshots/timestamps`
    pub async fn request_snapshot(
        &self,
        tokens: &TokenPair,
        device_id: u64,
    ) -> Result<SnapshotTimestamps, Error> {
        debug!(device_id, "requesting snapshot capture");
        self.request_json(
            ApiRequest::post(Host::Snapshots, "snapshots/timestamps")
                .json(json!({ "doorbot_ids": [device_id] })),
            RequestAuth::Image {
                bearer: &tokens.bearer,
            },
        )
        .await
    }

    /// Fetch the latest stored snapshot image for a device.
    ///
    /// `GET snapshots/image/{id}`
    pub async fn snapshot_image(&self, tokens: &TokenPair, device_id: u64) -> Result<Bytes, Error> {
        let body = self
            .request(
                ApiRequest::get(Host::Snapshots, format!("snapshots/image/{device_id}")).raw(),
                RequestAuth::Image {
                    bearer: &tokens.bearer,
                },
            )
            .await?;
        Ok(body.into_bytes())
    }
}
