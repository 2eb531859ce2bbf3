// Device endpoints
//
// Device list, active dings, and the per-device actions (chime, floodlight,
// siren, motion detection). All are data-class calls authorized by the
// current `TokenPair`.

use serde_json::json;
use tracing::debug;

use crate::auth::{Host, RequestAuth, TokenPair};
use crate::error::Error;
use crate::gateway::{ApiRequest, HttpGateway};
use crate::models::{Ding, RingDevices};

impl HttpGateway {
    /// List every device on the account, grouped by family.
    ///
    /// `GET clients_api/ring_devices`
    pub async fn list_devices(&self, tokens: &TokenPair) -> Result<RingDevices, Error> {
        self.request_json(
            ApiRequest::get(Host::Api, "clients_api/ring_devices"),
            RequestAuth::Data(tokens),
        )
        .await
    }

    /// List dings that are currently live. Usually empty.
    ///
    /// `GET clients_api/dings/active`
    pub async fn active_dings(&self, tokens: &TokenPair) -> Result<Vec<Ding>, Error> {
        let dings: Option<Vec<Ding>> = self
            .request_json(
                ApiRequest::get(Host::Api, "clients_api/dings/active"),
                RequestAuth::Data(tokens),
            )
            .await?;
        Ok(dings.unwrap_or_default())
    }

    /// Play a sound on a chime (`"ding"` or `"motion"`).
    ///
    /// `POST clients_api/chimes/{id}/play_sound`
    pub async fn play_chime(&self, tokens: &TokenPair, id: u64, sound: &str) -> Result<(), Error> {
        debug!(id, sound, "playing chime");
        self.request(
            ApiRequest::post(Host::Api, format!("clients_api/chimes/{id}/play_sound"))
                .json(json!({ "kind": sound })),
            RequestAuth::Data(tokens),
        )
        .await?;
        Ok(())
    }

    /// Switch a camera floodlight.
    ///
    /// `PUT clients_api/doorbots/{id}/floodlight_light_on|off`
    pub async fn set_floodlight(&self, tokens: &TokenPair, id: u64, on: bool) -> Result<(), Error> {
        let action = if on {
            "floodlight_light_on"
        } else {
            "floodlight_light_off"
        };
        self.doorbot_put(tokens, id, action).await
    }

    /// Switch a camera siren.
    ///
    /// `PUT clients_api/doorbots/{id}/siren_on|off`
    pub async fn set_siren(&self, tokens: &TokenPair, id: u64, on: bool) -> Result<(), Error> {
        let action = if on { "siren_on" } else { "siren_off" };
        self.doorbot_put(tokens, id, action).await
    }

    /// Subscribe to (or drop) motion push events for a device.
    ///
    /// `POST clients_api/doorbots/{id}/motions_subscribe|motions_unsubscribe`
    pub async fn set_motion_subscription(
        &self,
        tokens: &TokenPair,
        id: u64,
        subscribed: bool,
    ) -> Result<(), Error> {
        let action = if subscribed {
            "motions_subscribe"
        } else {
            "motions_unsubscribe"
        };
        debug!(id, action, "updating motion subscription");
        self.request(
            ApiRequest::post(Host::Api, format!("clients_api/doorbots/{id}/{action}")),
            RequestAuth::Data(tokens),
        )
        .await?;
        Ok(())
    }

    /// Enable or disable motion detection in the device settings.
    ///
    /// `PATCH devices/v1/devices/{id}/settings`
    pub async fn set_motion_detection(
        &self,
        tokens: &TokenPair,
        id: u64,
        enabled: bool,
    ) -> Result<(), Error> {
        debug!(id, enabled, "updating motion detection");
        self.request(
            ApiRequest::patch(Host::App, format!("devices/v1/devices/{id}/settings")).json(json!({
                "motion_settings": { "motion_detection_enabled": enabled }
            })),
            RequestAuth::Data(tokens),
        )
        .await?;
        Ok(())
    }

    async fn doorbot_put(&self, tokens: &TokenPair, id: u64, action: &str) -> Result<(), Error> {
        debug!(id, action, "doorbot action");
        self.request(
            ApiRequest::put(Host::Api, format!("clients_api/doorbots/{id}/{action}")),
            RequestAuth::Data(tokens),
        )
        .await?;
        Ok(())
    }
}
