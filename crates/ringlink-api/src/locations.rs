// Location endpoints
//
// Locations and their security mode (home / away / disarmed).

use serde_json::json;
use tracing::debug;

use crate::auth::{Host, RequestAuth, TokenPair};
use crate::error::Error;
use crate::gateway::{ApiRequest, HttpGateway};
use crate::models::{Location, LocationsResponse, ModeResponse};

impl HttpGateway {
    /// List the account's locations.
    ///
    /// `GET rhq/v1/devices/v1/locations`
    pub async fn list_locations(&self, tokens: &TokenPair) -> Result<Vec<Location>, Error> {
        let resp: LocationsResponse = self
            .request_json(
                ApiRequest::get(Host::App, "rhq/v1/devices/v1/locations"),
                RequestAuth::Data(tokens),
            )
            .await?;
        Ok(resp.user_locations)
    }

    /// Read the current mode of a location.
    ///
    /// `GET api/v1/mode/location/{id}`
    pub async fn location_mode(&self, tokens: &TokenPair, location_id: &str) -> Result<String, Error> {
        let resp: ModeResponse = self
            .request_json(
                ApiRequest::get(Host::App, "api/v1/mode/location").segment(location_id),
                RequestAuth::Data(tokens),
            )
            .await?;
        Ok(resp.mode)
    }

    /// Set the mode of a location, returning the mode the cloud reports back.
    ///
    /// `POST api/v1/mode/location/{id}`
    pub async fn set_location_mode(
        &self,
        tokens: &TokenPair,
        location_id: &str,
        mode: &str,
    ) -> Result<String, Error> {
        debug!(location_id, mode, "setting location mode");
        let resp: Option<ModeResponse> = self
            .request_json(
                ApiRequest::post(Host::App, "api/v1/mode/location")
                    .segment(location_id)
                    .json(json!({ "mode": mode })),
                RequestAuth::Data(tokens),
            )
            .await?;
        Ok(resp.map_or_else(|| mode.to_owned(), |r| r.mode))
    }
}
