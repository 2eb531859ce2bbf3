// Session token exchange
//
// Step one of the two-step exchange: a bearer token buys a session token
// bound to this installation's hardware id. The caller caches both
// together as a `TokenPair`.

use secrecy::SecretString;
use serde_json::json;
use tracing::debug;

use crate::auth::{Host, RequestAuth};
use crate::error::Error;
use crate::gateway::{API_VERSION, ApiRequest, HttpGateway};
use crate::models::SessionResponse;

impl HttpGateway {
    /// Create a session for this hardware id using `bearer`.
    pub async fn create_session(&self, bearer: &SecretString) -> Result<SecretString, Error> {
        debug!(hardware_id = %self.hardware_id(), "creating session");

        let body = json!({
            "device": {
                "hardware_id": self.hardware_id(),
                "metadata": {
                    "api_version": API_VERSION,
                    "device_model": "ringlink",
                },
                "os": "android",
            }
        });

        let resp: SessionResponse = self
            .request_json(
                ApiRequest::post(Host::Api, "clients_api/session").json(body),
                RequestAuth::SessionCreate { bearer },
            )
            .await?;

        resp.profile
            .and_then(|p| p.authentication_token)
            .map(SecretString::from)
            .ok_or_else(|| Error::Decode {
                message: "session response has no profile.authentication_token".into(),
                body: String::new(),
            })
    }
}
