// OAuth token grants
//
// Password grant (with optional second-factor code) and refresh grant.
// Both answer with a bearer + rotated refresh token. A 412 on the password
// grant is the vendor's second-factor challenge and surfaces as
// `Error::MfaRequired`; the caller resubmits with the code.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::auth::{Host, RequestAuth};
use crate::error::Error;
use crate::gateway::{ApiRequest, HttpGateway};
use crate::models::{AuthGrant, TokenResponse};

const TOKEN_PATH: &str = "oauth/token";
const CLIENT_ID: &str = "ring_official_android";
const SCOPE: &str = "client";

impl HttpGateway {
    /// Exchange username/password for a bearer + refresh token.
    ///
    /// Pass `mfa_code` on the second attempt after an
    /// [`Error::MfaRequired`] challenge.
    pub async fn password_grant(
        &self,
        username: &str,
        password: &SecretString,
        mfa_code: Option<&str>,
    ) -> Result<AuthGrant, Error> {
        debug!(username, with_code = mfa_code.is_some(), "requesting password grant");

        let body = json!({
            "client_id": CLIENT_ID,
            "scope": SCOPE,
            "grant_type": "password",
            "username": username,
            "password": password.expose_secret(),
        });

        let raw: TokenResponse = self
            .request_json(
                ApiRequest::post(Host::OAuth, TOKEN_PATH).json(body),
                RequestAuth::TokenGrant { mfa_code },
            )
            .await?;

        Ok(raw.into())
    }

    /// Mint a fresh bearer from a stored refresh token.
    pub async fn refresh_grant(&self, refresh_token: &SecretString) -> Result<AuthGrant, Error> {
        debug!("requesting refresh grant");

        let body = json!({
            "client_id": CLIENT_ID,
            "scope": SCOPE,
            "grant_type": "refresh_token",
            "refresh_token": refresh_token.expose_secret(),
        });

        let raw: TokenResponse = self
            .request_json(
                ApiRequest::post(Host::OAuth, TOKEN_PATH).json(body),
                RequestAuth::TokenGrant { mfa_code: None },
            )
            .await?;

        Ok(raw.into())
    }
}
