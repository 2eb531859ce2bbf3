use secrecy::SecretString;
use url::Url;

/// Which vendor host a request targets.
///
/// The cloud is split across four hosts; [`Endpoints`] maps each to a
/// base URL so tests can point all of them at a single mock server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    /// OAuth token endpoint (password and refresh grants).
    OAuth,
    /// `clients_api`: session, device list, dings, device actions.
    Api,
    /// App API: locations, location modes, device settings.
    App,
    /// Snapshot service: capture timestamps and image bytes.
    Snapshots,
}

/// Base URLs for every vendor host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub oauth: Url,
    pub api: Url,
    pub app: Url,
    pub snapshots: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            oauth: Url::parse("https://oauth.ring.com").expect("static URL"),
            api: Url::parse("https://api.ring.com").expect("static URL"),
            app: Url::parse("https://app.ring.com").expect("static URL"),
            snapshots: Url::parse("https://app-snaps.ring.com").expect("static URL"),
        }
    }
}

impl Endpoints {
    /// Route every host to the same base URL.
    pub fn single(base: Url) -> Self {
        Self {
            oauth: base.clone(),
            api: base.clone(),
            app: base.clone(),
            snapshots: base,
        }
    }

    /// The base URL for a host.
    pub fn base(&self, host: Host) -> &Url {
        match host {
            Host::OAuth => &self.oauth,
            Host::Api => &self.api,
            Host::App => &self.app,
            Host::Snapshots => &self.snapshots,
        }
    }
}

/// A bearer token and the session token minted from it.
///
/// The two are only valid together: a session token obtained with a stale
/// bearer is invalid, so they are stored, passed, and discarded as a unit.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub bearer: SecretString,
    pub session: SecretString,
}

/// Credential material and header composition for a single request.
///
/// Each variant corresponds to an endpoint class with its own header set:
///
/// | class | headers / query |
/// |---|---|
/// | `TokenGrant` | `hardware_id`, `2fa-support: true`, optional `2fa-code` |
/// | `SessionCreate` | `Authorization: Bearer`, `hardware_id` |
/// | `Data` | `Authorization: Bearer`, `?api_version=..&auth_token=..` |
/// | `Image` | `Authorization: Bearer`, `hardware_id` |
#[derive(Debug, Clone, Copy)]
pub enum RequestAuth<'a> {
    TokenGrant { mfa_code: Option<&'a str> },
    SessionCreate { bearer: &'a SecretString },
    Data(&'a TokenPair),
    Image { bearer: &'a SecretString },
}

impl RequestAuth<'_> {
    /// Token grants are the only calls made without session material;
    /// every other class reports a 4xx as expired authorization.
    pub fn requires_session(&self) -> bool {
        !matches!(self, Self::TokenGrant { .. })
    }
}
