use thiserror::Error;

/// Top-level error type for the `ringlink-api` crate.
///
/// Every HTTP exchange with the vendor cloud is classified into one of
/// these variants by [`HttpGateway`](crate::HttpGateway). `ringlink-core`
/// maps them into its domain taxonomy and drives the session state
/// machine off the authentication variants.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The token endpoint rejected the supplied password or refresh token.
    #[error("Invalid credentials: {message}")]
    Credential { message: String },

    /// The password grant needs a one-time code (HTTP 412).
    ///
    /// `delivery` describes where the vendor sent the code, when it says.
    #[error("Two-factor authentication code required")]
    MfaRequired { delivery: Option<String> },

    /// An authenticated call was rejected -- the bearer/session pair is stale.
    #[error("Authorization rejected (HTTP {status}): {message}")]
    AuthExpired { status: u16, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A caller-supplied identifier that cannot be used as a path segment.
    #[error("Invalid identifier: {segment:?}")]
    InvalidSegment { segment: String },

    /// Request was aborted after the gateway timeout elapsed.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Responses ───────────────────────────────────────────────────
    /// HTTP 404 for the requested path.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Any other non-success status (5xx, unexpected 3xx).
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// JSON deserialization failed, with a body preview for debugging.
    #[error("Decode error: {message}")]
    Decode { message: String, body: String },
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_ms: 0 }
        } else {
            Self::Transport(err)
        }
    }
}

impl Error {
    /// Returns `true` if the session tokens were rejected and a refresh
    /// might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next poll.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_expired_is_only_auth_variant_that_triggers_refresh() {
        let expired = Error::AuthExpired {
            status: 401,
            message: String::new(),
        };
        let mfa = Error::MfaRequired { delivery: None };
        let cred = Error::Credential {
            message: "bad password".into(),
        };

        assert!(expired.is_auth_expired());
        assert!(!mfa.is_auth_expired());
        assert!(!cred.is_auth_expired());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Api {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_transient());
        assert!(Error::Timeout { timeout_ms: 2500 }.is_transient());
        assert!(
            !Error::NotFound {
                path: "/x".into()
            }
            .is_transient()
        );
    }
}
