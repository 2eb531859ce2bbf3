// ── Core error types ──
//
// Domain errors from ringlink-core. Consumers never see raw HTTP status
// codes or JSON parse failures; the `From<ringlink_api::Error>` impl
// translates gateway errors into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    Credential { message: String },

    #[error("Two-factor code required{}", delivery_suffix(.delivery.as_deref()))]
    MfaRequired { delivery: Option<String> },

    #[error("Session expired: {message}")]
    AuthExpired { message: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Cannot reach Ring cloud: {reason}")]
    ConnectionFailed { reason: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Device not found: {id}")]
    DeviceNotFound { id: u64 },

    #[error("Unexpected response: {message}")]
    Decode { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation} on device {id}")]
    Unsupported { operation: String, id: u64 },

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Settings store error: {message}")]
    Settings { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` when a token refresh could resolve the failure.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }

    /// `true` for failures the next poll cycle may not repeat.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::ConnectionFailed { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

fn delivery_suffix(delivery: Option<&str>) -> String {
    delivery
        .map(|d| format!(" (sent via {d})"))
        .unwrap_or_default()
}

// ── Conversion from gateway errors ───────────────────────────────────

impl From<ringlink_api::Error> for CoreError {
    fn from(err: ringlink_api::Error) -> Self {
        match err {
            ringlink_api::Error::Credential { message } => CoreError::Credential { message },
            ringlink_api::Error::MfaRequired { delivery } => CoreError::MfaRequired { delivery },
            ringlink_api::Error::AuthExpired { status, message } => CoreError::AuthExpired {
                message: format!("HTTP {status}: {message}"),
            },
            ringlink_api::Error::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            ringlink_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_ms: 0 }
                } else {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                }
            }
            ringlink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid endpoint URL: {e}"),
            },
            ringlink_api::Error::InvalidSegment { segment } => {
                CoreError::NotFound { resource: segment }
            }
            ringlink_api::Error::NotFound { path } => CoreError::NotFound { resource: path },
            ringlink_api::Error::Api { status, message } => CoreError::Api { status, message },
            ringlink_api::Error::Decode { message, body } => CoreError::Decode {
                message: if body.is_empty() {
                    message
                } else {
                    format!("{message} (body: {body})")
                },
            },
        }
    }
}
