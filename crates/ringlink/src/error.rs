//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use ringlink_config::ConfigError;
use ringlink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Ring cloud: {reason}")]
    #[diagnostic(
        code(ringlink::connection_failed),
        help("Check your network connection, then retry.")
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(ringlink::timeout),
        help("Increase the timeout with --timeout or defaults.timeout in the config.")
    )]
    Timeout { timeout_ms: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Not logged in")]
    #[diagnostic(code(ringlink::not_logged_in), help("Run: ringlink login"))]
    NotLoggedIn,

    #[error("Session expired: {message}")]
    #[diagnostic(
        code(ringlink::session_expired),
        help("The stored refresh token was rejected. Run: ringlink login")
    )]
    SessionExpired { message: String },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(ringlink::auth_failed),
        help("Check the account email and password, then run: ringlink login")
    )]
    AuthFailed { message: String },

    #[error("A two-factor code is required")]
    #[diagnostic(
        code(ringlink::mfa_required),
        help("Run `ringlink login` in an interactive terminal to enter the code.")
    )]
    MfaRequired,

    #[error("No account configured")]
    #[diagnostic(
        code(ringlink::no_account),
        help(
            "Pass --username, set RINGLINK_ACCOUNT__USERNAME, or add\n\
             [account] username = \"...\" to {path}"
        )
    )]
    NoAccount { path: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(ringlink::not_found),
        help("Run: ringlink {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Device {id} does not support '{operation}'")]
    #[diagnostic(
        code(ringlink::unsupported),
        help("Run: ringlink devices -o json to see each device's capabilities")
    )]
    Unsupported { operation: String, id: u64 },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error (HTTP {status}): {message}")]
    #[diagnostic(code(ringlink::api_error))]
    ApiError { status: u16, message: String },

    #[error("Unexpected response from the Ring cloud: {message}")]
    #[diagnostic(code(ringlink::decode))]
    Decode { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ringlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(ringlink::config))]
    Config(Box<ConfigError>),

    #[error("{message}")]
    #[diagnostic(code(ringlink::settings))]
    Settings { message: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(ringlink::internal))]
    Internal(String),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoAccount => Self::NoAccount {
                path: ringlink_config::config_path().display().to_string(),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotLoggedIn
            | Self::SessionExpired { .. }
            | Self::AuthFailed { .. }
            | Self::MfaRequired
            | Self::NoAccount { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Credential { message } => Self::AuthFailed { message },
            CoreError::MfaRequired { .. } => Self::MfaRequired,
            CoreError::AuthExpired { message } => Self::SessionExpired { message },

            CoreError::Timeout { timeout_ms } => Self::Timeout { timeout_ms },
            CoreError::ConnectionFailed { reason } => Self::ConnectionFailed { reason },

            CoreError::DeviceNotFound { id } => Self::NotFound {
                resource_type: "device".into(),
                identifier: id.to_string(),
                list_command: "devices".into(),
            },
            CoreError::NotFound { resource } => Self::NotFound {
                resource_type: "resource".into(),
                identifier: resource,
                list_command: "devices".into(),
            },
            CoreError::Unsupported { operation, id } => Self::Unsupported { operation, id },

            CoreError::Api { status, message } => Self::ApiError { status, message },
            CoreError::Decode { message } => Self::Decode { message },

            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Settings { message } => Self::Settings { message },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_share_an_exit_code() {
        let rejected = CliError::from(CoreError::Credential {
            message: "HTTP 401: invalid user credentials".into(),
        });
        assert!(matches!(rejected, CliError::AuthFailed { .. }));
        assert_eq!(rejected.exit_code(), exit_code::AUTH);
        assert_eq!(CliError::NotLoggedIn.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn unknown_device_is_not_found() {
        let err = CliError::from(CoreError::DeviceNotFound { id: 42 });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(err.to_string(), "device '42' not found");
    }

    #[test]
    fn server_errors_are_general() {
        let err = CliError::from(CoreError::Api {
            status: 503,
            message: "unavailable".into(),
        });
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
