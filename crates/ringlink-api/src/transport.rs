// Shared transport configuration for building the reqwest::Client.
//
// The gateway owns one client for every vendor host; this module keeps the
// builder logic (user agent, connect timeout, compression) in one place.

use std::time::Duration;

/// Default per-request timeout, matching the vendor app's own budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request budget enforced by the gateway (connect + body).
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("ringlink/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl TransportConfig {
    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// The overall request deadline is applied by the gateway, so only the
    /// connect phase is bounded here.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .connect_timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
