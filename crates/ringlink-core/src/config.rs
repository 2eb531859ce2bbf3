// ── Engine configuration ──
//
// Describes *what* to talk to and *how often*. Built by the CLI from the
// figment-loaded profile, or directly by embedders and tests.

use std::time::Duration;

use ringlink_api::{Endpoints, TransportConfig};

/// Per-poller periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    /// Active-dings poll. Drives alarm latency, so keep it short.
    pub dings: Duration,
    /// Full device list poll.
    pub devices: Duration,
    /// Location-mode poll.
    pub location_modes: Duration,
    /// Session verification timer.
    pub verify: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            dings: Duration::from_secs(5),
            devices: Duration::from_secs(600),
            location_modes: Duration::from_secs(60),
            verify: Duration::from_secs(60),
        }
    }
}

/// Everything [`RingEngine`](crate::RingEngine) needs at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub endpoints: Endpoints,
    pub transport: TransportConfig,
    pub intervals: PollIntervals,
    /// How long an alarm stays active after its last triggering event.
    pub alarm_hold: Duration,
    /// Freshness checks made before fetching a snapshot.
    pub snapshot_attempts: u32,
    /// Pause between freshness checks.
    pub snapshot_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            transport: TransportConfig::default(),
            intervals: PollIntervals::default(),
            alarm_hold: Duration::from_secs(10),
            snapshot_attempts: 3,
            snapshot_interval: Duration::from_secs(1),
        }
    }
}
