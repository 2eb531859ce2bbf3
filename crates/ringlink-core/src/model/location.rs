// ── Location security modes ──

use serde::{Deserialize, Serialize};

/// The remembered mode of one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationMode {
    pub location_id: String,
    pub name: String,
    /// `"home"`, `"away"`, `"disarmed"`, ...
    pub mode: String,
}

/// Published when a poll sees a location's mode differ from the last one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeChange {
    pub location_id: String,
    pub name: String,
    pub old: String,
    pub new: String,
}
