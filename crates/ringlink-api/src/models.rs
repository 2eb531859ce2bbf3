// Wire types for the vendor cloud
//
// These mirror the JSON shapes returned by the API. Fields the client does
// not interpret are kept in `extra` so the full payload survives into the
// device registry and the `refresh_devices` fan-out.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── OAuth ────────────────────────────────────────────────────────────

/// Token endpoint response, as sent over the wire.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// A successful password or refresh grant.
#[derive(Debug, Clone)]
pub struct AuthGrant {
    /// Short-lived bearer used to mint a session token.
    pub bearer: SecretString,
    /// Rotated refresh token; always persist the latest one.
    pub refresh: SecretString,
    pub expires_in: Option<u64>,
}

impl From<TokenResponse> for AuthGrant {
    fn from(raw: TokenResponse) -> Self {
        Self {
            bearer: SecretString::from(raw.access_token),
            refresh: SecretString::from(raw.refresh_token),
            expires_in: raw.expires_in,
        }
    }
}

/// Session endpoint response: `{ "profile": { "authentication_token": .. } }`.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionResponse {
    pub profile: Option<SessionProfile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionProfile {
    pub authentication_token: Option<String>,
}

// ── Devices ──────────────────────────────────────────────────────────

/// Full `ring_devices` payload, grouped by device family.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RingDevices {
    #[serde(default)]
    pub doorbots: Vec<RawDevice>,
    #[serde(default)]
    pub authorized_doorbots: Vec<RawDevice>,
    #[serde(default)]
    pub stickup_cams: Vec<RawDevice>,
    #[serde(default)]
    pub chimes: Vec<RawDevice>,
}

impl RingDevices {
    /// Total number of devices across all families.
    pub fn len(&self) -> usize {
        self.doorbots.len()
            + self.authorized_doorbots.len()
            + self.stickup_cams.len()
            + self.chimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One device record as returned by `ring_devices`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawDevice {
    pub id: u64,
    #[serde(default)]
    pub description: Option<String>,
    /// Hardware model identifier (`"doorbell_v3"`, `"stickup_cam_lunar"`, ...).
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    /// Battery percentage; the API sends it as a string on doorbells and
    /// as a number on cameras, occasionally above 100.
    #[serde(default)]
    pub battery_life: Option<Value>,
    /// Floodlight state (`"on"` / `"off"`), only on light-capable cameras.
    #[serde(default)]
    pub led_status: Option<Value>,
    /// Siren state, only on siren-capable cameras.
    #[serde(default)]
    pub siren_status: Option<SirenStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SirenStatus {
    #[serde(default)]
    pub seconds_remaining: u64,
}

// ── Dings ────────────────────────────────────────────────────────────

/// One active ding from `dings/active`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ding {
    #[serde(default)]
    pub id: Option<u64>,
    pub doorbot_id: u64,
    /// `"ding"`, `"motion"`, or `"on_demand"`.
    pub kind: String,
    /// `"ringing"` while the event is live.
    #[serde(default)]
    pub state: String,
    /// Motion flag carried on ding-kind events.
    #[serde(default)]
    pub motion: bool,
    #[serde(default)]
    pub doorbot_description: Option<String>,
}

// ── Locations ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct LocationsResponse {
    #[serde(default)]
    pub user_locations: Vec<Location>,
}

/// A vendor location (home) that owns devices and a security mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub location_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModeResponse {
    pub mode: String,
}

// ── Snapshots ────────────────────────────────────────────────────────

/// `snapshots/timestamps` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotTimestamps {
    #[serde(default)]
    pub timestamps: Vec<SnapshotTimestamp>,
}

/// Capture time of the latest stored snapshot, in epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotTimestamp {
    pub doorbot_id: u64,
    pub timestamp: i64,
}

impl SnapshotTimestamps {
    /// Capture time reported for `device_id`, if present.
    pub fn for_device(&self, device_id: u64) -> Option<i64> {
        self.timestamps
            .iter()
            .filter(|t| t.doorbot_id == device_id)
            .map(|t| t.timestamp)
            .max()
    }
}
