// ── Device domain types ──

use std::collections::BTreeSet;

use ringlink_api::RawDevice;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Device family, taken from which `ring_devices` list the record came in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    Chime,
    Doorbell,
    #[serde(rename = "stickupcam")]
    #[strum(serialize = "stickupcam")]
    StickupCam,
}

impl DeviceKind {
    /// Capabilities every device of this kind has.
    pub fn base_capabilities(self) -> &'static [Capability] {
        match self {
            Self::Chime => &[Capability::Chime],
            Self::Doorbell => &[
                Capability::AlarmGeneric,
                Capability::AlarmMotion,
                Capability::Battery,
                Capability::Snapshot,
                Capability::MotionDetection,
            ],
            Self::StickupCam => &[
                Capability::AlarmMotion,
                Capability::Battery,
                Capability::Snapshot,
                Capability::MotionDetection,
            ],
        }
    }
}

/// A capability the device exposes to consumers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    AlarmGeneric,
    AlarmMotion,
    Battery,
    Floodlight,
    Siren,
    Chime,
    Snapshot,
    MotionDetection,
}

/// Derived, consumer-facing state of one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub alarm_generic: bool,
    pub alarm_motion: bool,
    /// Battery percentage, clamped to 100.
    pub battery: Option<u8>,
    pub floodlight: Option<bool>,
    pub siren: Option<bool>,
}

/// A device as known to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: u64,
    pub kind: DeviceKind,
    pub name: String,
    /// Payload from the most recent device poll.
    pub info: RawDevice,
    /// Every capability observed so far; never shrinks.
    pub capabilities: BTreeSet<Capability>,
    pub state: DeviceState,
}

impl DeviceRecord {
    /// Build a record from its first poll result.
    pub fn from_raw(kind: DeviceKind, raw: RawDevice) -> Self {
        let capabilities = kind
            .base_capabilities()
            .iter()
            .copied()
            .chain(observed_capabilities(&raw))
            .collect();
        let state = derive_state(&raw, &DeviceState::default());
        Self {
            id: raw.id,
            kind,
            name: display_name(&raw),
            info: raw,
            capabilities,
            state,
        }
    }

    /// The record after a later poll reported `raw`.
    ///
    /// Alarm flags are owned by the debouncer and carried over.
    pub fn updated(&self, raw: RawDevice) -> Self {
        let mut capabilities = self.capabilities.clone();
        capabilities.extend(observed_capabilities(&raw));
        Self {
            id: self.id,
            kind: self.kind,
            name: display_name(&raw),
            state: derive_state(&raw, &self.state),
            info: raw,
            capabilities,
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn location_id(&self) -> Option<&str> {
        self.info.location_id.as_deref()
    }
}

fn display_name(raw: &RawDevice) -> String {
    raw.description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("Ring device {}", raw.id))
}

fn observed_capabilities(raw: &RawDevice) -> impl Iterator<Item = Capability> {
    let floodlight = raw.led_status.is_some().then_some(Capability::Floodlight);
    let siren = raw.siren_status.is_some().then_some(Capability::Siren);
    floodlight.into_iter().chain(siren)
}

fn derive_state(raw: &RawDevice, previous: &DeviceState) -> DeviceState {
    DeviceState {
        alarm_generic: previous.alarm_generic,
        alarm_motion: previous.alarm_motion,
        battery: raw.battery_life.as_ref().and_then(battery_percent),
        floodlight: raw.led_status.as_ref().and_then(switch_state),
        siren: raw
            .siren_status
            .as_ref()
            .map(|s| s.seconds_remaining > 0),
    }
}

/// Parse `battery_life`, sent as `"87"` or `87` (sometimes above 100).
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
pub fn battery_percent(value: &Value) -> Option<u8> {
    let pct = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !pct.is_finite() || pct < 0.0 {
        return None;
    }
    // In 0.0..=100.0 after the clamp.
    Some(pct.min(100.0).round() as u8)
}

/// `"on"` / `"off"` (or a bool) into a switch state.
fn switch_state(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "on" => Some(true),
            "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawDevice {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn battery_accepts_string_and_number() {
        assert_eq!(battery_percent(&json!("87")), Some(87));
        assert_eq!(battery_percent(&json!(64)), Some(64));
        assert_eq!(battery_percent(&json!(42.6)), Some(43));
        assert_eq!(battery_percent(&json!("junk")), None);
        assert_eq!(battery_percent(&json!(null)), None);
    }

    #[test]
    fn battery_is_clamped_to_100() {
        assert_eq!(battery_percent(&json!(117)), Some(100));
        assert_eq!(battery_percent(&json!("250")), Some(100));
    }

    #[test]
    fn capabilities_are_refined_by_observed_fields() {
        let cam = DeviceRecord::from_raw(
            DeviceKind::StickupCam,
            raw(json!({ "id": 5, "led_status": "off", "siren_status": { "seconds_remaining": 0 } })),
        );
        assert!(cam.has(Capability::Floodlight));
        assert!(cam.has(Capability::Siren));
        assert!(!cam.has(Capability::AlarmGeneric));
        assert_eq!(cam.state.floodlight, Some(false));
        assert_eq!(cam.state.siren, Some(false));

        let doorbell = DeviceRecord::from_raw(DeviceKind::Doorbell, raw(json!({ "id": 6 })));
        assert!(doorbell.has(Capability::AlarmGeneric));
        assert!(!doorbell.has(Capability::Floodlight));
    }

    #[test]
    fn update_keeps_alarm_flags_and_capabilities() {
        let mut first = DeviceRecord::from_raw(
            DeviceKind::StickupCam,
            raw(json!({ "id": 5, "led_status": "on", "battery_life": 90 })),
        );
        first.state.alarm_motion = true;

        let next = first.updated(raw(json!({ "id": 5, "battery_life": "80", "siren_status": { "seconds_remaining": 30 } })));
        assert!(next.state.alarm_motion);
        assert_eq!(next.state.battery, Some(80));
        assert_eq!(next.state.siren, Some(true));
        assert!(next.has(Capability::Floodlight));
        assert!(next.has(Capability::Siren));
    }

    #[test]
    fn name_falls_back_to_id() {
        let record = DeviceRecord::from_raw(DeviceKind::Chime, raw(json!({ "id": 77 })));
        assert_eq!(record.name, "Ring device 77");
        assert_eq!(DeviceKind::StickupCam.to_string(), "stickupcam");
    }
}
