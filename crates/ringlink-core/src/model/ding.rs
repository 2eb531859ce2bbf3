// ── Ding events and alarm kinds ──

use ringlink_api::Ding;
use serde::{Deserialize, Serialize};

use super::device::Capability;

/// Event kind reported by `dings/active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DingKind {
    Ding,
    Motion,
    OnDemand,
    Other,
}

impl From<&str> for DingKind {
    fn from(kind: &str) -> Self {
        match kind {
            "ding" => Self::Ding,
            "motion" => Self::Motion,
            "on_demand" => Self::OnDemand,
            _ => Self::Other,
        }
    }
}

/// Alarm signals held by the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlarmKind {
    Ding,
    Motion,
}

impl AlarmKind {
    /// Capability a device needs for this alarm to apply.
    pub fn capability(self) -> Capability {
        match self {
            Self::Ding => Capability::AlarmGeneric,
            Self::Motion => Capability::AlarmMotion,
        }
    }
}

/// One active event from a ding poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DingEvent {
    pub id: Option<u64>,
    pub doorbot_id: u64,
    pub kind: DingKind,
    pub ringing: bool,
    /// Motion flag carried on `ding` events.
    pub motion: bool,
    pub description: Option<String>,
}

impl From<Ding> for DingEvent {
    fn from(d: Ding) -> Self {
        Self {
            id: d.id,
            doorbot_id: d.doorbot_id,
            kind: DingKind::from(d.kind.as_str()),
            ringing: d.state == "ringing",
            motion: d.motion,
            description: d.doorbot_description,
        }
    }
}

impl DingEvent {
    /// Alarms this event triggers. Nothing unless it is still ringing; the
    /// motion flag drives the motion alarm independently of the kind.
    pub fn alarms(&self) -> Vec<AlarmKind> {
        if !self.ringing {
            return Vec::new();
        }
        let mut alarms = Vec::with_capacity(2);
        if self.kind == DingKind::Ding {
            alarms.push(AlarmKind::Ding);
        }
        if self.kind == DingKind::Motion || self.motion {
            alarms.push(AlarmKind::Motion);
        }
        alarms
    }
}
