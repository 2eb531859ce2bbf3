// ── Domain model ──
//
// Engine-side types built from the wire payloads in `ringlink-api`.

pub mod device;
pub mod ding;
pub mod location;

pub use device::{Capability, DeviceKind, DeviceRecord, DeviceState, battery_percent};
pub use ding::{AlarmKind, DingEvent, DingKind};
pub use location::{LocationMode, ModeChange};
