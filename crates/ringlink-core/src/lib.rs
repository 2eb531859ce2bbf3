//! Session and synchronization engine between `ringlink-api` and device
//! consumers (CLI, home-automation bridges).
//!
//! - **[`RingEngine`]** - Facade constructed once at startup. Owns every
//!   component below and hands out `Arc`s; [`start()`](RingEngine::start)
//!   spawns the pollers, the session verifier, and the ding dispatcher.
//!
//! - **[`SessionManager`]** - Authentication state machine
//!   (`NoCredentials → Authenticating → AwaitingMfa → Authenticated ⇄ Expired`)
//!   holding the bearer/session/refresh tokens, persisting them through a
//!   [`SettingsStore`], and providing the re-auth retry combinator.
//!
//! - **[`PollingScheduler`]** - Independent device, ding, and location-mode
//!   pollers. A cycle never overlaps a previous cycle of the same poller.
//!
//! - **[`StateFanout`]** - Typed publish/subscribe channels for the
//!   `refresh_device` (dings), `refresh_devices` (device list), and
//!   `refresh_locationMode` (mode changes) deltas.
//!
//! - **[`AlarmDebouncer`]** - Turns momentary ringing events into alarms
//!   held for a fixed window, one live timer per `(device, kind)`.
//!
//! - **[`ImageRetriever`]** - Requests a fresh snapshot and always returns
//!   the bytes of the latest stored image.
//!
//! - **[`DeviceRegistry`]** - Reactive device records with a declarative
//!   kind → capability mapping refined by observed fields.

pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod fanout;
pub mod handler;
pub mod model;
pub mod poller;
pub mod registry;
pub mod session;
pub mod settings;
pub mod snapshot;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{EngineConfig, PollIntervals};
pub use debounce::{AlarmChange, AlarmDebouncer};
pub use engine::RingEngine;
pub use error::CoreError;
pub use fanout::{StateFanout, Subscription};
pub use model::{
    AlarmKind, Capability, DeviceKind, DeviceRecord, DeviceState, DingEvent, DingKind,
    LocationMode, ModeChange,
};
pub use poller::{PollOutcome, PollingScheduler};
pub use registry::{DeviceRegistry, SyncSummary};
pub use session::{AuthState, SessionManager, StatusEvent};
pub use settings::{MemorySettings, RawCredentials, SettingsStore};
pub use snapshot::{ImageRetriever, Snapshot};

// Wire types consumers see in `refresh_devices` payloads.
pub use ringlink_api::{Endpoints, RawDevice, RingDevices};
