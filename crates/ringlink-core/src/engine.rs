// ── Engine facade ──
//
// Full lifecycle management for one Ring account: session restore, the
// background pollers and verifier, ding dispatch, device actions, and
// snapshot retrieval. Components are built once here and shared by `Arc`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ringlink_api::HttpGateway;
use secrecy::SecretString;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::debounce::AlarmDebouncer;
use crate::error::CoreError;
use crate::fanout::StateFanout;
use crate::handler;
use crate::model::{Capability, DeviceRecord, LocationMode};
use crate::poller::{PollOutcome, PollingScheduler};
use crate::registry::DeviceRegistry;
use crate::session::{AuthState, SessionManager, StatusEvent};
use crate::settings::{SettingsStore, resolve_hardware_id};
use crate::snapshot::{ImageRetriever, Snapshot};

/// The main entry point for consumers.
///
/// Cheaply cloneable. [`new()`](Self::new) restores the session from
/// settings without touching the network; [`start()`](Self::start) spawns
/// the background tasks.
#[derive(Clone)]
pub struct RingEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    session: Arc<SessionManager>,
    registry: Arc<DeviceRegistry>,
    fanout: Arc<StateFanout>,
    debouncer: AlarmDebouncer,
    scheduler: Arc<PollingScheduler>,
    images: ImageRetriever,
    cancel: CancellationToken,
    started: AtomicBool,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl RingEngine {
    pub fn new(config: EngineConfig, settings: Arc<dyn SettingsStore>) -> Result<Self, CoreError> {
        let hardware_id = resolve_hardware_id(settings.as_ref());
        let gateway = HttpGateway::new(config.endpoints.clone(), hardware_id, &config.transport)?;

        let session = Arc::new(SessionManager::new(gateway, settings));
        let registry = Arc::new(DeviceRegistry::new());
        let fanout = Arc::new(StateFanout::new());
        let debouncer = AlarmDebouncer::new(config.alarm_hold);
        let scheduler = Arc::new(PollingScheduler::new(
            Arc::clone(&session),
            Arc::clone(&registry),
            Arc::clone(&fanout),
            config.intervals,
        ));
        let images = ImageRetriever::new(
            Arc::clone(&session),
            config.snapshot_attempts,
            config.snapshot_interval,
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                session,
                registry,
                fanout,
                debouncer,
                scheduler,
                images,
                cancel: CancellationToken::new(),
                started: AtomicBool::new(false),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Announce `api_init` and spawn the pollers, the session verifier,
    /// and the ding dispatcher. Calling it again is a no-op.
    pub async fn start(&self) {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            debug!("engine already started");
            return;
        }
        self.inner.session.announce();

        let mut handles = self.inner.task_handles.lock().await;
        handles.push(tokio::spawn(handler::dispatch_task(
            Arc::clone(&self.inner.registry),
            self.inner.debouncer.clone(),
            self.inner.fanout.subscribe_dings(),
            self.inner.debouncer.subscribe(),
            self.inner.cancel.clone(),
        )));
        handles.extend(self.inner.scheduler.spawn(&self.inner.cancel));

        info!(
            state = %self.inner.session.state(),
            tasks = handles.len(),
            "engine started"
        );
    }

    /// Cancel every background task, wait for them, and drop held alarms.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        self.inner.debouncer.cancel_all();
        info!("engine stopped");
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.inner.session
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.inner.registry
    }

    pub fn fanout(&self) -> &Arc<StateFanout> {
        &self.inner.fanout
    }

    pub fn debouncer(&self) -> &AlarmDebouncer {
        &self.inner.debouncer
    }

    pub fn scheduler(&self) -> &Arc<PollingScheduler> {
        &self.inner.scheduler
    }

    pub fn auth_state(&self) -> AuthState {
        self.inner.session.state()
    }

    pub fn subscribe_auth_state(&self) -> watch::Receiver<AuthState> {
        self.inner.session.subscribe_state()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.inner.session.subscribe_status()
    }

    pub fn devices(&self) -> Arc<Vec<Arc<DeviceRecord>>> {
        self.inner.registry.snapshot()
    }

    pub fn location_modes(&self) -> Vec<LocationMode> {
        self.inner.scheduler.location_modes()
    }

    // ── Session passthrough ──────────────────────────────────────────

    pub async fn login(&self, username: &str, password: SecretString) -> Result<(), CoreError> {
        self.inner.session.login(username, password).await
    }

    pub async fn submit_mfa_code(&self, code: &str) -> Result<(), CoreError> {
        self.inner.session.submit_mfa_code(code).await
    }

    /// Forward a settings write. Only `rawCredentials` has an effect.
    pub async fn on_setting_changed(&self, key: &str) -> Result<(), CoreError> {
        self.inner.session.on_setting_changed(key).await
    }

    /// Bring an expired session back before a one-shot command.
    pub async fn ensure_session(&self) -> Result<(), CoreError> {
        self.inner.session.verify().await?;
        self.inner.session.tokens().await.map(|_| ())
    }

    /// Run the device and location-mode polls once, outside the schedule.
    pub async fn sync(&self) -> Result<(), CoreError> {
        if self.inner.scheduler.poll_devices().await? == PollOutcome::Skipped {
            debug!("device sync already running");
        }
        self.inner.scheduler.poll_location_modes().await?;
        Ok(())
    }

    // ── Device actions ───────────────────────────────────────────────

    /// Play the `ding` sound on a chime.
    pub async fn ring_chime(&self, id: u64) -> Result<(), CoreError> {
        self.require(id, Capability::Chime)?;
        self.inner
            .session
            .with_reauth(|gw, tokens| async move { gw.play_chime(&tokens, id, "ding").await })
            .await?;
        info!(id, "chime played");
        Ok(())
    }

    pub async fn set_floodlight(&self, id: u64, on: bool) -> Result<(), CoreError> {
        self.require(id, Capability::Floodlight)?;
        self.inner
            .session
            .with_reauth(|gw, tokens| async move { gw.set_floodlight(&tokens, id, on).await })
            .await?;
        info!(id, on, "floodlight switched");
        Ok(())
    }

    pub async fn set_siren(&self, id: u64, on: bool) -> Result<(), CoreError> {
        self.require(id, Capability::Siren)?;
        self.inner
            .session
            .with_reauth(|gw, tokens| async move { gw.set_siren(&tokens, id, on).await })
            .await?;
        info!(id, on, "siren switched");
        Ok(())
    }

    pub async fn set_motion_detection(&self, id: u64, enabled: bool) -> Result<(), CoreError> {
        self.require(id, Capability::MotionDetection)?;
        self.inner
            .session
            .with_reauth(|gw, tokens| async move {
                gw.set_motion_detection(&tokens, id, enabled).await
            })
            .await?;
        info!(id, enabled, "motion detection updated");
        Ok(())
    }

    /// Subscribe to (or drop) motion push events for a device.
    pub async fn set_motion_alerts(&self, id: u64, subscribed: bool) -> Result<(), CoreError> {
        self.require(id, Capability::MotionDetection)?;
        self.inner
            .session
            .with_reauth(|gw, tokens| async move {
                gw.set_motion_subscription(&tokens, id, subscribed).await
            })
            .await?;
        info!(id, subscribed, "motion alerts updated");
        Ok(())
    }

    /// Set a location's mode, returning the mode the cloud reports.
    pub async fn set_location_mode(&self, location_id: &str, mode: &str) -> Result<String, CoreError> {
        let applied = self
            .inner
            .session
            .with_reauth(|gw, tokens| async move {
                gw.set_location_mode(&tokens, location_id, mode).await
            })
            .await?;
        info!(location_id, mode = %applied, "location mode set");
        Ok(applied)
    }

    /// Capture and fetch a snapshot. See [`ImageRetriever::grab_image`].
    pub async fn grab_image(&self, id: u64) -> Result<Snapshot, CoreError> {
        self.require(id, Capability::Snapshot)?;
        self.inner.images.grab_image(id).await
    }

    fn require(&self, id: u64, capability: Capability) -> Result<Arc<DeviceRecord>, CoreError> {
        let device = self
            .inner
            .registry
            .get(id)
            .ok_or(CoreError::DeviceNotFound { id })?;
        if device.has(capability) {
            Ok(device)
        } else {
            Err(CoreError::Unsupported {
                operation: capability.to_string(),
                id,
            })
        }
    }
}
