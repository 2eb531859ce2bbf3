// ── Session state machine ──
//
// Owns the bearer/session/refresh tokens and the authentication state.
// Every transition that talks to the token endpoint runs under
// `auth_gate`, so concurrent callers that hit an expired session share a
// single refresh. Token reads go through the `RwLock` and never wait on
// the gate.

use std::future::Future;
use std::sync::Arc;

use ringlink_api::{AuthGrant, HttpGateway, TokenPair};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, RwLock, broadcast, watch};
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::settings::{RawCredentials, SettingsStore, get_secret, keys};

const STATUS_CHANNEL_SIZE: usize = 32;

/// Authentication state.
///
/// `Authenticated` always implies a bearer + session pair is held. Data
/// calls are only made in that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum AuthState {
    NoCredentials,
    Authenticating,
    AwaitingMfa,
    Authenticated,
    Expired,
}

/// Status notifications for the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Emitted once when the engine starts.
    ApiInit,
    Authenticated,
    MfaRequired { delivery: Option<String> },
    Error(String),
}

impl StatusEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ApiInit => "api_init",
            Self::Authenticated => "authenticated",
            Self::MfaRequired { .. } => "mfa_required",
            Self::Error(_) => "error",
        }
    }
}

impl std::fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error(message) => write!(f, "error: {message}"),
            Self::MfaRequired {
                delivery: Some(delivery),
            } => write!(f, "mfa_required ({delivery})"),
            other => f.write_str(other.name()),
        }
    }
}

struct PendingLogin {
    username: String,
    password: SecretString,
}

struct SessionInner {
    state: AuthState,
    tokens: Option<TokenPair>,
    refresh: Option<SecretString>,
    /// Credentials held between the password grant and the MFA code.
    pending: Option<PendingLogin>,
}

impl SessionInner {
    /// The state implied by the material currently held.
    fn settled_state(&self) -> AuthState {
        match (&self.tokens, &self.refresh) {
            (Some(_), Some(_)) => AuthState::Authenticated,
            (_, Some(_)) => AuthState::Expired,
            _ => AuthState::NoCredentials,
        }
    }
}

/// Authentication state machine and token custodian.
///
/// Data calls go through [`authed`](Self::authed) or
/// [`with_reauth`](Self::with_reauth); both surface an authorization
/// rejection by moving the session to [`AuthState::Expired`].
pub struct SessionManager {
    gateway: HttpGateway,
    settings: Arc<dyn SettingsStore>,
    inner: RwLock<SessionInner>,
    auth_gate: Mutex<()>,
    state_tx: watch::Sender<AuthState>,
    status_tx: broadcast::Sender<StatusEvent>,
}

impl SessionManager {
    /// Restore a session from persisted settings.
    ///
    /// All three tokens present resumes `Authenticated`; a refresh token
    /// alone resumes `Expired` (the verify timer refreshes it); anything
    /// else starts at `NoCredentials`.
    pub fn new(gateway: HttpGateway, settings: Arc<dyn SettingsStore>) -> Self {
        let refresh = get_secret(settings.as_ref(), keys::REFRESH_TOKEN);
        let tokens = match (
            get_secret(settings.as_ref(), keys::BEARER_TOKEN),
            get_secret(settings.as_ref(), keys::SESSION_TOKEN),
        ) {
            (Some(bearer), Some(session)) if refresh.is_some() => {
                Some(TokenPair { bearer, session })
            }
            _ => None,
        };

        let mut inner = SessionInner {
            state: AuthState::NoCredentials,
            tokens,
            refresh,
            pending: None,
        };
        let state = inner.settled_state();
        inner.state = state;
        debug!(%state, "restored session from settings");

        let (state_tx, _) = watch::channel(state);
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_SIZE);

        Self {
            gateway,
            settings,
            inner: RwLock::new(inner),
            auth_gate: Mutex::new(()),
            state_tx,
            status_tx,
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Current authentication state.
    pub fn state(&self) -> AuthState {
        *self.state_tx.borrow()
    }

    /// Subscribe to state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to status notifications.
    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    /// Publish `api_init`. Called by the engine on start.
    pub fn announce(&self) {
        self.emit(StatusEvent::ApiInit);
    }

    pub fn gateway(&self) -> &HttpGateway {
        &self.gateway
    }

    pub fn hardware_id(&self) -> &str {
        self.gateway.hardware_id()
    }

    /// The current token pair, or the error a data call would get.
    pub async fn tokens(&self) -> Result<TokenPair, CoreError> {
        let inner = self.inner.read().await;
        match (inner.state, &inner.tokens) {
            (AuthState::Authenticated, Some(tokens)) => Ok(tokens.clone()),
            (AuthState::AwaitingMfa, _) => Err(CoreError::MfaRequired { delivery: None }),
            (AuthState::NoCredentials, _) => Err(CoreError::Credential {
                message: "not logged in".into(),
            }),
            _ => Err(CoreError::AuthExpired {
                message: "no valid session".into(),
            }),
        }
    }

    // ── Login ────────────────────────────────────────────────────────

    /// Password login.
    ///
    /// When the account has two-factor enabled this leaves the session in
    /// `AwaitingMfa`, keeps the credentials for
    /// [`submit_mfa_code`](Self::submit_mfa_code), and returns
    /// [`CoreError::MfaRequired`].
    pub async fn login(&self, username: &str, password: SecretString) -> Result<(), CoreError> {
        let _gate = self.auth_gate.lock().await;
        {
            let mut inner = self.inner.write().await;
            inner.pending = Some(PendingLogin {
                username: username.to_owned(),
                password: password.clone(),
            });
            self.set_state(&mut inner, AuthState::Authenticating);
        }

        info!(username, "logging in");
        match self.gateway.password_grant(username, &password, None).await {
            Ok(grant) => self.complete_grant(grant).await,
            Err(ringlink_api::Error::MfaRequired { delivery }) => {
                {
                    let mut inner = self.inner.write().await;
                    self.set_state(&mut inner, AuthState::AwaitingMfa);
                }
                info!(delivery = delivery.as_deref(), "two-factor code required");
                self.emit(StatusEvent::MfaRequired {
                    delivery: delivery.clone(),
                });
                Err(CoreError::MfaRequired { delivery })
            }
            Err(e) => {
                let err = CoreError::from(e);
                {
                    let mut inner = self.inner.write().await;
                    inner.pending = None;
                    let settled = inner.settled_state();
                    self.set_state(&mut inner, settled);
                }
                warn!(error = %err, "login failed");
                self.emit(StatusEvent::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Complete a login that stopped at `AwaitingMfa`.
    ///
    /// A rejected code leaves the session in `AwaitingMfa` so another code
    /// can be tried.
    pub async fn submit_mfa_code(&self, code: &str) -> Result<(), CoreError> {
        let _gate = self.auth_gate.lock().await;
        let (username, password) = {
            let mut inner = self.inner.write().await;
            let pending = match (&inner.state, &inner.pending) {
                (AuthState::AwaitingMfa, Some(p)) => (p.username.clone(), p.password.clone()),
                _ => {
                    return Err(CoreError::Credential {
                        message: "no login is waiting for a two-factor code".into(),
                    });
                }
            };
            self.set_state(&mut inner, AuthState::Authenticating);
            pending
        };

        debug!(username, "submitting two-factor code");
        match self
            .gateway
            .password_grant(&username, &password, Some(code))
            .await
        {
            Ok(grant) => self.complete_grant(grant).await,
            Err(e) => {
                let err = CoreError::from(e);
                {
                    let mut inner = self.inner.write().await;
                    self.set_state(&mut inner, AuthState::AwaitingMfa);
                }
                warn!(error = %err, "two-factor code rejected");
                self.emit(StatusEvent::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// React to a settings write. Storing `rawCredentials` starts a login
    /// with those credentials; every other key is ignored.
    ///
    /// The login gets one extra attempt, after a refresh, when it fails
    /// for a reason other than bad credentials or a pending MFA code.
    pub async fn on_setting_changed(&self, key: &str) -> Result<(), CoreError> {
        if key != keys::RAW_CREDENTIALS {
            return Ok(());
        }
        let Some(raw) = self.settings.get(key).filter(|v| !v.is_empty()) else {
            return Ok(());
        };
        if let Err(e) = self.settings.remove(key) {
            warn!(error = %e, "failed to clear consumed credentials");
        }

        let creds = RawCredentials::parse(&raw)?;
        let password = SecretString::from(creds.password);

        match self.login(&creds.username, password.clone()).await {
            Err(e) if e.is_transient() || e.is_auth_expired() => {
                info!(error = %e, "login failed, retrying once after refresh");
                if let Err(refresh_err) = self.refresh().await {
                    debug!(error = %refresh_err, "refresh before login retry failed");
                }
                self.login(&creds.username, password).await
            }
            other => other,
        }
    }

    // ── Refresh & expiry ─────────────────────────────────────────────

    /// Exchange the refresh token for a new bearer and session.
    ///
    /// Single-flight: callers that queue behind an in-progress refresh
    /// return immediately once it has succeeded.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let _gate = self.auth_gate.lock().await;
        let refresh = {
            let mut inner = self.inner.write().await;
            match inner.state {
                AuthState::Authenticated => return Ok(()),
                AuthState::AwaitingMfa => return Err(CoreError::MfaRequired { delivery: None }),
                _ => {}
            }
            let Some(refresh) = inner.refresh.clone() else {
                return Err(CoreError::Credential {
                    message: "no refresh token stored, log in first".into(),
                });
            };
            self.set_state(&mut inner, AuthState::Authenticating);
            refresh
        };

        debug!("refreshing session tokens");
        match self.gateway.refresh_grant(&refresh).await {
            Ok(grant) => self.complete_grant(grant).await,
            Err(e) => {
                let err = CoreError::from(e);
                {
                    let mut inner = self.inner.write().await;
                    self.set_state(&mut inner, AuthState::Expired);
                }
                warn!(error = %err, "token refresh failed");
                self.emit(StatusEvent::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Periodic check: refresh when the session is expired and a refresh
    /// token is held. No-op while authenticated or mid-login.
    pub async fn verify(&self) -> Result<(), CoreError> {
        let (state, has_refresh) = {
            let inner = self.inner.read().await;
            (inner.state, inner.refresh.is_some())
        };
        match state {
            AuthState::Expired | AuthState::NoCredentials if has_refresh => self.refresh().await,
            _ => Ok(()),
        }
    }

    /// Expire only if `used` is still the live pair. A rejection that
    /// raced a successful refresh must not discard the new tokens.
    async fn invalidate(&self, used: &TokenPair) {
        let mut inner = self.inner.write().await;
        let is_current = inner
            .tokens
            .as_ref()
            .is_some_and(|t| t.session.expose_secret() == used.session.expose_secret());
        if !is_current {
            return;
        }
        inner.tokens = None;
        self.set_state(&mut inner, AuthState::Expired);
        drop(inner);
        self.clear_persisted_session();
        info!("session tokens rejected, marked expired");
    }

    // ── Authenticated calls ──────────────────────────────────────────

    /// Run one data call with the current tokens.
    ///
    /// An authorization rejection expires the session before the error is
    /// returned.
    pub async fn authed<'a, T, F, Fut>(&'a self, op: F) -> Result<T, CoreError>
    where
        F: FnOnce(&'a HttpGateway, TokenPair) -> Fut,
        Fut: Future<Output = Result<T, ringlink_api::Error>>,
    {
        let tokens = self.tokens().await?;
        match op(&self.gateway, tokens.clone()).await {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.is_auth_expired() {
                    self.invalidate(&tokens).await;
                }
                Err(e.into())
            }
        }
    }

    /// Attempt, and on an authorization failure refresh once and retry
    /// once. A second rejection is returned as-is.
    pub async fn with_reauth<'a, T, F, Fut>(&'a self, op: F) -> Result<T, CoreError>
    where
        F: Fn(&'a HttpGateway, TokenPair) -> Fut,
        Fut: Future<Output = Result<T, ringlink_api::Error>>,
    {
        match self.authed(&op).await {
            Err(e) if e.is_auth_expired() => {
                debug!(error = %e, "authorization rejected, refreshing before retry");
                self.refresh().await?;
                self.authed(&op).await
            }
            other => other,
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Mint a session from a fresh grant. Caller holds `auth_gate`.
    ///
    /// The rotated refresh token is persisted before the session call so
    /// it survives a failure there.
    async fn complete_grant(&self, grant: AuthGrant) -> Result<(), CoreError> {
        self.persist(keys::REFRESH_TOKEN, Some(&grant.refresh));
        self.inner.write().await.refresh = Some(grant.refresh);

        match self.gateway.create_session(&grant.bearer).await {
            Ok(session) => {
                self.persist(keys::BEARER_TOKEN, Some(&grant.bearer));
                self.persist(keys::SESSION_TOKEN, Some(&session));
                {
                    let mut inner = self.inner.write().await;
                    inner.tokens = Some(TokenPair {
                        bearer: grant.bearer,
                        session,
                    });
                    inner.pending = None;
                    self.set_state(&mut inner, AuthState::Authenticated);
                }
                info!("session established");
                self.emit(StatusEvent::Authenticated);
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                {
                    let mut inner = self.inner.write().await;
                    inner.tokens = None;
                    inner.pending = None;
                    self.set_state(&mut inner, AuthState::Expired);
                }
                self.clear_persisted_session();
                warn!(error = %err, "session creation failed");
                self.emit(StatusEvent::Error(err.to_string()));
                Err(err)
            }
        }
    }

    fn set_state(&self, inner: &mut SessionInner, state: AuthState) {
        if inner.state != state {
            debug!(from = %inner.state, to = %state, "auth state transition");
        }
        inner.state = state;
        self.state_tx.send_replace(state);
    }

    fn emit(&self, event: StatusEvent) {
        // No subscribers is fine.
        let _ = self.status_tx.send(event);
    }

    fn clear_persisted_session(&self) {
        self.persist(keys::BEARER_TOKEN, None);
        self.persist(keys::SESSION_TOKEN, None);
    }

    fn persist(&self, key: &str, value: Option<&SecretString>) {
        let result = match value {
            Some(v) => self.settings.set(key, v.expose_secret()),
            None => self.settings.remove(key),
        };
        if let Err(e) = result {
            warn!(key, error = %e, "failed to persist session setting");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::settings::MemorySettings;
    use ringlink_api::{Endpoints, TransportConfig};

    fn manager(values: &[(&str, &str)]) -> SessionManager {
        let endpoints = Endpoints::single(url::Url::parse("http://127.0.0.1:9").unwrap());
        let gateway = HttpGateway::new(endpoints, "hw-test", &TransportConfig::default()).unwrap();
        let settings = MemorySettings::with_values(values.iter().copied());
        SessionManager::new(gateway, Arc::new(settings))
    }

    #[test]
    fn restores_authenticated_with_all_tokens() {
        let session = manager(&[
            (keys::SESSION_TOKEN, "s"),
            (keys::BEARER_TOKEN, "b"),
            (keys::REFRESH_TOKEN, "r"),
        ]);
        assert_eq!(session.state(), AuthState::Authenticated);
    }

    #[test]
    fn restores_expired_with_refresh_only() {
        let session = manager(&[(keys::REFRESH_TOKEN, "r")]);
        assert_eq!(session.state(), AuthState::Expired);
    }

    #[test]
    fn session_without_refresh_is_discarded() {
        let session = manager(&[(keys::SESSION_TOKEN, "s"), (keys::BEARER_TOKEN, "b")]);
        assert_eq!(session.state(), AuthState::NoCredentials);
    }

    #[tokio::test]
    async fn tokens_error_reflects_state() {
        let session = manager(&[]);
        assert!(matches!(
            session.tokens().await,
            Err(CoreError::Credential { .. })
        ));
    }

    #[tokio::test]
    async fn mfa_code_without_pending_login_is_rejected() {
        let session = manager(&[]);
        let err = session.submit_mfa_code("123456").await.unwrap_err();
        assert!(matches!(err, CoreError::Credential { .. }));
        assert_eq!(session.state(), AuthState::NoCredentials);
    }

    #[tokio::test]
    async fn verify_without_refresh_token_is_noop() {
        let session = manager(&[]);
        session.verify().await.unwrap();
        assert_eq!(session.state(), AuthState::NoCredentials);
    }

    #[test]
    fn status_event_names() {
        assert_eq!(StatusEvent::ApiInit.to_string(), "api_init");
        assert_eq!(
            StatusEvent::MfaRequired { delivery: None }.name(),
            "mfa_required"
        );
        assert_eq!(
            StatusEvent::Error("boom".into()).to_string(),
            "error: boom"
        );
        assert_eq!(AuthState::AwaitingMfa.to_string(), "awaiting_mfa");
    }
}
