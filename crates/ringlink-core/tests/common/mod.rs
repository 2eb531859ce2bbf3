// Shared fixtures for the ringlink-core integration suites.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ringlink_api::{Endpoints, HttpGateway, TransportConfig};
use ringlink_core::settings::keys;
use ringlink_core::{EngineConfig, MemorySettings, PollIntervals, SessionManager};

pub fn endpoints(server: &MockServer) -> Endpoints {
    Endpoints::single(Url::parse(&server.uri()).unwrap())
}

pub fn gateway(server: &MockServer) -> HttpGateway {
    HttpGateway::new(
        endpoints(server),
        "hw-test",
        &TransportConfig::default().with_timeout(Duration::from_secs(2)),
    )
    .unwrap()
}

/// Settings holding a live session: `bearer-old` / `session-old` / `refresh-old`.
pub fn authenticated_settings() -> Arc<MemorySettings> {
    Arc::new(MemorySettings::with_values([
        (keys::BEARER_TOKEN, "bearer-old"),
        (keys::SESSION_TOKEN, "session-old"),
        (keys::REFRESH_TOKEN, "refresh-old"),
    ]))
}

pub fn session(server: &MockServer, settings: &Arc<MemorySettings>) -> Arc<SessionManager> {
    Arc::new(SessionManager::new(gateway(server), settings.clone()))
}

/// Engine config pointed at the mock server with fast snapshot retries.
pub fn engine_config(server: &MockServer) -> EngineConfig {
    EngineConfig {
        endpoints: endpoints(server),
        intervals: PollIntervals {
            dings: Duration::from_millis(50),
            devices: Duration::from_secs(600),
            location_modes: Duration::from_secs(600),
            verify: Duration::from_secs(600),
        },
        snapshot_interval: Duration::from_millis(10),
        ..EngineConfig::default()
    }
}

// ── Mocks ───────────────────────────────────────────────────────────

/// Refresh grant `refresh-old` → `bearer-new` / `refresh-new`.
pub async fn mount_refresh(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_partial_json(json!({ "grant_type": "refresh_token" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "bearer-new",
            "refresh_token": "refresh-new",
            "expires_in": 3600,
        })))
        .expect(expected)
        .mount(server)
        .await;
}

/// Session exchange → `session-new`.
pub async fn mount_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/clients_api/session"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "profile": { "authentication_token": "session-new" }
        })))
        .mount(server)
        .await;
}

pub fn devices_body() -> serde_json::Value {
    json!({
        "doorbots": [
            { "id": 1, "description": "Front Door", "kind": "doorbell_v3", "battery_life": "87", "location_id": "loc-1" }
        ],
        "authorized_doorbots": [],
        "stickup_cams": [
            { "id": 2, "description": "Garage", "kind": "stickup_cam_v4", "battery_life": 104, "led_status": "off",
              "siren_status": { "seconds_remaining": 0 }, "location_id": "loc-1" }
        ],
        "chimes": [
            { "id": 3, "description": "Hall Chime", "kind": "chime_pro", "location_id": "loc-1" }
        ]
    })
}
