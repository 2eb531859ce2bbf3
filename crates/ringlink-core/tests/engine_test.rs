#![allow(clippy::unwrap_used)]
// End-to-end engine lifecycle and device actions.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use std::sync::Arc;

use ringlink_core::settings::keys;
use ringlink_core::{AuthState, CoreError, MemorySettings, RingEngine, SettingsStore, StatusEvent};

use common::{authenticated_settings, devices_body, engine_config, mount_refresh};

async fn setup() -> (MockServer, RingEngine) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients_api/ring_devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(devices_body()))
        .mount(&server)
        .await;
    let engine = RingEngine::new(engine_config(&server), authenticated_settings()).unwrap();
    (server, engine)
}

async fn mount_empty_locations(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rhq/v1/devices/v1/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user_locations": [] })))
        .mount(server)
        .await;
}

// ── Lifecycle tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_ringing_ding_raises_alarm_on_device() {
    let (server, engine) = setup().await;
    mount_empty_locations(&server).await;
    Mock::given(method("GET"))
        .and(path("/clients_api/dings/active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 9, "doorbot_id": 1, "kind": "ding", "state": "ringing" }
        ])))
        .mount(&server)
        .await;

    let mut status = engine.subscribe_status();
    engine.start().await;
    assert_eq!(status.recv().await.unwrap(), StatusEvent::ApiInit);

    let raised = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if engine
                .registry()
                .get(1)
                .is_some_and(|d| d.state.alarm_generic)
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(raised.is_ok(), "doorbell alarm never raised");
    assert!(engine.debouncer().is_active(1, ringlink_core::AlarmKind::Ding));

    engine.shutdown().await;
    assert_eq!(engine.debouncer().active_count(), 0);
}

#[tokio::test]
async fn test_restored_session_is_authenticated() {
    let (_server, engine) = setup().await;
    assert_eq!(engine.auth_state(), AuthState::Authenticated);
    assert!(!engine.session().hardware_id().is_empty());
}

#[tokio::test]
async fn test_verify_timer_restores_session_from_refresh_token() {
    let server = MockServer::start().await;
    mount_refresh(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/clients_api/session"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "profile": { "authentication_token": "session-new" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let settings = Arc::new(MemorySettings::with_values([(keys::REFRESH_TOKEN, "refresh-old")]));
    let mut config = engine_config(&server);
    config.intervals.verify = Duration::from_millis(100);
    let engine = RingEngine::new(config, settings.clone()).unwrap();
    assert_eq!(engine.auth_state(), AuthState::Expired);

    let mut state = engine.subscribe_auth_state();
    engine.start().await;
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == AuthState::Authenticated),
    )
    .await
    .expect("verify timer never refreshed the session")
    .unwrap();

    // Further ticks are no-ops while authenticated.
    tokio::time::sleep(Duration::from_millis(350)).await;
    engine.shutdown().await;

    assert_eq!(engine.auth_state(), AuthState::Authenticated);
    assert_eq!(settings.get(keys::SESSION_TOKEN).as_deref(), Some("session-new"));
    assert_eq!(settings.get(keys::REFRESH_TOKEN).as_deref(), Some("refresh-new"));
}

// ── Device action tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_actions_check_capabilities() {
    let (server, engine) = setup().await;
    mount_empty_locations(&server).await;
    engine.sync().await.unwrap();

    let err = engine.set_floodlight(1, true).await.unwrap_err();
    assert!(matches!(err, CoreError::Unsupported { id: 1, .. }));

    let err = engine.ring_chime(42).await.unwrap_err();
    assert!(matches!(err, CoreError::DeviceNotFound { id: 42 }));
}

#[tokio::test]
async fn test_device_actions_hit_endpoints() {
    let (server, engine) = setup().await;
    mount_empty_locations(&server).await;
    Mock::given(method("POST"))
        .and(path("/clients_api/chimes/3/play_sound"))
        .and(body_partial_json(json!({ "kind": "ding" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/clients_api/doorbots/2/floodlight_light_on"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/clients_api/doorbots/2/siren_off"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/clients_api/doorbots/1/motions_unsubscribe"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/mode/location/loc-1"))
        .and(body_partial_json(json!({ "mode": "away" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "mode": "away" })))
        .expect(1)
        .mount(&server)
        .await;

    engine.sync().await.unwrap();
    engine.ring_chime(3).await.unwrap();
    engine.set_floodlight(2, true).await.unwrap();
    engine.set_siren(2, false).await.unwrap();
    engine.set_motion_alerts(1, false).await.unwrap();
    assert_eq!(engine.set_location_mode("loc-1", "away").await.unwrap(), "away");
}
