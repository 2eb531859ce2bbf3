#![allow(clippy::unwrap_used)]
// Snapshot freshness loop and final fetch.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ringlink_core::ImageRetriever;

use common::{authenticated_settings, mount_refresh, mount_session, session};

const IMAGE: &[u8] = b"\xFF\xD8\xFFjpeg-bytes";

async fn mount_timestamps(server: &MockServer, timestamp: i64, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/snapshots/timestamps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timestamps": [{ "doorbot_id": 1, "timestamp": timestamp }]
        })))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_image(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/snapshots/image/1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(IMAGE))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_stale_snapshot_still_returns_final_fetch() {
    let server = MockServer::start().await;
    mount_timestamps(&server, 1_000, 3).await;
    mount_image(&server).await;

    let images = ImageRetriever::new(
        session(&server, &authenticated_settings()),
        3,
        Duration::from_millis(10),
    );
    let snapshot = images.grab_image(1).await.unwrap();

    assert!(!snapshot.fresh);
    assert_eq!(snapshot.bytes.as_ref(), IMAGE);
    assert_eq!(snapshot.device_id, 1);
}

#[tokio::test]
async fn test_fresh_capture_stops_early() {
    let server = MockServer::start().await;
    // 2100-01-01, always after the request time.
    mount_timestamps(&server, 4_102_444_800_000, 1).await;
    mount_image(&server).await;

    let images = ImageRetriever::new(
        session(&server, &authenticated_settings()),
        3,
        Duration::from_millis(10),
    );
    let snapshot = images.grab_image(1).await.unwrap();

    assert!(snapshot.fresh);
    assert_eq!(snapshot.bytes.as_ref(), IMAGE);
}

#[tokio::test]
async fn test_image_fetch_refreshes_once_on_auth_error() {
    let server = MockServer::start().await;
    mount_timestamps(&server, 4_102_444_800_000, 1).await;
    Mock::given(method("GET"))
        .and(path("/snapshots/image/1"))
        .and(header("authorization", "Bearer bearer-old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/snapshots/image/1"))
        .and(header("authorization", "Bearer bearer-new"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(IMAGE))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, 1).await;
    mount_session(&server).await;

    let images = ImageRetriever::new(
        session(&server, &authenticated_settings()),
        3,
        Duration::from_millis(10),
    );
    let snapshot = images.grab_image(1).await.unwrap();
    assert_eq!(snapshot.bytes.as_ref(), IMAGE);
}

#[tokio::test]
async fn test_second_auth_failure_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/snapshots/timestamps"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(&server, 1).await;
    mount_session(&server).await;

    let images = ImageRetriever::new(
        session(&server, &authenticated_settings()),
        3,
        Duration::from_millis(10),
    );
    let err = images.grab_image(1).await.unwrap_err();
    assert!(err.is_auth_expired());
}
