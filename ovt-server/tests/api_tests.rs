//! Integration tests for the ovt-server HTTP API
//!
//! Uses tower::ServiceExt::oneshot to test routes directly without binding a port.

use axum::body::Body;
use http_body_util::BodyExt;
use hyper::Request;
use ovt_core::reading::TelemetryReading;
use ovt_server::{api::create_router, state::AppState};
use ovt_sources::sim::{CausalSimulator, SimulatorConfig, SimulatorSource};
use tower::ServiceExt;

/// Helper: build a router with fresh AppState (no sources registered)
fn app() -> axum::Router {
    let state = AppState::new();
    create_router(state)
}

/// Helper: build a router with AppState returned for further manipulation
fn app_with_state() -> (axum::Router, AppState) {
    let state = AppState::new();
    let router = create_router(state.clone());
    (router, state)
}

/// Helper: a deterministic reading a few ticks into a simulated run
fn make_reading() -> TelemetryReading {
    let mut sim = CausalSimulator::with_seed(SimulatorConfig::default(), 42);
    sim.tick(0);
    sim.tick(100);
    sim.tick(200)
}

/// Helper: collect response body into string
async fn body_string(body: Body) -> String {
    let collected = body.collect().await.unwrap();
    String::from_utf8(collected.to_bytes().to_vec()).unwrap()
}

// ==================== GET / ====================

#[tokio::test]
async fn test_get_root_returns_200_with_html() {
    let app = app();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(
        content_type.contains("text/html"),
        "Expected text/html content-type, got: {}",
        content_type
    );

    let body = body_string(response.into_body()).await;
    assert!(
        body.contains("<!DOCTYPE") || body.contains("<html"),
        "Response should contain HTML markup"
    );
}

// ==================== GET /data ====================

#[tokio::test]
async fn test_get_data_returns_503_before_first_reading() {
    let app = app();

    let response = app
        .oneshot(Request::builder().uri("/data").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(
        response.status(),
        503,
        "/data without telemetry should be 503 so pollers show disconnected"
    );
}

#[tokio::test]
async fn test_get_data_returns_latest_reading() {
    let (app, state) = app_with_state();

    state.publish(make_reading()).await;

    let response = app
        .oneshot(Request::builder().uri("/data").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let body = body_string(response.into_body()).await;
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();

    // Contract field names, camelCase on the wire
    assert!(parsed.get("rpm").is_some());
    assert!(parsed.get("engineLoad").is_some());
    assert!(parsed.get("batteryVoltage").is_some());
    assert!(parsed.get("manifoldPressure").is_some());
    assert_eq!(parsed["timestamp"], 200);
}

#[tokio::test]
async fn test_get_data_reflects_newest_publish() {
    let (app, state) = app_with_state();

    let mut first = make_reading();
    first.timestamp = 1;
    let mut second = make_reading();
    second.timestamp = 2;

    state.publish(first).await;
    state.publish(second).await;

    let response = app
        .oneshot(Request::builder().uri("/data").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = body_string(response.into_body()).await;
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["timestamp"], 2);
}

// ==================== GET /api/sources ====================

#[tokio::test]
async fn test_get_sources_returns_200_with_empty_array() {
    let app = app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sources")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let body = body_string(response.into_body()).await;
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(parsed.is_array(), "Response should be a JSON array");
    assert_eq!(parsed.as_array().unwrap().len(), 0, "Array should be empty");
}

#[tokio::test]
async fn test_get_sources_with_simulator_registered() {
    let (app, state) = app_with_state();

    state
        .register_source(Box::new(SimulatorSource::default()))
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sources")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let body = body_string(response.into_body()).await;
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    let sources = parsed.as_array().unwrap();

    assert_eq!(sources.len(), 1, "Should have one source");
    assert_eq!(sources[0]["key"], "simulator");
    assert_eq!(sources[0]["name"], "Causal Simulator");
    assert_eq!(
        sources[0]["detected"], true,
        "simulator is always detected"
    );
    assert_eq!(sources[0]["active"], false, "nothing started it");
}

// ==================== GET /api/status ====================

#[tokio::test]
async fn test_get_status_fresh_state() {
    let app = app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let body = body_string(response.into_body()).await;
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();

    assert_eq!(parsed["samples"], 0);
    assert!(parsed["uptime_s"].as_f64().unwrap() >= 0.0);
    assert!(parsed["active_source"].is_null());
    assert!(parsed.get("started_at").is_some());
}

#[tokio::test]
async fn test_get_status_counts_published_samples() {
    let (app, state) = app_with_state();

    state.publish(make_reading()).await;
    state.publish(make_reading()).await;
    state.publish(make_reading()).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_string(response.into_body()).await;
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["samples"], 3);
}

// ==================== GET /api/telemetry/stream ====================

#[tokio::test]
async fn test_telemetry_stream_returns_sse_content_type() {
    let (app, state) = app_with_state();

    // Send a reading after a short delay so the stream has data
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        state.publish(make_reading()).await;
    });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/telemetry/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(
        content_type.contains("text/event-stream"),
        "SSE endpoint should return text/event-stream, got: {}",
        content_type
    );
}

#[tokio::test]
async fn test_telemetry_stream_receives_published_reading() {
    let (app, state) = app_with_state();

    tokio::spawn(async move {
        // Give the stream time to connect and subscribe
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        state.publish(make_reading()).await;
    });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/telemetry/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    // Read the first chunk with a timeout to avoid hanging forever
    let body = response.into_body();
    let result = tokio::time::timeout(std::time::Duration::from_secs(3), async {
        let mut stream = body.into_data_stream();
        use futures::StreamExt;
        if let Some(Ok(chunk)) = stream.next().await {
            return Some(String::from_utf8(chunk.to_vec()).unwrap());
        }
        None
    })
    .await;

    match result {
        Ok(Some(text)) => {
            // SSE events are formatted as "data: {...}\n\n"
            assert!(
                text.contains("data:"),
                "SSE stream should contain 'data:' prefix, got: {}",
                text
            );
            assert!(
                text.contains("engineLoad"),
                "SSE data should contain reading fields"
            );
        }
        Ok(None) => {
            // Stream ended without data - can happen in CI; the content-type
            // test above already verifies SSE setup
        }
        Err(_) => {
            // Timeout - acceptable where timing is unpredictable
        }
    }
}

#[tokio::test]
async fn test_telemetry_stream_with_field_filter() {
    let (app, state) = app_with_state();

    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        state.publish(make_reading()).await;
    });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/telemetry/stream?fields=rpm,speed")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let body = response.into_body();
    let result = tokio::time::timeout(std::time::Duration::from_secs(3), async {
        let mut stream = body.into_data_stream();
        use futures::StreamExt;
        if let Some(Ok(chunk)) = stream.next().await {
            return Some(String::from_utf8(chunk.to_vec()).unwrap());
        }
        None
    })
    .await;

    if let Ok(Some(text)) = result {
        // SSE format: "data: {json}\n\n"
        if let Some(data_line) = text.lines().find(|l| l.starts_with("data:")) {
            let json_str = data_line.trim_start_matches("data:").trim();
            if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(json_str) {
                assert!(parsed.get("rpm").is_some(), "filtered stream keeps rpm");
                assert!(parsed.get("speed").is_some(), "filtered stream keeps speed");
                assert!(
                    parsed.get("timestamp").is_some(),
                    "timestamp is always included"
                );
                assert!(
                    parsed.get("coolant").is_none(),
                    "unrequested fields are dropped"
                );
                assert!(parsed.get("engineLoad").is_none());
            }
        }
    }
}

// ==================== AppState unit tests ====================

#[tokio::test]
async fn test_app_state_new_has_empty_sources() {
    let state = AppState::new();
    let sources = state.sources.read().await;
    assert_eq!(sources.len(), 0);
}

#[tokio::test]
async fn test_app_state_register_source() {
    let state = AppState::new();
    state
        .register_source(Box::new(SimulatorSource::default()))
        .await;

    let sources = state.sources.read().await;
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].key(), "simulator");
}

#[tokio::test]
async fn test_app_state_subscribe_receives_publish() {
    let state = AppState::new();
    let mut rx = state.subscribe();

    let reading = make_reading();
    state.publish(reading.clone()).await;

    let received = rx.recv().await.unwrap();
    assert_eq!(received, reading);
}

#[tokio::test]
async fn test_app_state_publish_updates_latest() {
    let state = AppState::new();
    assert!(state.latest.read().await.is_none());

    state.publish(make_reading()).await;
    assert!(state.latest.read().await.is_some());
}
