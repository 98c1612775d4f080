//! REST API and SSE routes

use crate::state::AppState;
use crate::web_ui;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::stream::{Stream, StreamExt as FuturesStreamExt};
use ovt_core::reading::FieldMask;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::atomic::Ordering;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(web_ui::serve_ui))
        .route("/data", get(latest_reading))
        .route("/api/sources", get(list_sources))
        .route("/api/status", get(status))
        .route("/api/telemetry/stream", get(telemetry_stream))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Latest Reading Endpoint ===

/// The dashboard's poll target: the most recent published reading.
/// Pollers treat any non-OK response as "disconnected / no data".
async fn latest_reading(State(state): State<AppState>) -> impl IntoResponse {
    let latest = state.latest.read().await;
    match &*latest {
        Some(reading) => Json(reading.clone()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no telemetry yet").into_response(),
    }
}

// === Source Endpoints ===

#[derive(Serialize)]
struct SourceInfo {
    key: String,
    name: String,
    detected: bool,
    active: bool,
}

async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceInfo>> {
    let sources = state.sources.read().await;
    let active_name = state.active_source.read().await;

    let info: Vec<SourceInfo> = sources
        .iter()
        .map(|source| SourceInfo {
            key: source.key().to_string(),
            name: source.name().to_string(),
            detected: source.detect(),
            active: source.is_active()
                || active_name
                    .as_ref()
                    .map(|n| n == source.name())
                    .unwrap_or(false),
        })
        .collect();

    Json(info)
}

// === Status Endpoint ===

#[derive(Serialize)]
struct StatusInfo {
    started_at: DateTime<Utc>,
    uptime_s: f64,
    samples: u64,
    /// Average published readings per second since startup
    rate: f64,
    active_source: Option<String>,
}

async fn status(State(state): State<AppState>) -> Json<StatusInfo> {
    let active_source = state.active_source.read().await.clone();
    let samples = state.samples.load(Ordering::Relaxed);
    let uptime_s = (Utc::now() - state.started_at).num_milliseconds() as f64 / 1000.0;
    let rate = if uptime_s > 0.0 {
        samples as f64 / uptime_s
    } else {
        0.0
    };

    Json(StatusInfo {
        started_at: state.started_at,
        uptime_s,
        samples,
        rate,
        active_source,
    })
}

// === Telemetry Stream Endpoint ===

#[derive(Deserialize)]
struct StreamQuery {
    fields: Option<String>,
}

async fn telemetry_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let field_mask = query.fields.map(|f| FieldMask::parse(&f));

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let mask = field_mask.clone();
        async move {
            match result {
                Ok(reading) => {
                    // Serialize with field mask
                    match reading.to_json_filtered(mask.as_ref()) {
                        Ok(json) => Some(Ok(Event::default().data(json))),
                        Err(e) => {
                            tracing::error!("Failed to serialize reading: {}", e);
                            None
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Broadcast stream error: {}", e);
                    None
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
