use crate::state::AppState;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use line_core::{Activation, BinView, EventEnvelope, Lamp, MetricsSnapshot, StationView, TrayView};
use serde::Deserialize;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173").unwrap()
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<axum::http::HeaderValue>()
        .with_context(|| format!("invalid CORS origin: {cors_origin}"))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Ok(Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/snapshot", get(snapshot_handler))
        .route("/api/v1/bins", get(bins_handler))
        .route("/api/v1/stations", get(stations_handler))
        .route("/api/v1/trays", get(trays_handler))
        .route("/api/v1/lamps", get(lamps_handler))
        .route("/api/v1/metrics", get(metrics_handler))
        .route("/api/v1/stream", get(stream_handler))
        .route("/api/v1/pause", post(pause_handler))
        .route("/api/v1/resume", post(resume_handler))
        .route("/api/v1/step/:cycle", post(step_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

pub async fn meta_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let sim = app_state.sim.lock();
    let meta = &sim.line.meta;
    Json(serde_json::json!({
        "tick": meta.tick,
        "restock_activations": meta.restock_activations,
        "production_activations": meta.production_activations,
        "sim_time_secs": meta.sim_time_secs,
        "seed": meta.seed,
        "content_version": sim.content_version,
        "speed": app_state.speed,
        "paused": app_state.paused.load(Ordering::Relaxed),
    }))
}

pub async fn snapshot_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let sim = app_state.sim.lock();
    let result = serde_json::to_string(&sim.line);
    drop(sim);
    match result {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        ),
        Err(err) => {
            tracing::error!("snapshot serialization failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"serialization failed"}"#.to_string(),
            )
        }
    }
}

pub async fn bins_handler(State(app_state): State<AppState>) -> Json<Vec<BinView>> {
    Json(line_core::list_bins(&app_state.sim.lock().line))
}

pub async fn stations_handler(State(app_state): State<AppState>) -> Json<Vec<StationView>> {
    Json(line_core::list_stations(&app_state.sim.lock().line))
}

pub async fn trays_handler(State(app_state): State<AppState>) -> Json<Vec<TrayView>> {
    Json(line_core::list_trays(&app_state.sim.lock().line))
}

#[derive(Debug, Default, Deserialize)]
pub struct LampQuery {
    /// Only lamps with this defect flag.
    pub defected: Option<bool>,
    /// Most recent N lamps after filtering.
    pub limit: Option<usize>,
}

pub async fn lamps_handler(
    State(app_state): State<AppState>,
    Query(query): Query<LampQuery>,
) -> Json<Vec<Lamp>> {
    let sim = app_state.sim.lock();
    let mut lamps: Vec<Lamp> = line_core::list_lamps(&sim.line)
        .iter()
        .filter(|l| query.defected.map_or(true, |d| l.defected == d))
        .cloned()
        .collect();
    drop(sim);
    if let Some(limit) = query.limit {
        let skip = lamps.len().saturating_sub(limit);
        lamps.drain(..skip);
    }
    Json(lamps)
}

pub async fn metrics_handler(
    State(app_state): State<AppState>,
) -> Json<VecDeque<MetricsSnapshot>> {
    let sim = app_state.sim.lock();
    Json(sim.metrics_history.clone())
}

pub async fn pause_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(true, Ordering::Relaxed);
    tracing::info!("line paused");
    Json(serde_json::json!({"paused": true}))
}

pub async fn resume_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(false, Ordering::Relaxed);
    tracing::info!("line resumed");
    Json(serde_json::json!({"paused": false}))
}

/// Fire one activation by hand. Only allowed while paused so the tick loop
/// stays the single driver otherwise. The virtual clock is left untouched.
pub async fn step_handler(
    State(app_state): State<AppState>,
    Path(cycle): Path<Activation>,
) -> (StatusCode, Json<serde_json::Value>) {
    if !app_state.paused.load(Ordering::Relaxed) {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": "pause the line before stepping manually"})),
        );
    }

    let mut sim = app_state.sim.lock();
    let events = sim.step(cycle);
    let tick = sim.line.meta.tick;
    drop(sim);

    tracing::info!(?cycle, tick, events = events.len(), "manual step");
    let body = serde_json::json!({"tick": tick, "events": &events});
    let _ = app_state.event_tx.send(events);
    (StatusCode::OK, Json(body))
}

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.event_tx.subscribe();
    let sim = app_state.sim.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_millis(500));
        heartbeat.tick().await; // discard the immediate first tick
        let mut flush = tokio::time::interval(Duration::from_millis(50));
        flush.tick().await; // discard the immediate first tick
        let mut pending: Vec<EventEnvelope> = Vec::new();
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(events) => pending.extend(events),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event stream subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = flush.tick() => {
                    if !pending.is_empty() {
                        match serde_json::to_string(&pending) {
                            Ok(data) => yield Ok(Event::default().data(data)),
                            Err(err) => tracing::error!("event serialization failed: {err}"),
                        }
                        pending.clear();
                    }
                }
                _ = heartbeat.tick() => {
                    let tick = sim.lock().line.meta.tick;
                    let hb = serde_json::json!({"heartbeat": true, "tick": tick});
                    yield Ok(Event::default().data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}
