//! REST API and SSE routes

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::stream::{Stream, StreamExt};
use pitwall_core::{ArbitrationPolicy, FieldMask, Metric, Origin, TelemetrySnapshot};
use pitwall_sim::{StrategyError, StrategyStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/sources", get(list_sources))
        .route("/api/telemetry", get(latest_telemetry))
        .route("/api/telemetry/stream", get(telemetry_stream))
        .route("/api/arbitration", get(arbitration))
        .route("/api/history", get(all_history))
        .route("/api/history/:metric", get(metric_history))
        .route("/api/live", post(ingest_live))
        .route("/api/strategy", get(strategy))
        .route("/api/strategy/power-map", post(select_power_map))
        .route("/api/strategy/attack-mode", post(attack_mode))
        .route("/api/strategy/pit-stop", post(pit_stop))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    ticks: u64,
    policy: ArbitrationPolicy,
    active_source: Option<String>,
    last_tick: Option<DateTime<Utc>>,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let (ticks, policy) = {
        let engine = state.engine.lock().await;
        (engine.ticks(), engine.policy())
    };
    let active_source = state.active_source.read().await.clone();
    let last_tick = state.latest.read().await.as_ref().map(|s| s.timestamp);

    Json(Health {
        status: "ok",
        ticks,
        policy,
        active_source,
        last_tick,
    })
}

// === Source Endpoints ===

#[derive(Serialize)]
struct SourceInfo {
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
            name: source.name().to_string(),
            detected: source.detect(),
            active: source.is_active() || active_name.as_deref() == Some(source.name()),
        })
        .collect();

    Json(info)
}

// === Telemetry Endpoints ===

#[derive(Deserialize)]
struct FieldsQuery {
    fields: Option<String>,
}

async fn latest_telemetry(
    State(state): State<AppState>,
    Query(query): Query<FieldsQuery>,
) -> Response {
    let latest = state.latest.read().await;
    let Some(snapshot) = latest.as_ref() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "No telemetry yet").into_response();
    };

    let mask = query.fields.map(|f| FieldMask::parse(&f));
    match snapshot.to_json_filtered(mask.as_ref()) {
        Ok(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn telemetry_stream(
    State(state): State<AppState>,
    Query(query): Query<FieldsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let field_mask = query.fields.map(|f| FieldMask::parse(&f));

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let mask = field_mask.clone();
        async move {
            match result {
                Ok(snapshot) => match snapshot.to_json_filtered(mask.as_ref()) {
                    Ok(json) => Some(Ok(Event::default().data(json))),
                    Err(e) => {
                        tracing::error!("Failed to serialize snapshot: {}", e);
                        None
                    }
                },
                // Slow subscriber; it resumes from the newest snapshot
                Err(e) => {
                    tracing::warn!("Broadcast stream error: {}", e);
                    None
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// === Arbitration Endpoint ===

#[derive(Serialize)]
struct ArbitrationReport {
    policy: ArbitrationPolicy,
    live: usize,
    synthetic: usize,
    fields: BTreeMap<String, Origin>,
}

async fn arbitration(State(state): State<AppState>) -> Json<ArbitrationReport> {
    let policy = state.engine.lock().await.policy();
    let sources = state.field_sources.read().await;

    Json(ArbitrationReport {
        policy,
        live: sources.live_count(),
        synthetic: sources.synthetic_count(),
        fields: sources
            .iter()
            .map(|(field, origin)| (field.to_string(), origin))
            .collect(),
    })
}

// === History Endpoints ===

async fn all_history(State(state): State<AppState>) -> Json<BTreeMap<String, Vec<f64>>> {
    let engine = state.engine.lock().await;
    let history = engine.history();

    Json(
        history
            .metrics()
            .into_iter()
            .map(|metric| {
                let series = history.series(&metric);
                (metric, series)
            })
            .collect(),
    )
}

#[derive(Serialize)]
struct MetricHistory {
    metric: Metric,
    capacity: usize,
    samples: Vec<f64>,
}

async fn metric_history(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let Ok(metric) = name.parse::<Metric>() else {
        return (StatusCode::NOT_FOUND, format!("Unknown metric: {}", name)).into_response();
    };

    let engine = state.engine.lock().await;
    let key = metric.to_string();
    let samples = engine.history().series(&key);
    if samples.is_empty() {
        return (StatusCode::NOT_FOUND, format!("No samples for {}", key)).into_response();
    }

    Json(MetricHistory {
        metric,
        capacity: engine.history().capacity_for(&key),
        samples,
    })
    .into_response()
}

// === Ingest Endpoint ===

async fn ingest_live(
    State(state): State<AppState>,
    Json(mut snapshot): Json<TelemetrySnapshot>,
) -> StatusCode {
    if snapshot.source.is_empty() {
        snapshot.source = "ingest".to_string();
    }
    debug!(source = %snapshot.source, "Live snapshot received");
    state.live.publish(snapshot);
    StatusCode::ACCEPTED
}

// === Strategy Endpoints ===

async fn strategy(State(state): State<AppState>) -> Json<StrategyStatus> {
    Json(state.engine.lock().await.simulator().strategy())
}

#[derive(Deserialize)]
struct PowerMapRequest {
    /// Preset id, or null for the unrestricted torque curve
    map: Option<u8>,
}

fn strategy_error(e: StrategyError) -> Response {
    let status = match e {
        StrategyError::UnknownPowerMap(_) => StatusCode::BAD_REQUEST,
        StrategyError::AttackModeActive | StrategyError::AttackModeExhausted(_) => StatusCode::CONFLICT,
    };
    (status, e.to_string()).into_response()
}

async fn select_power_map(
    State(state): State<AppState>,
    Json(request): Json<PowerMapRequest>,
) -> Response {
    let mut engine = state.engine.lock().await;
    let simulator = engine.simulator_mut();
    match simulator.set_power_map(request.map) {
        Ok(()) => Json(simulator.strategy()).into_response(),
        Err(e) => strategy_error(e),
    }
}

async fn attack_mode(State(state): State<AppState>) -> Response {
    let mut engine = state.engine.lock().await;
    let simulator = engine.simulator_mut();
    match simulator.activate_attack_mode() {
        Ok(()) => Json(simulator.strategy()).into_response(),
        Err(e) => strategy_error(e),
    }
}

async fn pit_stop(State(state): State<AppState>) -> Json<StrategyStatus> {
    let mut engine = state.engine.lock().await;
    let simulator = engine.simulator_mut();
    simulator.pit_stop();
    info!("Pit stop requested");
    Json(simulator.strategy())
}
