//! Integration tests for the pitwall-server HTTP API
//!
//! Uses tower::ServiceExt::oneshot to test routes directly without binding a port.
//! Ticks are driven by calling `manager::cycle` instead of running the timer loop.

use axum::body::Body;
use http_body_util::BodyExt;
use hyper::Request;
use pitwall_core::ArbitrationPolicy;
use pitwall_server::{
    api::create_router,
    config::ServerConfig,
    manager,
    state::AppState,
};
use tower::ServiceExt;

fn test_config() -> ServerConfig {
    ServerConfig {
        seed: Some(42),
        ..Default::default()
    }
}

/// Helper: build AppState with the ingest source registered
async fn app_with_state(config: ServerConfig) -> (axum::Router, AppState) {
    let state = AppState::new(config).unwrap();
    manager::register_default_sources(&state).await.unwrap();
    let router = create_router(state.clone());
    (router, state)
}

/// Helper: collect response body into string
async fn body_string(body: Body) -> String {
    let collected = body.collect().await.unwrap();
    String::from_utf8(collected.to_bytes().to_vec()).unwrap()
}

async fn get_json(app: &axum::Router, uri: &str) -> (u16, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status().as_u16();
    let body = body_string(response.into_body()).await;
    let json = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn post_live(app: &axum::Router, json: &str) -> u16 {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/live")
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    response.status().as_u16()
}

async fn post_json(app: &axum::Router, uri: &str, json: &str) -> (u16, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status().as_u16();
    let body = body_string(response.into_body()).await;
    let json = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

// ==================== GET /api/health ====================

#[tokio::test]
async fn test_health_before_first_tick() {
    let (app, _state) = app_with_state(test_config()).await;

    let (status, json) = get_json(&app, "/api/health").await;
    assert_eq!(status, 200);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["ticks"], 0);
    assert_eq!(json["policy"], "presence");
    assert!(json["active_source"].is_null());
    assert!(json["last_tick"].is_null());
}

#[tokio::test]
async fn test_health_counts_ticks() {
    let (app, state) = app_with_state(test_config()).await;
    for _ in 0..3 {
        manager::cycle(&state, false).await.unwrap();
    }

    let (_, json) = get_json(&app, "/api/health").await;
    assert_eq!(json["ticks"], 3);
    assert!(json["last_tick"].is_string());
}

// ==================== GET /api/sources ====================

#[tokio::test]
async fn test_sources_lists_ingest() {
    let (app, _state) = app_with_state(test_config()).await;

    let (status, json) = get_json(&app, "/api/sources").await;
    assert_eq!(status, 200);
    let sources = json.as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["name"], "Ingest");
    assert_eq!(sources[0]["detected"], false);
    assert_eq!(sources[0]["active"], false);
}

// ==================== GET /api/telemetry ====================

#[tokio::test]
async fn test_telemetry_unavailable_before_first_tick() {
    let (app, _state) = app_with_state(test_config()).await;

    let (status, _) = get_json(&app, "/api/telemetry").await;
    assert_eq!(status, 503);
}

#[tokio::test]
async fn test_telemetry_after_tick_is_synthetic() {
    let (app, state) = app_with_state(test_config()).await;
    manager::cycle(&state, true).await.unwrap();

    let (status, json) = get_json(&app, "/api/telemetry").await;
    assert_eq!(status, 200);
    assert_eq!(json["source"], "simulator");
    assert!(json["motor"]["rpm"].is_number());
    assert!(json["status"]["overall"].is_string());
}

#[tokio::test]
async fn test_telemetry_field_mask() {
    let (app, state) = app_with_state(test_config()).await;
    manager::cycle(&state, false).await.unwrap();

    let (_, json) = get_json(&app, "/api/telemetry?fields=motor,battery").await;
    assert!(json.get("motor").is_some());
    assert!(json.get("battery").is_some());
    assert!(json.get("tires").is_none());
    assert!(json.get("timestamp").is_some());
}

// ==================== POST /api/live ====================

#[tokio::test]
async fn test_live_snapshot_accepted_and_merged() {
    let (app, state) = app_with_state(test_config()).await;

    let status = post_live(&app, r#"{"motor": {"rpm": 1234.0}}"#).await;
    assert_eq!(status, 202);

    let snapshot = manager::cycle(&state, true).await.unwrap();
    assert_eq!(snapshot.source, "merged");
    assert_eq!(snapshot.motor.unwrap().rpm.unwrap().0, 1234.0);
    assert_eq!(state.active_source.read().await.as_deref(), Some("Ingest"));

    // Sections the live snapshot left out are still synthesized
    assert!(snapshot.battery.is_some());
    assert!(snapshot.tires.is_some());
}

#[tokio::test]
async fn test_live_zero_wins_under_presence() {
    let (app, state) = app_with_state(test_config()).await;

    post_live(&app, r#"{"chassis": {"throttle": 0.0}}"#).await;
    let snapshot = manager::cycle(&state, true).await.unwrap();
    assert_eq!(snapshot.chassis.unwrap().throttle.unwrap().0, 0.0);

    let (_, json) = get_json(&app, "/api/arbitration").await;
    assert_eq!(json["policy"], "presence");
    assert_eq!(json["fields"]["chassis.throttle"], "live");
    assert_eq!(json["fields"]["motor.rpm"], "synthetic");
    assert_eq!(json["live"], 1);
}

#[tokio::test]
async fn test_live_zero_replaced_under_truthy() {
    let config = ServerConfig {
        policy: ArbitrationPolicy::Truthy,
        ..test_config()
    };
    let (app, state) = app_with_state(config).await;

    post_live(&app, r#"{"chassis": {"throttle": 0.0}}"#).await;
    manager::cycle(&state, true).await.unwrap();

    let (_, json) = get_json(&app, "/api/arbitration").await;
    assert_eq!(json["policy"], "truthy");
    assert_eq!(json["fields"]["chassis.throttle"], "synthetic");
    assert_eq!(json["live"], 0);
}

#[tokio::test]
async fn test_live_rejects_malformed_json() {
    let (app, _state) = app_with_state(test_config()).await;

    let status = post_live(&app, "{not json").await;
    assert!((400..500).contains(&status));
}

#[tokio::test]
async fn test_stale_live_snapshot_is_ignored() {
    let config = ServerConfig {
        live_max_age_ms: 0,
        ..test_config()
    };
    let (app, state) = app_with_state(config).await;

    post_live(&app, r#"{"motor": {"rpm": 1234.0}}"#).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let snapshot = manager::cycle(&state, true).await.unwrap();
    assert_eq!(snapshot.source, "simulator");
    assert!(state.active_source.read().await.is_none());
}

#[tokio::test]
async fn test_live_partial_corners_and_eeg_accepted() {
    let (app, state) = app_with_state(test_config()).await;

    let status = post_live(
        &app,
        r#"{
            "tires": {"corners": {"front_left": {"temperature": 90}}},
            "biosignals": {"eeg": {"alpha": 10}},
            "motor": {"rpm": 2500}
        }"#,
    )
    .await;
    assert_eq!(status, 202);

    let snapshot = manager::cycle(&state, true).await.unwrap();
    let corners = snapshot.tires.unwrap().corners.unwrap();
    assert_eq!(corners.front_left.temperature.unwrap().0, 90.0);
    assert!(corners.rear_right.temperature.is_some());

    let eeg = snapshot.biosignals.unwrap().eeg.unwrap();
    assert_eq!(eeg.alpha, Some(10.0));
    assert!(eeg.delta.is_some());
    assert_eq!(snapshot.motor.unwrap().rpm.unwrap().0, 2500.0);
}

#[tokio::test]
async fn test_ingest_takes_over_from_datalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.csv");
    std::fs::write(&path, "Wheel_RPM_Left,Wheel_RPM_Right\n1000,1000\n1000,1000\n").unwrap();
    let config = ServerConfig {
        datalog: Some(path),
        ..test_config()
    };
    let (app, state) = app_with_state(config).await;

    let snapshot = manager::cycle(&state, true).await.unwrap();
    assert_eq!(state.active_source.read().await.as_deref(), Some("Datalog"));
    assert_eq!(snapshot.motor.unwrap().rpm.unwrap().0, 4000.0);

    post_live(&app, r#"{"motor": {"rpm": 1234}}"#).await;
    let snapshot = manager::cycle(&state, true).await.unwrap();
    assert_eq!(state.active_source.read().await.as_deref(), Some("Ingest"));
    assert_eq!(snapshot.motor.unwrap().rpm.unwrap().0, 1234.0);

    let (_, json) = get_json(&app, "/api/sources").await;
    let sources = json.as_array().unwrap();
    assert_eq!(sources[0]["active"], true);
    assert_eq!(sources[1]["name"], "Datalog");
    assert_eq!(sources[1]["active"], false);

    // Once the live feed goes quiet the datalog resumes
    state.live.clear();
    manager::cycle(&state, true).await.unwrap();
    assert_eq!(state.active_source.read().await.as_deref(), Some("Datalog"));
}

// ==================== GET /api/history ====================

#[tokio::test]
async fn test_history_empty_before_ticks() {
    let (app, _state) = app_with_state(test_config()).await;

    let (status, json) = get_json(&app, "/api/history").await;
    assert_eq!(status, 200);
    assert!(json.as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_history_series_grows_per_tick() {
    let (app, state) = app_with_state(test_config()).await;
    for _ in 0..5 {
        manager::cycle(&state, false).await.unwrap();
    }

    let (_, json) = get_json(&app, "/api/history").await;
    assert_eq!(json["motor.rpm"].as_array().unwrap().len(), 5);

    let (status, json) = get_json(&app, "/api/history/motor.rpm").await;
    assert_eq!(status, 200);
    assert_eq!(json["metric"], "motor.rpm");
    assert_eq!(json["capacity"], 60);
    assert_eq!(json["samples"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_history_respects_capacity_override() {
    let mut config = test_config();
    config
        .history_overrides
        .insert("motor.rpm".parse().unwrap(), 3);
    let (app, state) = app_with_state(config).await;
    for _ in 0..10 {
        manager::cycle(&state, false).await.unwrap();
    }

    let (_, json) = get_json(&app, "/api/history/motor.rpm").await;
    assert_eq!(json["capacity"], 3);
    assert_eq!(json["samples"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_history_unknown_metric_is_404() {
    let (app, state) = app_with_state(test_config()).await;
    manager::cycle(&state, false).await.unwrap();

    let (status, _) = get_json(&app, "/api/history/motor.warp").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_history_untracked_metric_is_404() {
    let config = ServerConfig {
        tracked_metrics: Some(vec!["motor.rpm".parse().unwrap()]),
        ..test_config()
    };
    let (app, state) = app_with_state(config).await;
    manager::cycle(&state, false).await.unwrap();

    let (status, _) = get_json(&app, "/api/history/motor.rpm").await;
    assert_eq!(status, 200);
    let (status, _) = get_json(&app, "/api/history/battery.soc").await;
    assert_eq!(status, 404);
}

// ==================== Broadcast ====================

#[tokio::test]
async fn test_cycle_broadcasts_snapshot() {
    let (_app, state) = app_with_state(test_config()).await;
    let mut rx = state.subscribe();

    let published = manager::cycle(&state, false).await.unwrap();
    let received = rx.recv().await.unwrap();
    assert_eq!(received, published);
}

// ==================== Recorder ====================

#[tokio::test]
async fn test_recorder_writes_each_tick() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.ndjson");
    let config = ServerConfig {
        record: Some(path.clone()),
        record_fields: Some("motor".to_string()),
        ..test_config()
    };
    let (_app, state) = app_with_state(config).await;

    for _ in 0..4 {
        manager::cycle(&state, false).await.unwrap();
    }
    state.recorder.lock().await.as_mut().unwrap().flush().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 4);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert!(first.get("motor").is_some());
    assert!(first.get("battery").is_none());
}

// ==================== Strategy ====================

#[tokio::test]
async fn test_strategy_defaults_to_unrestricted() {
    let (app, _state) = app_with_state(test_config()).await;

    let (status, json) = get_json(&app, "/api/strategy").await;
    assert_eq!(status, 200);
    assert!(json["power_map"].is_null());
    assert_eq!(json["attack_mode"]["active"], false);
    assert_eq!(json["attack_mode"]["activations_left"], 2);
    assert_eq!(json["pit_stops"], 0);
}

#[tokio::test]
async fn test_configured_power_map_applied() {
    let config = ServerConfig {
        power_map: Some(3),
        ..test_config()
    };
    let (app, _state) = app_with_state(config).await;

    let (_, json) = get_json(&app, "/api/strategy").await;
    assert_eq!(json["power_map"]["name"], "WET");
    assert_eq!(json["power_map"]["torque_pct"], 60.0);
}

#[tokio::test]
async fn test_select_power_map() {
    let (app, state) = app_with_state(test_config()).await;

    let (status, json) = post_json(&app, "/api/strategy/power-map", r#"{"map": 12}"#).await;
    assert_eq!(status, 200);
    assert_eq!(json["power_map"]["name"], "SAFETY");

    manager::cycle(&state, false).await.unwrap();
    let (_, telemetry) = get_json(&app, "/api/telemetry").await;
    let torque = telemetry["motor"]["torque"].as_f64().unwrap();
    assert!(torque <= 161.0, "SAFETY map torque {}", torque);

    let (status, _) = post_json(&app, "/api/strategy/power-map", r#"{"map": 13}"#).await;
    assert_eq!(status, 400);

    let (status, json) = post_json(&app, "/api/strategy/power-map", r#"{"map": null}"#).await;
    assert_eq!(status, 200);
    assert!(json["power_map"].is_null());
}

#[tokio::test]
async fn test_attack_mode_conflicts_while_active() {
    let (app, _state) = app_with_state(test_config()).await;

    let (status, json) = post_json(&app, "/api/strategy/attack-mode", "").await;
    assert_eq!(status, 200);
    assert_eq!(json["attack_mode"]["active"], true);
    assert_eq!(json["power_map"]["name"], "ATTACK");

    let (status, _) = post_json(&app, "/api/strategy/attack-mode", "").await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn test_pit_stop_counts_and_refills() {
    let (app, state) = app_with_state(test_config()).await;

    let (status, json) = post_json(&app, "/api/strategy/pit-stop", "").await;
    assert_eq!(status, 200);
    assert_eq!(json["pit_stops"], 1);

    manager::cycle(&state, false).await.unwrap();
    let (_, telemetry) = get_json(&app, "/api/telemetry").await;
    assert!(telemetry["battery"]["soc"].as_f64().unwrap() > 99.0);
    assert!(telemetry["tires"]["corners"]["rear_left"]["wear"].as_f64().unwrap() > 99.99);
}

// ==================== Tick loop ====================

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let config = ServerConfig {
        tick_interval_ms: 5,
        ..test_config()
    };
    let (_app, state) = app_with_state(config).await;

    let handle = tokio::spawn(manager::run(state.clone()));
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    state.shutdown.cancel();
    handle.await.unwrap();

    assert!(state.engine.lock().await.ticks() > 0);
}
