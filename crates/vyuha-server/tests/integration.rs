use std::sync::Arc;

use axum::http::StatusCode;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use vyuha_core::agent::{Agent, ProposerMode};
use vyuha_core::commander::RuleProposer;
use vyuha_core::config::Config;
use vyuha_core::gate::{PolicyOracle, PolicyVerdict};
use vyuha_core::VyuhaError;
use vyuha_server::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct UnreachableOracle;

impl PolicyOracle for UnreachableOracle {
    fn check(
        &self,
        _content: &str,
        _session_id: &str,
        _metadata: &serde_json::Value,
    ) -> vyuha_core::Result<PolicyVerdict> {
        Err(VyuhaError::PolicyOracle("connection refused".to_string()))
    }
}

fn app_with(dir: &TempDir, oracle: Option<Arc<dyn PolicyOracle>>) -> axum::Router {
    let agent = Agent::with_oracles(
        dir.path(),
        Config::default(),
        Arc::new(RuleProposer),
        ProposerMode::Rules,
        oracle,
    )
    .unwrap();
    vyuha_server::build_router(AppState::new(agent))
}

fn app(dir: &TempDir) -> axum::Router {
    app_with(dir, None)
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send a POST request with a JSON body via `oneshot` and return (status, parsed JSON body).
async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn critical_risk() -> serde_json::Value {
    serde_json::json!({
        "status": "CRITICAL",
        "collision_probability": 0.95,
        "distance_km": 0.4,
        "source_label": "celestrak",
        "scenario_mode": "LIVE",
        "altitude_km": 408.0
    })
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_readiness() {
    let dir = TempDir::new().unwrap();
    for uri in ["/health", "/api/health"] {
        let (status, body) = get(app(&dir), uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["live"], true);
        assert_eq!(body["proposer"]["mode"], "rules");
        assert_eq!(body["proposer"]["configured"], false);
        assert_eq!(body["policy_oracle"]["configured"], false);
    }
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scan_with_simulated_danger_is_synthetic_critical() {
    let dir = TempDir::new().unwrap();
    let (status, body) = post_json(
        app(&dir),
        "/api/scan",
        serde_json::json!({ "simulate_danger": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["satellite_id"], "ISS");
    assert_eq!(body["risk"]["status"], "CRITICAL");
    assert_eq!(body["risk"]["scenario_mode"], "SYNTHETIC");
    assert_eq!(body["risk"]["collision_probability"], 0.95);
}

#[tokio::test]
async fn scan_without_risk_is_400() {
    let dir = TempDir::new().unwrap();
    let (status, body) = post_json(app(&dir), "/api/scan", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("risk"));
}

// ---------------------------------------------------------------------------
// Act
// ---------------------------------------------------------------------------

#[tokio::test]
async fn act_executes_and_moves_off_baseline() {
    let dir = TempDir::new().unwrap();
    let router = app(&dir);

    let (status, body) = post_json(
        router.clone(),
        "/api/act",
        serde_json::json!({ "risk": critical_risk(), "session_id": "sess-1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["final_status"], "EXECUTED");
    assert_eq!(body["session_id"], "sess-1");
    assert_eq!(body["attempts"].as_array().unwrap().len(), 1);
    assert_eq!(body["attempts"][0]["validation"]["source"], "FALLBACK");
    assert_eq!(body["attempts"][0]["validation"]["fallback_reason"], "UNCONFIGURED");
    assert_eq!(body["maneuver"]["action"], "FIRE_THRUSTERS");

    let (_, state) = get(router, "/api/state").await;
    assert_eq!(state["on_baseline"], false);
    assert_eq!(state["maneuver_count"], 1);
}

#[tokio::test]
async fn act_with_injected_threat_recovers_on_second_attempt() {
    let dir = TempDir::new().unwrap();
    let (status, body) = post_json(
        app(&dir),
        "/api/act",
        serde_json::json!({ "risk": critical_risk(), "inject_threat": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["final_status"], "EXECUTED");
    let attempts = body["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["injected"], true);
    assert_eq!(attempts[0]["validation"]["approved"], false);
    assert_eq!(attempts[0]["validation"]["source"], "DENY_LIST");
    assert_eq!(attempts[1]["validation"]["approved"], true);
}

#[tokio::test]
async fn act_with_invalid_risk_is_400_and_leaves_no_trace() {
    let dir = TempDir::new().unwrap();
    let router = app(&dir);
    let mut risk = critical_risk();
    risk["collision_probability"] = serde_json::json!(1.7);

    let (status, body) =
        post_json(router.clone(), "/api/act", serde_json::json!({ "risk": risk })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("collision_probability"));

    let (_, insights) = get(router, "/api/insights").await;
    assert_eq!(insights["total_events"], 0);
}

#[tokio::test]
async fn act_with_malformed_body_is_client_error() {
    let dir = TempDir::new().unwrap();
    let (status, _) = post_json(
        app(&dir),
        "/api/act",
        serde_json::json!({ "risk": { "status": "ON_FIRE" } }),
    )
    .await;
    assert!(status.is_client_error());
}

// ---------------------------------------------------------------------------
// Restore / history
// ---------------------------------------------------------------------------

#[tokio::test]
async fn restore_is_idempotent_and_history_survives() {
    let dir = TempDir::new().unwrap();
    let router = app(&dir);

    let (status, body) = post_json(router.clone(), "/api/restore", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ALREADY_ON_BASELINE");

    post_json(
        router.clone(),
        "/api/act",
        serde_json::json!({ "risk": critical_risk() }),
    )
    .await;

    let (_, first) = post_json(router.clone(), "/api/restore", serde_json::json!({})).await;
    assert_eq!(first["status"], "RESTORED");
    let (_, second) = post_json(router.clone(), "/api/restore", serde_json::json!({})).await;
    assert_eq!(second["status"], "ALREADY_ON_BASELINE");
    assert_eq!(first["state"]["position"], second["state"]["position"]);

    let (status, history) = get(router, "/api/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total_maneuvers"], 1);
    assert_eq!(history["baseline_trajectory"]["position"]["alt_km"], 400.0);
}

// ---------------------------------------------------------------------------
// Insights
// ---------------------------------------------------------------------------

#[tokio::test]
async fn insights_start_empty() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(app(&dir), "/api/insights").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success_rate"], 0.0);
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 1);
    assert!(body["recommendations"][0]
        .as_str()
        .unwrap()
        .starts_with("No runtime data yet"));
}

#[tokio::test]
async fn oracle_outage_counts_as_fallback() {
    let dir = TempDir::new().unwrap();
    let oracle: Arc<dyn PolicyOracle> = Arc::new(UnreachableOracle);
    let router = app_with(&dir, Some(oracle));

    let (status, body) = get(router.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["policy_oracle"]["configured"], true);

    let (_, cycle) = post_json(
        router.clone(),
        "/api/act",
        serde_json::json!({ "risk": critical_risk() }),
    )
    .await;
    assert_eq!(cycle["attempts"][0]["validation"]["source"], "FALLBACK");
    assert_eq!(cycle["attempts"][0]["validation"]["fallback_reason"], "ORACLE_ERROR");

    let (_, insights) = get(router, "/api/insights").await;
    assert_eq!(insights["counts_by_validation_source"]["FALLBACK"], 1);
    assert_eq!(insights["policy_oracle_errors"], 1);
    assert_eq!(insights["success_rate"], 1.0);
}

// ---------------------------------------------------------------------------
// Persistence failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn corrupt_event_log_line_does_not_break_insights() {
    let dir = TempDir::new().unwrap();
    let router = app(&dir);
    post_json(
        router.clone(),
        "/api/scan",
        serde_json::json!({ "simulate_danger": true }),
    )
    .await;
    vyuha_core::io::append_line(
        &vyuha_core::paths::events_path(dir.path()),
        "{\"kind\":\"SCAN\",",
    )
    .unwrap();

    let (status, body) = get(router, "/api/insights").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scan_events"], 1);
}

#[tokio::test]
async fn unwritable_event_log_is_internal_failure() {
    let dir = TempDir::new().unwrap();
    let router = app(&dir);
    // A directory where the log file should be makes every append fail.
    std::fs::create_dir_all(vyuha_core::paths::events_path(dir.path())).unwrap();

    let (status, body) = post_json(
        router,
        "/api/scan",
        serde_json::json!({ "simulate_danger": true }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "INTERNAL_FAILURE");
}
