use axum::{extract::State, Json};
use vyuha_core::agent::ProposerMode;

use crate::state::AppState;

/// GET /health: liveness plus which oracle integrations are configured.
pub async fn health(State(app): State<AppState>) -> Json<serde_json::Value> {
    let readiness = app.agent.readiness();
    Json(serde_json::json!({
        "status": "ok",
        "service": "vyuha-ai",
        "live": true,
        "proposer": {
            "configured": readiness.proposer == ProposerMode::Http,
            "mode": readiness.proposer,
        },
        "policy_oracle": { "configured": readiness.policy_oracle },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
