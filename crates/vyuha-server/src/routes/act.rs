use axum::{extract::State, Json};
use vyuha_core::orchestrator::CycleOptions;
use vyuha_core::types::{ActionCycle, RiskAssessment};

use crate::error::AppError;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct ActBody {
    pub risk: RiskAssessment,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub inject_threat: bool,
}

/// POST /api/act: run one decide-validate-retry cycle.
///
/// A cycle that ends in MANUAL_OVERRIDE_REQUIRED is still a 200; only input
/// and persistence problems produce an error status.
pub async fn act(
    State(app): State<AppState>,
    Json(body): Json<ActBody>,
) -> Result<Json<ActionCycle>, AppError> {
    let agent = app.agent.clone();
    let options = CycleOptions {
        session_id: body.session_id,
        inject_threat: body.inject_threat,
    };
    let cycle = tokio::task::spawn_blocking(move || agent.act(body.risk, options))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(cycle))
}
