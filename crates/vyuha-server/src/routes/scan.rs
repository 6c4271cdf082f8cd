use axum::{extract::State, Json};
use vyuha_core::events::ScanRecord;
use vyuha_core::types::RiskAssessment;

use crate::error::AppError;
use crate::state::AppState;

/// Label on assessments synthesized by `simulate_danger`.
pub const SIMULATED_SOURCE_LABEL: &str = "SIMULATED_DANGER";

#[derive(serde::Deserialize)]
pub struct ScanBody {
    #[serde(default)]
    pub satellite_id: Option<String>,
    #[serde(default)]
    pub risk: Option<RiskAssessment>,
    #[serde(default)]
    pub simulate_danger: bool,
    #[serde(default)]
    pub latency_ms: Option<f64>,
}

/// POST /api/scan: record one assessment from the risk source.
pub async fn scan(
    State(app): State<AppState>,
    Json(body): Json<ScanBody>,
) -> Result<Json<ScanRecord>, AppError> {
    let risk = if body.simulate_danger {
        RiskAssessment::synthetic_threat(SIMULATED_SOURCE_LABEL)
    } else {
        body.risk
            .ok_or_else(|| AppError::bad_request("risk is required unless simulate_danger is set"))?
    };
    let satellite_id = body.satellite_id.unwrap_or_default();

    let agent = app.agent.clone();
    let record = tokio::task::spawn_blocking(move || {
        agent.record_scan(&satellite_id, risk, body.latency_ms)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(record))
}
