use axum::{extract::State, Json};

use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// GET /api/state
pub async fn get_state(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let agent = app.agent.clone();
    let result = tokio::task::spawn_blocking(move || {
        let state = agent.state()?;
        let mut value = serde_json::to_value(&state)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("on_baseline".into(), state.on_baseline().into());
            obj.insert("maneuver_count".into(), state.maneuver_history.len().into());
        }
        Ok::<_, vyuha_core::VyuhaError>(value)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

/// POST /api/restore: return to the baseline trajectory. Idempotent.
pub async fn restore(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let agent = app.agent.clone();
    let outcome = tokio::task::spawn_blocking(move || agent.restore())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    let status = if outcome.changed {
        "RESTORED"
    } else {
        "ALREADY_ON_BASELINE"
    };
    Ok(Json(serde_json::json!({
        "status": status,
        "state": outcome.state,
    })))
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// GET /api/history
pub async fn history(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let agent = app.agent.clone();
    let state = tokio::task::spawn_blocking(move || agent.state())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(serde_json::json!({
        "total_maneuvers": state.maneuver_history.len(),
        "baseline_trajectory": state.baseline_trajectory,
        "maneuver_history": state.maneuver_history,
    })))
}
