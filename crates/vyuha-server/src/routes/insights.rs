use axum::{extract::State, Json};
use vyuha_core::insights::Insights;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/insights
pub async fn get_insights(State(app): State<AppState>) -> Result<Json<Insights>, AppError> {
    let agent = app.agent.clone();
    let insights = tokio::task::spawn_blocking(move || agent.insights())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(insights))
}
