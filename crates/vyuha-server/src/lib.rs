pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vyuha_core::agent::Agent;

use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(routes::health::health))
        .route("/api/health", get(routes::health::health))
        // Risk source
        .route("/api/scan", post(routes::scan::scan))
        // Action cycle
        .route("/api/act", post(routes::act::act))
        // Spacecraft state
        .route("/api/state", get(routes::spacecraft::get_state))
        .route("/api/restore", post(routes::spacecraft::restore))
        .route("/api/history", get(routes::spacecraft::history))
        // Insights
        .route("/api/insights", get(routes::insights::get_insights))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Open the agent under `root` off the async runtime; its oracle clients are
/// blocking.
async fn open_agent(root: PathBuf) -> anyhow::Result<AppState> {
    let agent = tokio::task::spawn_blocking(move || Agent::open(&root))
        .await
        .map_err(|e| anyhow::anyhow!("task join error: {e}"))??;
    let readiness = agent.readiness();
    tracing::info!(
        proposer = ?readiness.proposer,
        policy_oracle = readiness.policy_oracle,
        "agent ready"
    );
    Ok(AppState::new(agent))
}

/// Start the Vyuha server on `0.0.0.0:<port>`.
pub async fn serve(root: PathBuf, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(root, listener).await
}

/// Start the Vyuha server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(root: PathBuf, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(open_agent(root).await?);

    tracing::info!("Vyuha server listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
