use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use vyuha_core::error::VyuhaError;

// ---------------------------------------------------------------------------
// Internal sentinel for explicit 400 Bad Request errors
// ---------------------------------------------------------------------------

/// Carries a client error through the `anyhow::Error` chain for request
/// problems the core never sees (e.g. a missing body field).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct BadRequestError(String);

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Input problems map to 400 with `{"error": ...}`. Everything else is an
/// internal failure: 500 with `{"status": "INTERNAL_FAILURE", "error": ...}`,
/// so callers can tell it apart from a rejected or overridden cycle.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(b) = self.0.downcast_ref::<BadRequestError>() {
            let body = serde_json::json!({ "error": b.0.clone() });
            return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
        }

        if let Some(e) = self.0.downcast_ref::<VyuhaError>() {
            match e {
                VyuhaError::InvalidRisk(_) | VyuhaError::InvalidConfig(_) => {
                    let body = serde_json::json!({ "error": e.to_string() });
                    return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
                }
                VyuhaError::Proposer(_)
                | VyuhaError::PolicyOracle(_)
                | VyuhaError::MalformedResponse(_)
                | VyuhaError::Http(_)
                | VyuhaError::CorruptState { .. }
                | VyuhaError::LedgerPoisoned
                | VyuhaError::Io(_)
                | VyuhaError::Yaml(_)
                | VyuhaError::Json(_) => {}
            }
        }

        tracing::error!(error = %format!("{:#}", self.0), "request failed");
        let body = serde_json::json!({
            "status": "INTERNAL_FAILURE",
            "error": self.0.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
