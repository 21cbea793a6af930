use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pulse_core::PulseError;

// ---------------------------------------------------------------------------
// Internal sentinel for malformed requests
// ---------------------------------------------------------------------------

/// Carries an explicit 400 (bad JSON, bad path or query) through the
/// `anyhow::Error` chain without a `PulseError` variant.
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
///
/// Body is `{"error": "...", "details"?: "..."}`. Store and internal failures
/// keep their cause in `details` and a generic `error`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }

    fn status_and_body(&self) -> (StatusCode, serde_json::Value) {
        if let Some(b) = self.0.downcast_ref::<BadRequestError>() {
            return (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "invalid request", "details": b.0 }),
            );
        }

        let Some(e) = self.0.downcast_ref::<PulseError>() else {
            return internal(&self.0);
        };
        let status = match e {
            PulseError::Unauthorized => StatusCode::UNAUTHORIZED,
            PulseError::Forbidden(_) => StatusCode::FORBIDDEN,
            PulseError::UserNotFound(_) | PulseError::GoalNotFound { .. } => StatusCode::NOT_FOUND,
            PulseError::Validation(_) | PulseError::InvalidRole(_) | PulseError::InvalidMetric(_) => {
                StatusCode::BAD_REQUEST
            }
            PulseError::Store(_) | PulseError::Io(_) | PulseError::Yaml(_) | PulseError::Json(_) => {
                return internal(&self.0);
            }
        };
        (status, serde_json::json!({ "error": e.to_string() }))
    }
}

fn internal(err: &anyhow::Error) -> (StatusCode, serde_json::Value) {
    tracing::error!(error = %format!("{err:#}"), "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::json!({ "error": "internal error", "details": err.to_string() }),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, axum::Json(body)).into_response()
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
