use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use neurocore_core::error::CoreError;

/// Carries an explicit 404 through the `anyhow::Error` chain for lookups
/// that have no `CoreError` counterpart, such as a missing preference key.
#[derive(Debug)]
struct NotFoundError(String);

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NotFoundError {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. The body is always
/// `{"error": "<message>"}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(NotFoundError(msg.into()).into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(CoreError::InvalidConfig(msg.into()).into())
    }
}

fn status_for(e: &CoreError) -> StatusCode {
    match e {
        CoreError::UnknownAction(_) => StatusCode::NOT_FOUND,
        CoreError::AlreadyRunning(_) | CoreError::DuplicateAction(_) => StatusCode::CONFLICT,
        CoreError::InvalidParameter { .. }
        | CoreError::InvalidConfig(_)
        | CoreError::InvalidAction { .. } => StatusCode::BAD_REQUEST,
        CoreError::ExecutionFailure { .. } | CoreError::CommandFailed { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CoreError::ExecutionException { .. }
        | CoreError::CommandSpawnFailed { .. }
        | CoreError::Metrics(_)
        | CoreError::Io(_)
        | CoreError::Yaml(_)
        | CoreError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<NotFoundError>().is_some() {
            StatusCode::NOT_FOUND
        } else if let Some(e) = self.0.downcast_ref::<CoreError>() {
            status_for(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
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
