use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use execapi_core::error::ExecapiError;

// ---------------------------------------------------------------------------
// Internal sentinel for 401 Unauthorized
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP 401 through the `anyhow::Error` chain without
/// adding a request-level variant to `ExecapiError`.
#[derive(Debug)]
struct UnauthorizedError;

impl std::fmt::Display for UnauthorizedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Unauthorized")
    }
}

impl std::error::Error for UnauthorizedError {}

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. Rendered as a plain-text body.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn unauthorized() -> Self {
        Self(UnauthorizedError.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<UnauthorizedError>().is_some() {
            StatusCode::UNAUTHORIZED
        } else if let Some(e) = self.0.downcast_ref::<ExecapiError>() {
            match e {
                ExecapiError::ActionNotFound(_) => StatusCode::NOT_FOUND,
                ExecapiError::InvalidTimeout(_)
                | ExecapiError::InvalidDuration(_)
                | ExecapiError::TimeoutExceedsMax(_) => StatusCode::BAD_REQUEST,
                ExecapiError::ConfigRead { .. }
                | ExecapiError::MissingKey
                | ExecapiError::PlaceholderKey
                | ExecapiError::NoActions
                | ExecapiError::Json(_)
                | ExecapiError::Yaml(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        plain_text(status, format!("{}\n", self.0))
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

/// A `text/plain` response, the shape every non-success reply takes.
pub fn plain_text(status: StatusCode, body: impl Into<axum::body::Body>) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        body.into(),
    )
        .into_response()
}
