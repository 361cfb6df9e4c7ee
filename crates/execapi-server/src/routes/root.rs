use axum::http::StatusCode;

/// Any path outside `/run/` — an empty 200, usable as a liveness probe.
pub async fn noop() -> StatusCode {
    StatusCode::OK
}
