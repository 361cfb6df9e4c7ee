use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::state::AppState;

/// Axum middleware that admits a request only when it carries
/// `Authorization: Bearer <key>` with exactly the configured key.
///
/// Anything else (no header, another scheme, a non-UTF-8 value, a wrong key)
/// is answered with 401 before the route handler runs.
pub async fn require_bearer(State(app): State<AppState>, req: Request, next: Next) -> Response {
    let authorized = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .is_some_and(|token| app.secret.matches(token));

    if !authorized {
        tracing::warn!(path = %req.uri().path(), "Rejected unauthorized request");
        return AppError::unauthorized().into_response();
    }

    next.run(req).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn bearer_token(value: &str) -> Option<&str> {
    value.strip_prefix("Bearer ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{body::Body, http::Request, middleware, routing::get, Router};
    use execapi_core::registry::Registry;
    use execapi_core::secret::SharedSecret;
    use tower::ServiceExt;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    fn test_app() -> Router {
        let state = AppState::new(Registry::default(), SharedSecret::new("secret").unwrap());
        Router::new()
            .route("/run/x", get(ok_handler))
            .layer(middleware::from_fn_with_state(state, require_bearer))
    }

    async fn status_with(header: Option<&str>) -> StatusCode {
        let mut req = Request::builder().uri("/run/x");
        if let Some(value) = header {
            req = req.header("authorization", value);
        }
        test_app()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn matching_bearer_passes_through() {
        assert_eq!(status_with(Some("Bearer secret")).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_header_returns_401() {
        assert_eq!(status_with(None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_key_returns_401() {
        assert_eq!(status_with(Some("Bearer nope")).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn other_scheme_returns_401() {
        assert_eq!(status_with(Some("Basic secret")).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_with(Some("secret")).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn comparison_is_exact() {
        assert_eq!(status_with(Some("bearer secret")).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_with(Some("Bearer  secret")).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_with(Some("Bearer secret ")).await, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn bearer_token_found() {
        assert_eq!(bearer_token("Bearer tok"), Some("tok"));
        assert_eq!(bearer_token("Bearer "), Some(""));
    }

    #[test]
    fn bearer_token_not_found() {
        assert_eq!(bearer_token("Basic tok"), None);
        assert_eq!(bearer_token(""), None);
    }
}
