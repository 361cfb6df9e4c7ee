pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod subprocess;

use axum::extract::Request;
use axum::routing::any;
use axum::{middleware, Router};
use hyper::body::Incoming;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::time::Duration;
use tower::Service;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// How long a client may take to send its request headers. Independent of
/// the per-action execution timeout.
pub const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the axum Router with the run routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let run_routes = Router::new()
        .route("/run/", any(routes::run::run_action))
        .route("/run/{*name}", any(routes::run::run_action))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .merge(run_routes)
        .route("/run", any(routes::run::redirect_to_run_root))
        .route("/", any(routes::root::noop))
        .fallback(routes::root::noop)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Serve on a pre-bound listener. Runs until the surrounding task is dropped.
///
/// Each connection gets its own task and an HTTP/1 connection with a
/// `HEADER_READ_TIMEOUT` header deadline, so a slow client cannot hold a
/// connection open indefinitely before its request is known.
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let app = build_router(app_state);
    let local_addr = listener.local_addr()?;

    tracing::info!("Server running at http://{local_addr}");

    loop {
        let (socket, remote_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                // Per-connection accept errors (e.g. EMFILE) are transient.
                tracing::warn!(error = %e, "Failed to accept connection");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let tower_service = app.clone();
        tokio::spawn(async move {
            let socket = TokioIo::new(socket);
            let hyper_service = hyper::service::service_fn(move |request: Request<Incoming>| {
                tower_service.clone().call(request)
            });

            let mut builder = hyper::server::conn::http1::Builder::new();
            builder
                .timer(TokioTimer::new())
                .header_read_timeout(HEADER_READ_TIMEOUT);

            if let Err(e) = builder.serve_connection(socket, hyper_service).await {
                tracing::debug!(remote = %remote_addr, error = %e, "Connection closed with error");
            }
        });
    }
}
