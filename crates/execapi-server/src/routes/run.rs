use axum::extract::{Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use execapi_core::action::MAX_TIMEOUT;
use percent_encoding::percent_decode_str;

use crate::error::{plain_text, AppError};
use crate::state::AppState;
use crate::subprocess::{ExecutionOutcome, ExecutionStatus};

const RUN_PREFIX: &str = "/run/";

/// Query flags for a run. Only the first `verbose` pair counts, and only the
/// exact value `1` turns it on.
#[derive(Debug, Default)]
pub struct RunParams {
    verbose: bool,
}

impl RunParams {
    fn from_pairs(pairs: &[(String, String)]) -> Self {
        let verbose = pairs
            .iter()
            .find(|(key, _)| key == "verbose")
            .is_some_and(|(_, value)| value == "1");
        Self { verbose }
    }
}

/// The action name is everything after `/run/`, percent-decoded. Bytes that
/// do not decode to UTF-8 are replaced rather than rejected, so such a name
/// simply fails lookup.
fn action_name(uri: &Uri) -> String {
    let rest = uri.path().strip_prefix(RUN_PREFIX).unwrap_or_default();
    percent_decode_str(rest).decode_utf8_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// ANY /run/{*name}
// ---------------------------------------------------------------------------

/// ANY /run/{*name} — run the named action and report how it went.
///
/// Authentication has already happened in `auth::require_bearer`.
/// Returns 404 for an unknown name, 400 for a bad or over-ceiling timeout or
/// a failed run, 408 when the run hit its deadline, and 200 otherwise. The
/// 200 body holds the captured output only with `?verbose=1`.
///
/// Also mounted on `/run/` itself, where the name is empty.
pub async fn run_action(
    State(app): State<AppState>,
    uri: Uri,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let params = RunParams::from_pairs(&pairs);
    execute_named(&app, &action_name(&uri), &params).await
}

/// ANY /run — 301 to `/run/`, keeping the query, so the request lands on the
/// authenticated route.
pub async fn redirect_to_run_root(uri: Uri) -> Response {
    let location = match uri.query() {
        Some(query) => format!("{RUN_PREFIX}?{query}"),
        None => RUN_PREFIX.to_string(),
    };
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

async fn execute_named(app: &AppState, name: &str, params: &RunParams) -> Result<Response, AppError> {
    let action = app.registry.get(name)?.clone();
    let timeout = action.effective_timeout(MAX_TIMEOUT)?;

    // Run in a detached task: a client hanging up drops this handler, but
    // only the deadline may stop the process.
    let executor = app.executor.clone();
    let outcome = tokio::spawn(async move {
        let outcome = executor.execute(&action, timeout).await;
        if matches!(outcome.status, ExecutionStatus::Success) {
            tracing::info!(
                action = %action.name,
                "Execution successful for {}, output:\n{}",
                action.name,
                String::from_utf8_lossy(&outcome.output)
            );
        }
        outcome
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("execution task failed: {e}")))?;

    Ok(render_outcome(outcome, params.verbose))
}

/// Translate an execution outcome into the HTTP reply.
fn render_outcome(outcome: ExecutionOutcome, verbose: bool) -> Response {
    match outcome.status {
        ExecutionStatus::Success => {
            if verbose {
                (StatusCode::OK, outcome.output).into_response()
            } else {
                StatusCode::OK.into_response()
            }
        }
        ExecutionStatus::Timeout => plain_text(StatusCode::REQUEST_TIMEOUT, "Execution timed out\n"),
        ExecutionStatus::Failure(err) => {
            let mut body = format!("Execution failed: {err}\n").into_bytes();
            body.extend_from_slice(&outcome.output);
            body.push(b'\n');
            plain_text(StatusCode::BAD_REQUEST, body)
        }
    }
}
