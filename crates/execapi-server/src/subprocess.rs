use async_trait::async_trait;
use execapi_core::action::ActionDefinition;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{}", describe_exit(.0))]
    Exited(ExitStatus),

    #[error("failed to capture process output")]
    MissingPipe,

    #[error("process error: {0}")]
    Io(#[from] std::io::Error),
}

/// `exit status 3`, or `signal: 9` when the process was killed by a signal.
fn describe_exit(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit status {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal: {signal}");
        }
    }
    status.to_string()
}

#[derive(Debug)]
pub enum ExecutionStatus {
    Success,
    Timeout,
    Failure(ExecError),
}

/// Result of one run: everything the process wrote to stdout and stderr, in
/// arrival order, plus how it ended.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub output: Vec<u8>,
    pub status: ExecutionStatus,
}

impl ExecutionOutcome {
    pub fn success(output: Vec<u8>) -> Self {
        Self {
            output,
            status: ExecutionStatus::Success,
        }
    }

    pub fn timeout(output: Vec<u8>) -> Self {
        Self {
            output,
            status: ExecutionStatus::Timeout,
        }
    }

    pub fn failure(error: ExecError, output: Vec<u8>) -> Self {
        Self {
            output,
            status: ExecutionStatus::Failure(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs an action to completion or until `timeout` elapses.
///
/// Callers validate `timeout` against the global ceiling before calling.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, action: &ActionDefinition, timeout: Duration) -> ExecutionOutcome;
}

/// Spawns the action's command line as a real child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(&self, action: &ActionDefinition, timeout: Duration) -> ExecutionOutcome {
        run_action(action, timeout).await
    }
}

/// Spawn the action, collect combined output and enforce the deadline.
///
/// On expiry the child's process group is killed and the child reaped before
/// returning, so nothing started by this call outlives it.
pub async fn run_action(action: &ActionDefinition, timeout: Duration) -> ExecutionOutcome {
    let start = Instant::now();
    // Splitting a string always yields at least one piece.
    let argv = action.argv();
    let (program, args) = (argv[0], &argv[1..]);

    tracing::info!(
        action = %action.name,
        program = %program,
        timeout_ms = timeout.as_millis() as u64,
        "Executing action"
    );

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = action.dir() {
        cmd.current_dir(dir);
    }
    #[cfg(unix)]
    {
        cmd.process_group(0);
    }

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(source) => {
            tracing::warn!(
                action = %action.name,
                program = %program,
                error = %source,
                "Failed to start action"
            );
            return ExecutionOutcome::failure(
                ExecError::Spawn {
                    program: program.to_string(),
                    source,
                },
                Vec::new(),
            );
        }
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        terminate(&mut child).await;
        return ExecutionOutcome::failure(ExecError::MissingPipe, Vec::new());
    };

    let mut output = Vec::new();
    let waited = tokio::time::timeout(
        timeout,
        collect_combined(&mut child, stdout, stderr, &mut output),
    )
    .await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match waited {
        Err(_elapsed) => {
            terminate(&mut child).await;
            tracing::warn!(action = %action.name, elapsed_ms, "Action timed out");
            ExecutionOutcome::timeout(output)
        }
        Ok(Err(e)) => {
            terminate(&mut child).await;
            tracing::warn!(action = %action.name, elapsed_ms, error = %e, "Action failed");
            ExecutionOutcome::failure(ExecError::Io(e), output)
        }
        Ok(Ok(status)) if status.success() => {
            tracing::info!(action = %action.name, elapsed_ms, "Action completed");
            ExecutionOutcome::success(output)
        }
        Ok(Ok(status)) => {
            tracing::warn!(action = %action.name, elapsed_ms, status = %status, "Action failed");
            ExecutionOutcome::failure(ExecError::Exited(status), output)
        }
    }
}

/// Drain stdout and stderr into `output` as chunks arrive, then wait for exit.
///
/// Reads are cancel safe, so whatever was appended before the deadline fired
/// stays in `output`.
async fn collect_combined(
    child: &mut Child,
    mut stdout: ChildStdout,
    mut stderr: ChildStderr,
    output: &mut Vec<u8>,
) -> std::io::Result<ExitStatus> {
    let mut out_buf = [0u8; 8192];
    let mut err_buf = [0u8; 8192];
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            n = stdout.read(&mut out_buf), if out_open => {
                let n = n?;
                if n == 0 {
                    out_open = false;
                } else {
                    output.extend_from_slice(&out_buf[..n]);
                }
            }
            n = stderr.read(&mut err_buf), if err_open => {
                let n = n?;
                if n == 0 {
                    err_open = false;
                } else {
                    output.extend_from_slice(&err_buf[..n]);
                }
            }
        }
    }

    child.wait().await
}

/// Kill the child's whole process group, then the child itself, and reap it.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: killpg only sends a signal; the group id is the child's
            // pid because it was spawned with process_group(0).
            unsafe {
                libc::killpg(pid as libc::pid_t, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LONG: Duration = Duration::from_secs(10);

    fn action(dir: &std::path::Path, command_line: &str) -> ActionDefinition {
        ActionDefinition::new("test", dir, command_line, "10s")
    }

    #[tokio::test]
    async fn captures_stdout_with_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let outcome = run_action(&action(dir.path(), "echo hello"), LONG).await;
        assert!(matches!(outcome.status, ExecutionStatus::Success));
        assert_eq!(outcome.output, b"hello\n");
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let outcome = run_action(&action(dir.path(), "ls"), LONG).await;
        assert!(matches!(outcome.status, ExecutionStatus::Success));
        assert!(String::from_utf8_lossy(&outcome.output).contains("marker.txt"));
    }

    #[tokio::test]
    async fn stderr_is_merged_into_output() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("both.sh"), "echo out\necho err >&2\n").unwrap();
        let outcome = run_action(&action(dir.path(), "sh both.sh"), LONG).await;
        assert!(matches!(outcome.status, ExecutionStatus::Success));
        let text = String::from_utf8_lossy(&outcome.output);
        assert!(text.contains("out\n"), "got {text:?}");
        assert!(text.contains("err\n"), "got {text:?}");
    }

    #[tokio::test]
    async fn double_space_passes_empty_argument() {
        let dir = TempDir::new().unwrap();
        let outcome = run_action(&action(dir.path(), "echo a  b"), LONG).await;
        assert!(matches!(outcome.status, ExecutionStatus::Success));
        // echo joins "a", "" and "b" with single spaces.
        assert_eq!(outcome.output, b"a  b\n");
    }

    #[tokio::test]
    async fn non_zero_exit_keeps_partial_output() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("fail.sh"), "echo partial\nexit 3\n").unwrap();
        let outcome = run_action(&action(dir.path(), "sh fail.sh"), LONG).await;
        match outcome.status {
            ExecutionStatus::Failure(ExecError::Exited(status)) => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(ExecError::Exited(status).to_string(), "exit status 3");
            }
            other => panic!("expected exit failure, got {other:?}"),
        }
        assert_eq!(outcome.output, b"partial\n");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let outcome = run_action(&action(dir.path(), "__nonexistent_command_xyz__"), LONG).await;
        match outcome.status {
            ExecutionStatus::Failure(ref e @ ExecError::Spawn { .. }) => {
                assert!(e.to_string().contains("__nonexistent_command_xyz__"));
            }
            other => panic!("expected spawn failure, got {other:?}"),
        }
        assert!(outcome.output.is_empty());
    }

    #[tokio::test]
    async fn empty_command_line_fails_to_start() {
        let dir = TempDir::new().unwrap();
        let outcome = run_action(&action(dir.path(), ""), LONG).await;
        assert!(matches!(
            outcome.status,
            ExecutionStatus::Failure(ExecError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn missing_working_directory_fails_to_start() {
        let outcome = run_action(
            &action(std::path::Path::new("/definitely/not/here"), "echo hi"),
            LONG,
        )
        .await;
        assert!(matches!(
            outcome.status,
            ExecutionStatus::Failure(ExecError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn deadline_returns_timeout_promptly() {
        let dir = TempDir::new().unwrap();
        let started = Instant::now();
        let outcome = run_action(&action(dir.path(), "sleep 2"), Duration::from_millis(100)).await;
        assert!(matches!(outcome.status, ExecutionStatus::Timeout));
        assert!(
            started.elapsed() < Duration::from_millis(1500),
            "execute should return shortly after the deadline, took {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn deadline_kills_the_process_and_its_children() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("slow.sh"),
            "echo started\nsleep 1\ntouch finished\n",
        )
        .unwrap();
        let outcome = run_action(&action(dir.path(), "sh slow.sh"), Duration::from_millis(300)).await;
        assert!(matches!(outcome.status, ExecutionStatus::Timeout));
        assert_eq!(outcome.output, b"started\n");

        // Had anything survived the kill, the marker would appear by now.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!dir.path().join("finished").exists());
    }

    #[tokio::test]
    async fn concurrent_runs_of_same_action() {
        let dir = TempDir::new().unwrap();
        let a = action(dir.path(), "sleep 0.5");
        let started = Instant::now();
        let (first, second) = tokio::join!(
            ProcessExecutor.execute(&a, LONG),
            ProcessExecutor.execute(&a, LONG)
        );
        assert!(matches!(first.status, ExecutionStatus::Success));
        assert!(matches!(second.status, ExecutionStatus::Success));
        assert!(started.elapsed() < Duration::from_millis(900));
    }
}
