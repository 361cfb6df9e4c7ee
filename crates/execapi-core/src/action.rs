use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::duration::parse_duration;
use crate::error::{ExecapiError, Result};

/// Upper bound for any action's timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(10 * 60);

// ---------------------------------------------------------------------------
// ActionDefinition
// ---------------------------------------------------------------------------

/// A named command that can be triggered over HTTP.
///
/// Field names follow the config file (`dir`, `script`). Missing fields
/// default to empty strings; `execapi check` reports the ones that would make
/// every request for the action fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "dir", default)]
    pub working_dir: PathBuf,
    #[serde(rename = "script", default)]
    pub command_line: String,
    #[serde(default)]
    pub timeout: String,
}

impl ActionDefinition {
    pub fn new(
        name: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        command_line: impl Into<String>,
        timeout: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            working_dir: working_dir.into(),
            command_line: command_line.into(),
            timeout: timeout.into(),
        }
    }

    /// Program followed by its arguments.
    ///
    /// The command line is split on every single space with no quoting or
    /// escaping, and no shell is involved. Two consecutive spaces therefore
    /// produce an empty argument, and an empty command line produces a single
    /// empty program name that will fail to start.
    pub fn argv(&self) -> Vec<&str> {
        self.command_line.split(' ').collect()
    }

    /// Working directory for the child, or `None` to inherit the server's.
    pub fn dir(&self) -> Option<&Path> {
        if self.working_dir.as_os_str().is_empty() {
            None
        } else {
            Some(&self.working_dir)
        }
    }

    /// The timeout a run of this action is bounded by.
    ///
    /// Fails with `InvalidTimeout` when the configured string does not parse
    /// or is zero, and with `TimeoutExceedsMax` when it is above `max`.
    pub fn effective_timeout(&self, max: Duration) -> Result<Duration> {
        let timeout = parse_duration(&self.timeout)
            .map_err(|_| ExecapiError::InvalidTimeout(self.timeout.clone()))?;
        if timeout.is_zero() {
            return Err(ExecapiError::InvalidTimeout(self.timeout.clone()));
        }
        if timeout > max {
            return Err(ExecapiError::TimeoutExceedsMax(max));
        }
        Ok(timeout)
    }
}
