use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::duration::format_duration;

#[derive(Debug, Error)]
pub enum ExecapiError {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no key found in config. Please add a key, see config.json.sample")]
    MissingKey,

    #[error("please add a custom key to the config")]
    PlaceholderKey,

    #[error("no commands found in config. Please add at least one command, see config.json.sample")]
    NoActions,

    #[error("App '{0}' not found")]
    ActionNotFound(String),

    #[error("invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("Invalid timeout")]
    InvalidTimeout(String),

    #[error("Timeout exceeds max allowed timeout of {}", display_ceiling(.0))]
    TimeoutExceedsMax(Duration),

    #[error("failed to parse config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse config yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn display_ceiling(max: &Duration) -> String {
    format_duration(*max)
}

pub type Result<T> = std::result::Result<T, ExecapiError>;
