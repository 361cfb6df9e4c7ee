use crate::action::{ActionDefinition, MAX_TIMEOUT};
use crate::duration::format_duration;
use crate::error::{ExecapiError, Result};
use crate::registry::Registry;
use crate::secret::SharedSecret;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ConfigFormat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// `.yaml` / `.yml` files are YAML; everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(alias = "Key", default)]
    pub key: String,
    #[serde(default)]
    pub commands: Vec<ActionDefinition>,
}

impl Config {
    /// Read, parse and check a config file. Any failure here must keep the
    /// server from starting.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|source| ExecapiError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&data, ConfigFormat::from_path(path))
    }

    pub fn parse(data: &str, format: ConfigFormat) -> Result<Self> {
        let cfg: Config = match format {
            ConfigFormat::Json => serde_json::from_str(data)?,
            ConfigFormat::Yaml => serde_yaml::from_str(data)?,
        };
        cfg.check()?;
        Ok(cfg)
    }

    /// Fatal conditions: missing or placeholder key, no commands.
    pub fn check(&self) -> Result<()> {
        SharedSecret::new(self.key.as_str())?;
        if self.commands.is_empty() {
            return Err(ExecapiError::NoActions);
        }
        Ok(())
    }

    pub fn secret(&self) -> Result<SharedSecret> {
        SharedSecret::new(self.key.as_str())
    }

    pub fn registry(&self) -> Registry {
        Registry::from_actions(self.commands.iter().cloned())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Non-fatal findings. Entries at `WarnLevel::Error` describe actions
    /// whose every request will fail.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Duplicate names: the later definition silently replaces the earlier
        let mut seen = HashSet::new();
        for action in &self.commands {
            if !seen.insert(action.name.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "action '{}' is defined more than once; the last definition wins",
                        action.name
                    ),
                });
            }
        }

        for action in &self.commands {
            // 2. Timeout must parse, be non-zero and stay under the ceiling
            match action.effective_timeout(MAX_TIMEOUT) {
                Ok(_) => {}
                Err(ExecapiError::TimeoutExceedsMax(max)) => warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "action '{}': timeout '{}' exceeds the maximum of {}",
                        action.name,
                        action.timeout,
                        format_duration(max)
                    ),
                }),
                Err(_) => warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "action '{}': invalid timeout '{}' (expected e.g. \"30s\" or \"5m\")",
                        action.name, action.timeout
                    ),
                }),
            }

            // 3. Command line
            if action.command_line.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("action '{}': script is empty", action.name),
                });
            } else if action.command_line.contains("  ") {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "action '{}': script contains consecutive spaces, which pass an empty argument",
                        action.name
                    ),
                });
            }

            // 4. Working directory
            if let Some(dir) = action.dir() {
                if !dir.is_dir() {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "action '{}': dir '{}' does not exist or is not a directory",
                            action.name,
                            dir.display()
                        ),
                    });
                }
            }
        }

        warnings
    }
}
