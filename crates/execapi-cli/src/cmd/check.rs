use crate::output::print_json;
use anyhow::{bail, Context, Result};
use execapi_core::config::{Config, WarnLevel};
use std::path::Path;

pub fn run(config_path: &Path, json: bool) -> Result<()> {
    let config = Config::load(config_path).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "actions": config.registry().len(),
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let errors = warnings
        .iter()
        .filter(|w| w.level == WarnLevel::Error)
        .count();
    if errors > 0 {
        bail!("config has {errors} error(s)");
    }
    Ok(())
}
