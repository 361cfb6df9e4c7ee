use crate::output::{print_json, print_table};
use anyhow::{Context, Result};
use execapi_core::config::Config;
use std::path::Path;

pub fn run(config_path: &Path, json: bool) -> Result<()> {
    let config = Config::load(config_path).context("failed to load config")?;
    let registry = config.registry();

    if json {
        let actions: Vec<_> = registry.iter().collect();
        return print_json(&actions);
    }

    let rows = registry
        .iter()
        .map(|a| {
            vec![
                a.name.clone(),
                a.timeout.clone(),
                a.working_dir.display().to_string(),
                a.command_line.clone(),
            ]
        })
        .collect();
    print_table(&["NAME", "TIMEOUT", "DIR", "SCRIPT"], rows);
    Ok(())
}
