use anyhow::{Context, Result};
use execapi_core::config::{Config, WarnLevel};
use execapi_server::AppState;
use std::path::Path;

pub fn run(config_path: &Path, listen: &str) -> Result<()> {
    let config = Config::load(config_path).context("failed to load config")?;

    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => tracing::error!("{}", w.message),
        }
    }

    let state = AppState::new(config.registry(), config.secret()?);
    tracing::info!(
        config = %config_path.display(),
        actions = state.registry.len(),
        "Loaded config"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(listen)
            .await
            .with_context(|| format!("failed to listen on {listen}"))?;

        tokio::select! {
            res = execapi_server::serve_on(state, listener) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                Ok(())
            }
        }
    })
}
