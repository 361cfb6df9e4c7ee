use execapi_core::registry::Registry;
use execapi_core::secret::SharedSecret;
use std::sync::Arc;

use crate::subprocess::{Executor, ProcessExecutor};

/// Shared application state passed to all route handlers.
///
/// Built once at startup. Nothing in here is written after that, so handlers
/// share it without locks.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub secret: Arc<SharedSecret>,
    pub executor: Arc<dyn Executor>,
}

impl AppState {
    pub fn new(registry: Registry, secret: SharedSecret) -> Self {
        Self::with_executor(registry, secret, Arc::new(ProcessExecutor))
    }

    /// Same as `new` but with a caller-supplied executor.
    pub fn with_executor(
        registry: Registry,
        secret: SharedSecret,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            secret: Arc::new(secret),
            executor,
        }
    }
}
