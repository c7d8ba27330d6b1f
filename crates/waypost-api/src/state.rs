//! Application state shared by all handlers.

use std::sync::Arc;

use waypost::Reporter;
use waypost_core::ServerConfig;

pub struct AppState {
    pub config: ServerConfig,
    pub reporter: Arc<Reporter>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let reporter = Arc::new(Reporter::new(config.reporter.clone()));
        Self { config, reporter }
    }
}
