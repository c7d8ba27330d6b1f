//! Application setup and initialization

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use waypost_core::ServerConfig;

use crate::state::AppState;

/// Initialize the entire application
pub fn initialize_app(config: ServerConfig) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    // Validate configuration - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    tracing::info!(
        environment = %config.environment,
        verbosity = config.reporter.verbosity.level(),
        capture_when_quiet = config.reporter.capture_when_quiet,
        "Configuration loaded and validated successfully"
    );

    let state = Arc::new(AppState::new(config));
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
