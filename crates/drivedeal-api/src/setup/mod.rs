//! Application setup and initialization
//!
//! Everything the entry point wires together, kept out of `main.rs` so tests can build
//! the same router from their own state.

pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use drivedeal_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration, before anything is started
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.is_production())?;

    tracing::info!(
        environment = %config.environment,
        storage_backend = %config.storage.backend,
        scanner_enabled = config.scanner.enabled,
        encrypt_uploads = config.upload.encrypt_uploads,
        "Configuration loaded and validated successfully"
    );

    let storage = storage::setup_storage(&config).await?;
    let scan_gate = services::setup_scan_gate(&config)?;
    let breach_checker = services::setup_breach_checker(&config)?;

    let state = Arc::new(AppState::new(config, storage, scan_gate, breach_checker));
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
