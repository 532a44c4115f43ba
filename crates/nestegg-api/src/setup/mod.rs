//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use nestegg_core::Config;
use nestegg_storage::StorageRegistry;
use std::sync::Arc;

/// Initialize telemetry, storage and routes.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.is_production())
        .context("Failed to initialize telemetry")?;

    tracing::info!(
        environment = %config.environment,
        storage = ?config.storage(),
        "Configuration loaded"
    );

    let storage = StorageRegistry::from_config(&config)
        .await
        .context("Failed to initialize storage")?;

    let state = Arc::new(AppState::new(storage));
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
