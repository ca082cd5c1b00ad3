pub mod rejections;
pub mod session;
pub mod status;

use anyhow::{Context, Result};
use hometrain_application::TrainingServices;
use hometrain_core::config::RootConfig;
use hometrain_infrastructure::{HttpTrainingStore, InMemoryTrainingBackend};
use std::sync::Arc;

/// Wires the stores for the selected mode.
pub fn build_services(config: &RootConfig, offline: bool) -> Result<TrainingServices> {
    if offline {
        tracing::info!("[CLI] Using the in-memory store");
        return Ok(TrainingServices::from_backend(Arc::new(
            InMemoryTrainingBackend::new(),
        )));
    }
    let store = HttpTrainingStore::from_config(&config.api)
        .with_context(|| format!("Failed to create API client for {}", config.api.base_url))?;
    tracing::info!("[CLI] Using remote store at {}", config.api.base_url);
    Ok(TrainingServices::from_backend(Arc::new(store)))
}
