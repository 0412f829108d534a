//! Application state wiring the autosave controller to the configured store.
//!
//! The controller is generic over its `DraftStore`; AppState pins it to
//! the backend selected in `config.toml`.

use std::path::PathBuf;

use anyhow::Context;
use autodraft_core::autosave::AutosaveController;
use autodraft_infra::config::load_config;
use autodraft_infra::filesystem::resolve_data_dir;
use autodraft_infra::store::ConfiguredStore;
use autodraft_types::config::AutosaveConfig;

/// Controller pinned to the infra store implementations.
pub type ConcreteController = AutosaveController<ConfiguredStore>;

/// Shared application state used by every command.
#[derive(Clone)]
pub struct AppState {
    pub controller: ConcreteController,
    pub config: AutosaveConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load config and open the draft store.
    pub async fn init(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(resolve_data_dir);
        let config = load_config(&data_dir).await;

        let store = ConfiguredStore::open(&config, &data_dir)
            .await
            .with_context(|| format!("Failed to open draft store in {}", data_dir.display()))?;
        let controller = AutosaveController::with_config(store, &config);

        tracing::debug!(backend = %config.backend, "application state initialized");

        Ok(Self {
            controller,
            config,
            data_dir,
        })
    }
}
