//! Backend selection.
//!
//! `ConfiguredStore` dispatches to whichever `DraftStore` the config picked.
//! `DraftStore` uses RPITIT and is not object safe, so dispatch is an enum
//! rather than a trait object.

use std::path::Path;

use autodraft_core::storage::draft_store::DraftStore;
use autodraft_types::config::{AutosaveConfig, StoreBackend};
use autodraft_types::error::StoreError;

use crate::filesystem::FileDraftStore;
use crate::memory::InMemoryDraftStore;
use crate::sqlite::draft::SqliteDraftStore;

/// The draft store chosen by `AutosaveConfig::backend`.
pub enum ConfiguredStore {
    Sqlite(SqliteDraftStore),
    Files(FileDraftStore),
    Memory(InMemoryDraftStore),
}

impl ConfiguredStore {
    /// Open the configured backend inside `data_dir`.
    pub async fn open(config: &AutosaveConfig, data_dir: &Path) -> Result<Self, StoreError> {
        let store = match config.backend {
            StoreBackend::Sqlite => {
                tokio::fs::create_dir_all(data_dir)
                    .await
                    .map_err(|e| StoreError::Io(e.to_string()))?;
                Self::Sqlite(SqliteDraftStore::open(data_dir).await?)
            }
            StoreBackend::Files => Self::Files(FileDraftStore::new(data_dir.join("drafts"))),
            StoreBackend::Memory => Self::Memory(match config.max_draft_bytes {
                Some(limit) => InMemoryDraftStore::with_quota(limit),
                None => InMemoryDraftStore::new(),
            }),
        };

        tracing::debug!(backend = %config.backend, data_dir = %data_dir.display(), "draft store opened");
        Ok(store)
    }

    pub fn backend(&self) -> StoreBackend {
        match self {
            Self::Sqlite(_) => StoreBackend::Sqlite,
            Self::Files(_) => StoreBackend::Files,
            Self::Memory(_) => StoreBackend::Memory,
        }
    }
}

impl DraftStore for ConfiguredStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Self::Sqlite(s) => s.get(key).await,
            Self::Files(s) => s.get(key).await,
            Self::Memory(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        match self {
            Self::Sqlite(s) => s.set(key, payload).await,
            Self::Files(s) => s.set(key, payload).await,
            Self::Memory(s) => s.set(key, payload).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Self::Sqlite(s) => s.remove(key).await,
            Self::Files(s) => s.remove(key).await,
            Self::Memory(s) => s.remove(key).await,
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Sqlite(s) => s.keys().await,
            Self::Files(s) => s.keys().await,
            Self::Memory(s) => s.keys().await,
        }
    }
}
