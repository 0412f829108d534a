//! Draft conflict detection and resolution.
//!
//! On load, a locally persisted draft is compared against the server's
//! snapshot of the same entity. Equality is structural over the JSON
//! content: object key order is ignored, array order is not, and numbers
//! compare by their JSON representation (`1` and `1.0` differ).

use std::sync::Arc;

use autodraft_types::draft::{Conflict, Detection, Draft, Resolution, ServerSnapshot};
use autodraft_types::error::DraftError;
use serde_json::Value;

use crate::storage::draft_store::DraftStore;

/// Compare `local` against `server`.
///
/// No conflict when there is no local draft, when the server snapshot is
/// unavailable (a never-synced draft must not need connectivity), or when
/// both contents are structurally equal.
pub fn detect(local: Option<&Draft>, server: Option<&ServerSnapshot>) -> Detection {
    let (Some(local), Some(server)) = (local, server) else {
        return Detection::NoConflict;
    };

    if local.content == server.content {
        return Detection::NoConflict;
    }

    tracing::debug!(key = %local.key, "local draft diverges from server snapshot");
    Detection::Conflict(Conflict {
        key: local.key.clone(),
        local: local.clone(),
        server: server.clone(),
    })
}

/// Applies the chosen winner of a detected conflict.
pub struct ConflictResolver<S> {
    store: Arc<S>,
}

impl<S> Clone for ConflictResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DraftStore> ConflictResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Keep the local draft. The stored draft is left untouched.
    pub fn resolve_with_local(&self, key: &str, draft: &Draft) -> Value {
        tracing::info!(key, "conflict resolved in favor of local draft");
        draft.content.clone()
    }

    /// Keep the server version and remove the local draft so the stale
    /// conflict does not surface again on the next load.
    pub async fn resolve_with_server(
        &self,
        key: &str,
        snapshot: &ServerSnapshot,
    ) -> Result<Value, DraftError> {
        self.store
            .remove(key)
            .await
            .map_err(|e| DraftError::storage(key, e))?;

        tracing::info!(key, "conflict resolved in favor of server snapshot");
        Ok(snapshot.content.clone())
    }

    /// Apply `resolution` to a detected conflict.
    pub async fn resolve(
        &self,
        conflict: &Conflict,
        resolution: Resolution,
    ) -> Result<Value, DraftError> {
        match resolution {
            Resolution::KeepLocal => Ok(self.resolve_with_local(&conflict.key, &conflict.local)),
            Resolution::KeepServer => {
                self.resolve_with_server(&conflict.key, &conflict.server)
                    .await
            }
        }
    }
}
