use thiserror::Error;

/// Errors raised by a draft store backend (used by the `DraftStore` trait in autodraft-core).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection error")]
    Connection,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("quota exceeded: payload would grow the store past {limit} bytes")]
    QuotaExceeded { limit: usize },
}

/// Errors surfaced by draft operations (save, load, clear, resolve).
///
/// Every variant is scoped to the single draft operation that produced it.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("draft storage unavailable for '{key}': {source}")]
    StorageUnavailable {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("malformed draft for '{key}': {reason}")]
    MalformedDraft { key: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("nothing observed for '{0}', nothing to save")]
    NothingToSave(String),
}

impl DraftError {
    /// Wrap a store error with the key that was being accessed.
    pub fn storage(key: &str, source: StoreError) -> Self {
        Self::StorageUnavailable {
            key: key.to_string(),
            source,
        }
    }
}
