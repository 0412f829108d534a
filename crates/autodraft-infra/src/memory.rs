//! In-memory draft store.
//!
//! Process-local `DraftStore` backed by `DashMap`, with an optional byte
//! quota mirroring browser local-storage limits (key + payload bytes).

use autodraft_core::storage::draft_store::DraftStore;
use autodraft_types::error::StoreError;
use dashmap::DashMap;

/// `DashMap`-backed draft store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryDraftStore {
    entries: DashMap<String, String>,
    max_bytes: Option<usize>,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses writes growing it past `max_bytes`.
    pub fn with_quota(max_bytes: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_bytes: Some(max_bytes),
        }
    }

    /// Bytes currently used, counting keys and payloads.
    pub fn used_bytes(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.key().len() + e.value().len())
            .sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DraftStore for InMemoryDraftStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|r| r.value().clone()))
    }

    async fn set(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        if let Some(limit) = self.max_bytes {
            let others: usize = self
                .entries
                .iter()
                .filter(|e| e.key() != key)
                .map(|e| e.key().len() + e.value().len())
                .sum();
            if others + key.len() + payload.len() > limit {
                tracing::warn!(key, limit, "draft store quota exceeded");
                return Err(StoreError::QuotaExceeded { limit });
            }
        }

        self.entries.insert(key.to_string(), payload.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let store = InMemoryDraftStore::new();
        store.set("invoice-draft", "{}").await.unwrap();
        assert_eq!(store.get("invoice-draft").await.unwrap().as_deref(), Some("{}"));

        store.remove("invoice-draft").await.unwrap();
        assert!(store.get("invoice-draft").await.unwrap().is_none());
        store.remove("invoice-draft").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn quota_rejects_oversized_write() {
        let store = InMemoryDraftStore::with_quota(10);
        store.set("k", "12345").await.unwrap();
        assert_eq!(store.used_bytes(), 6);

        let err = store.set("j", "123456").await.unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { limit: 10 }));
        assert!(store.get("j").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn quota_ignores_entry_being_replaced() {
        let store = InMemoryDraftStore::with_quota(10);
        store.set("k", "123456789").await.unwrap();
        // Overwriting the same key only counts the new payload.
        store.set("k", "987654321").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("987654321"));
    }

    #[tokio::test]
    async fn keys_are_sorted() {
        let store = InMemoryDraftStore::new();
        store.set("b", "1").await.unwrap();
        store.set("a", "2").await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec!["a", "b"]);
        assert_eq!(store.len(), 2);
    }
}
