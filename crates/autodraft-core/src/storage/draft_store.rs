//! Draft store trait.
//!
//! Defines the narrow get/set/remove capability the autosave controller
//! needs from a persistence medium. The store deals only in serialized
//! payloads; encoding drafts into envelopes is the controller's job.
//! Implementations live in autodraft-infra.

use std::future::Future;

use autodraft_types::error::StoreError;

/// Trait for key-value draft persistence.
///
/// Semantics are plain last-write-wins: `set` overwrites, `remove` is a
/// no-op for absent keys, and no transactional guarantees are assumed.
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait DraftStore: Send + Sync {
    /// Get the payload stored under `key`. Returns None if the key does not exist.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Store `payload` under `key` (upsert).
    fn set(&self, key: &str, payload: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove `key`. No-op if the key does not exist.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// List all stored keys, sorted.
    fn keys(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}
