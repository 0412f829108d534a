//! In-memory `DraftStore` fake that records calls and can be told to fail.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use autodraft_types::error::StoreError;

use crate::storage::draft_store::DraftStore;

#[derive(Default)]
pub struct RecordingStore {
    entries: Mutex<BTreeMap<String, String>>,
    sets: Mutex<Vec<(String, String)>>,
    removes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    write_delay_ms: AtomicU64,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `set` call so far, in order.
    pub fn set_calls(&self) -> Vec<(String, String)> {
        self.sets.lock().unwrap().clone()
    }

    pub fn set_count(&self) -> usize {
        self.sets.lock().unwrap().len()
    }

    pub fn remove_count(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every `set` take `delay` before it lands.
    pub fn delay_writes(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Place a raw payload without going through `set`.
    pub fn insert_raw(&self, key: &str, payload: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), payload.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

impl DraftStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Io("read failed".to_string()));
        }
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::QuotaExceeded { limit: 0 });
        }
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.sets
            .lock()
            .unwrap()
            .push((key.to_string(), payload.to_string()));
        self.insert_raw(key, payload);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io("remove failed".to_string()));
        }
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.lock().unwrap().keys().cloned().collect())
    }
}
