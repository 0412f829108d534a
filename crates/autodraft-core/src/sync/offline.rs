//! Offline draft tracking.
//!
//! Drafts saved while offline live only in the local store. `OfflineSync`
//! remembers which keys were saved in that state so the caller can push
//! them to the server once connectivity returns.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashSet;

/// Connectivity flag plus the set of keys awaiting sync.
#[derive(Debug)]
pub struct OfflineSync {
    online: AtomicBool,
    pending: DashSet<String>,
}

impl OfflineSync {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            pending: DashSet::new(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Update connectivity.
    ///
    /// On an offline -> online transition, drains and returns the pending
    /// keys (sorted). Every other call returns an empty list.
    pub fn set_online(&self, online: bool) -> Vec<String> {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if !online || was_online {
            return Vec::new();
        }

        let mut keys: Vec<String> = self.pending.iter().map(|k| k.key().clone()).collect();
        for key in &keys {
            self.pending.remove(key);
        }
        keys.sort();
        keys
    }

    /// Record a successful local save. Returns true if the key is now pending sync.
    pub fn mark_saved(&self, key: &str) -> bool {
        if self.is_online() {
            return false;
        }
        self.pending.insert(key.to_string());
        true
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains(key)
    }

    /// Drop `key` from the pending set (its draft was cleared).
    pub fn forget(&self, key: &str) {
        self.pending.remove(key);
    }

    /// Snapshot of pending keys, sorted.
    pub fn pending(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.pending.iter().map(|k| k.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl Default for OfflineSync {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_while_online_is_not_pending() {
        let sync = OfflineSync::new(true);
        assert!(!sync.mark_saved("offline-draft"));
        assert!(!sync.is_pending("offline-draft"));
    }

    #[test]
    fn save_while_offline_is_pending() {
        let sync = OfflineSync::new(false);
        assert!(sync.mark_saved("offline-draft"));
        assert!(sync.is_pending("offline-draft"));
        assert_eq!(sync.pending(), vec!["offline-draft".to_string()]);
    }

    #[test]
    fn coming_online_drains_pending() {
        let sync = OfflineSync::new(false);
        sync.mark_saved("b");
        sync.mark_saved("a");

        let drained = sync.set_online(true);
        assert_eq!(drained, vec!["a".to_string(), "b".to_string()]);
        assert!(sync.pending().is_empty());
        assert!(sync.is_online());
    }

    #[test]
    fn repeated_online_does_not_drain_twice() {
        let sync = OfflineSync::new(false);
        sync.mark_saved("a");
        assert_eq!(sync.set_online(true).len(), 1);
        assert!(sync.set_online(true).is_empty());
    }

    #[test]
    fn going_offline_keeps_pending() {
        let sync = OfflineSync::new(false);
        sync.mark_saved("a");
        assert!(sync.set_online(false).is_empty());
        assert!(sync.is_pending("a"));
    }

    #[test]
    fn forget_removes_key() {
        let sync = OfflineSync::new(false);
        sync.mark_saved("a");
        sync.forget("a");
        assert!(!sync.is_pending("a"));
        assert!(sync.set_online(true).is_empty());
    }
}
