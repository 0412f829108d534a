//! Debounced autosave controller.
//!
//! `AutosaveController` keeps the draft in a `DraftStore` eventually
//! consistent with caller-owned state without writing on every change.
//! Each key has its own slot holding the last observed value, at most one
//! armed timer, and an I/O lock that serializes store access for that key.
//!
//! Every `observe` with a changed value gives the slot a fresh generation and
//! re-arms the timer. A timer only writes if, after taking the I/O lock, the
//! generation it was armed with is still current. A newer observe, a manual
//! save and a clear all replace the generation. Generations come from one
//! controller-wide counter, so a slot dropped by `clear` and recreated later
//! never reuses a generation an old timer still holds.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use autodraft_types::config::AutosaveConfig;
use autodraft_types::draft::{
    Conflict, DraftEnvelope, DraftLoad, Resolution, Restored, SaveStatus, ServerSnapshot,
};
use autodraft_types::error::DraftError;
use autodraft_types::event::AutosaveEvent;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

use crate::conflict::{ConflictResolver, detect};
use crate::storage::draft_store::DraftStore;
use crate::sync::OfflineSync;

/// Autosave state for one draft key.
struct KeySlot {
    observed: Option<Value>,
    generation: u64,
    timer: Option<CancellationToken>,
    status: SaveStatus,
    last_saved: Option<DateTime<Utc>>,
    last_error: Option<String>,
    io: Arc<Mutex<()>>,
}

impl KeySlot {
    fn new() -> Self {
        Self {
            observed: None,
            generation: 0,
            timer: None,
            status: SaveStatus::Idle,
            last_saved: None,
            last_error: None,
            io: Arc::new(Mutex::new(())),
        }
    }

    /// Disarm the pending timer (if any) and move to `generation`.
    fn supersede(&mut self, generation: u64) -> u64 {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.generation = generation;
        generation
    }

    /// Whether `flush` has anything to do for this key: an armed timer or
    /// a scheduled write already in progress.
    fn is_pending(&self) -> bool {
        self.timer.is_some() || self.status == SaveStatus::Saving
    }
}

struct Shared<S> {
    store: Arc<S>,
    slots: DashMap<String, KeySlot>,
    generations: AtomicU64,
    events: broadcast::Sender<AutosaveEvent>,
    sync: OfflineSync,
    default_delay: Duration,
}

/// Debounced draft autosave over a `DraftStore`.
///
/// Cloning is cheap and yields a handle to the same controller. Scheduling
/// uses `tokio::spawn`, so `observe` must be called inside a Tokio runtime.
pub struct AutosaveController<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for AutosaveController<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: DraftStore + 'static> AutosaveController<S> {
    /// Create a controller with default settings.
    pub fn new(store: S) -> Self {
        Self::with_config(store, &AutosaveConfig::default())
    }

    /// Create a controller using the event capacity, default delay and
    /// initial connectivity from `config`.
    pub fn with_config(store: S, config: &AutosaveConfig) -> Self {
        Self::from_shared_store(Arc::new(store), config)
    }

    /// Create a controller over a store that is also used elsewhere.
    pub fn from_shared_store(store: Arc<S>, config: &AutosaveConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                slots: DashMap::new(),
                generations: AtomicU64::new(0),
                // broadcast::channel panics on zero capacity
                events: broadcast::channel(config.event_capacity.max(1)).0,
                sync: OfflineSync::new(config.start_online),
                default_delay: config.default_delay(),
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    /// The configured debounce window, for callers without their own.
    pub fn default_delay(&self) -> Duration {
        self.shared.default_delay
    }

    /// A conflict resolver over the same store.
    pub fn resolver(&self) -> ConflictResolver<S> {
        ConflictResolver::new(Arc::clone(&self.shared.store))
    }

    /// Subscribe to autosave events (scheduled saves report failures here).
    pub fn subscribe(&self) -> broadcast::Receiver<AutosaveEvent> {
        self.shared.events.subscribe()
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Register `state` as the value to persist under `key`.
    ///
    /// If it differs from the last observed value, any pending save for
    /// `key` is cancelled and a new one is armed `delay` from now. An
    /// unchanged value leaves the armed timer alone. A zero delay still
    /// saves from a spawned task, never inline.
    pub fn observe<T: Serialize + ?Sized>(
        &self,
        key: &str,
        state: &T,
        delay: Duration,
    ) -> Result<(), DraftError> {
        let value = to_value(state)?;

        let (token, generation) = {
            let mut slot = self
                .shared
                .slots
                .entry(key.to_string())
                .or_insert_with(KeySlot::new);

            if slot.observed.as_ref() == Some(&value) {
                return Ok(());
            }

            slot.observed = Some(value);
            let generation = slot.supersede(self.next_generation());
            let token = CancellationToken::new();
            slot.timer = Some(token.clone());
            slot.status = SaveStatus::Pending;
            (token, generation)
        };

        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(key, delay_ms, generation, "autosave armed");
        self.emit(AutosaveEvent::Scheduled {
            key: key.to_string(),
            delay_ms,
        });

        let controller = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::trace!(key = %key, generation, "autosave timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    controller.run_scheduled(&key, generation).await;
                }
            }
        });

        Ok(())
    }

    /// Timer body: persist the observed value unless superseded meanwhile.
    async fn run_scheduled(&self, key: &str, generation: u64) {
        let Some(io) = self.shared.slots.get(key).map(|slot| Arc::clone(&slot.io)) else {
            return;
        };
        let _io = io.lock().await;

        let value = {
            let Some(mut slot) = self.shared.slots.get_mut(key) else {
                return;
            };
            if slot.generation != generation {
                return;
            }
            slot.timer = None;
            let Some(value) = slot.observed.clone() else {
                return;
            };
            slot.status = SaveStatus::Saving;
            value
        };

        match self.persist(key, value).await {
            Ok(saved_at) => self.finish_save(key, generation, saved_at, true),
            Err(err) => {
                tracing::warn!(key, error = %err, "scheduled autosave failed");
                self.record_failure(key, generation, &err);
                self.emit(AutosaveEvent::SaveFailed {
                    key: key.to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Manual operations
    // -----------------------------------------------------------------------

    /// Persist the last observed state for `key` right now.
    ///
    /// Cancels any pending timer for `key`, so no later scheduled save
    /// repeats this write. Storage errors are returned, not broadcast.
    pub async fn save(&self, key: &str) -> Result<DateTime<Utc>, DraftError> {
        let (io, generation) = {
            let Some(mut slot) = self.shared.slots.get_mut(key) else {
                return Err(DraftError::NothingToSave(key.to_string()));
            };
            if slot.observed.is_none() {
                return Err(DraftError::NothingToSave(key.to_string()));
            }
            let generation = slot.supersede(self.next_generation());
            (Arc::clone(&slot.io), generation)
        };

        let _io = io.lock().await;

        // Re-read under the I/O lock: an observe that raced us wins.
        let value = {
            let Some(mut slot) = self.shared.slots.get_mut(key) else {
                return Err(DraftError::NothingToSave(key.to_string()));
            };
            let Some(value) = slot.observed.clone() else {
                return Err(DraftError::NothingToSave(key.to_string()));
            };
            if slot.generation == generation {
                slot.status = SaveStatus::Saving;
            }
            value
        };

        match self.persist(key, value).await {
            Ok(saved_at) => {
                self.finish_save(key, generation, saved_at, false);
                Ok(saved_at)
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "manual save failed");
                self.record_failure(key, generation, &err);
                Err(err)
            }
        }
    }

    /// Observe `state` and persist it immediately, without waiting for a timer.
    pub async fn save_now<T: Serialize + ?Sized>(
        &self,
        key: &str,
        state: &T,
    ) -> Result<DateTime<Utc>, DraftError> {
        let value = to_value(state)?;
        self.shared
            .slots
            .entry(key.to_string())
            .or_insert_with(KeySlot::new)
            .observed = Some(value);
        self.save(key).await
    }

    /// Bring every pending key to rest: keys with an armed timer are saved
    /// now, and scheduled writes already in progress are waited for.
    /// Returns how many keys were pending.
    ///
    /// Stops at the first storage error.
    pub async fn flush(&self) -> Result<usize, DraftError> {
        let mut pending: Vec<(String, bool, Arc<Mutex<()>>)> = self
            .shared
            .slots
            .iter()
            .filter(|slot| slot.is_pending())
            .map(|slot| (slot.key().clone(), slot.timer.is_some(), Arc::clone(&slot.io)))
            .collect();
        pending.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, armed, io) in &pending {
            if *armed {
                self.save(key).await?;
            } else {
                // The timer already fired; its write holds the I/O lock.
                drop(io.lock().await);
            }
        }

        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "flushed pending autosaves");
        }
        Ok(pending.len())
    }

    /// Read the draft stored under `key`.
    ///
    /// Payloads that fail to decode come back as `DraftLoad::Malformed`
    /// rather than an error. Scheduling state is not touched.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<DraftLoad<T>, DraftError> {
        let payload = self
            .shared
            .store
            .get(key)
            .await
            .map_err(|e| DraftError::storage(key, e))?;

        let Some(payload) = payload else {
            return Ok(DraftLoad::Absent);
        };

        let decoded = DraftEnvelope::from_payload(key, &payload)
            .and_then(|envelope| envelope.into_draft::<T>(key));

        match decoded {
            Ok(draft) => Ok(DraftLoad::Present(draft)),
            Err(DraftError::MalformedDraft { key, reason }) => {
                tracing::warn!(key = %key, reason = %reason, "ignoring malformed draft");
                Ok(DraftLoad::Malformed { key, reason })
            }
            Err(other) => Err(other),
        }
    }

    /// Remove the draft for `key` and cancel its pending save.
    ///
    /// Idempotent: clearing an absent key is not an error. The key's slot
    /// is dropped unless a newer `observe` arrived while the store removed
    /// the draft.
    pub async fn clear(&self, key: &str) -> Result<(), DraftError> {
        let claimed = self.shared.slots.get_mut(key).map(|mut slot| {
            let generation = slot.supersede(self.next_generation());
            (Arc::clone(&slot.io), generation)
        });

        let _io = match &claimed {
            Some((io, _)) => Some(io.lock().await),
            None => None,
        };
        let generation = claimed.as_ref().map(|(_, generation)| *generation);

        if let Err(source) = self.shared.store.remove(key).await {
            let err = DraftError::storage(key, source);
            tracing::warn!(key, error = %err, "clearing draft failed");
            if let Some(generation) = generation {
                self.record_failure(key, generation, &err);
            }
            return Err(err);
        }

        if let Some(generation) = generation {
            let removed = self
                .shared
                .slots
                .remove_if(key, |_, slot| slot.generation == generation)
                .is_some();
            if !removed {
                if let Some(mut slot) = self.shared.slots.get_mut(key) {
                    slot.last_saved = None;
                    slot.last_error = None;
                }
            }
        }
        self.shared.sync.forget(key);

        tracing::info!(key, "draft cleared");
        self.emit(AutosaveEvent::Cleared {
            key: key.to_string(),
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Restore and conflicts
    // -----------------------------------------------------------------------

    /// Load the local draft for `key` and compare it with `server`.
    ///
    /// A malformed local draft counts as absent. The loaded draft comes
    /// back with the detection, so a clean restore needs no second read.
    pub async fn restore(
        &self,
        key: &str,
        server: Option<&ServerSnapshot>,
    ) -> Result<Restored, DraftError> {
        let local = self.load::<Value>(key).await?.into_draft();
        let detection = detect(local.as_ref(), server);
        Ok(Restored { local, detection })
    }

    /// Apply `resolution` to `conflict`.
    ///
    /// Keeping the server version goes through `clear`, so a pending
    /// autosave cannot resurrect the discarded draft.
    pub async fn resolve(
        &self,
        conflict: &Conflict,
        resolution: Resolution,
    ) -> Result<Value, DraftError> {
        match resolution {
            Resolution::KeepLocal => Ok(self
                .resolver()
                .resolve_with_local(&conflict.key, &conflict.local)),
            Resolution::KeepServer => {
                self.clear(&conflict.key).await?;
                tracing::info!(key = %conflict.key, "conflict resolved in favor of server snapshot");
                Ok(conflict.server.content.clone())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Connectivity
    // -----------------------------------------------------------------------

    pub fn is_online(&self) -> bool {
        self.shared.sync.is_online()
    }

    /// Update connectivity. Returns the keys that were waiting for sync
    /// when coming back online.
    pub fn set_online(&self, online: bool) -> Vec<String> {
        let keys = self.shared.sync.set_online(online);
        tracing::debug!(online, pending = keys.len(), "connectivity changed");
        if !keys.is_empty() {
            self.emit(AutosaveEvent::Synced { keys: keys.clone() });
        }
        keys
    }

    pub fn is_pending_sync(&self, key: &str) -> bool {
        self.shared.sync.is_pending(key)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn status(&self, key: &str) -> SaveStatus {
        self.shared
            .slots
            .get(key)
            .map(|slot| slot.status)
            .unwrap_or(SaveStatus::Idle)
    }

    pub fn last_saved(&self, key: &str) -> Option<DateTime<Utc>> {
        self.shared.slots.get(key).and_then(|slot| slot.last_saved)
    }

    /// The most recent save/clear error for `key`, cleared by the next success.
    pub fn last_error(&self, key: &str) -> Option<String> {
        self.shared
            .slots
            .get(key)
            .and_then(|slot| slot.last_error.clone())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn next_generation(&self) -> u64 {
        self.shared.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Broadcast `event`. Having no subscribers is fine.
    fn emit(&self, event: AutosaveEvent) {
        let _ = self.shared.events.send(event);
    }

    async fn persist(&self, key: &str, value: Value) -> Result<DateTime<Utc>, DraftError> {
        let saved_at = Utc::now();
        let payload = DraftEnvelope::new(value, saved_at).to_payload()?;
        self.shared
            .store
            .set(key, &payload)
            .await
            .map_err(|e| DraftError::storage(key, e))?;
        Ok(saved_at)
    }

    fn finish_save(&self, key: &str, generation: u64, saved_at: DateTime<Utc>, scheduled: bool) {
        if let Some(mut slot) = self.shared.slots.get_mut(key) {
            slot.last_saved = Some(saved_at);
            slot.last_error = None;
            if slot.generation == generation {
                slot.status = SaveStatus::Saved;
            }
        }

        tracing::info!(key, scheduled, "draft saved");
        self.emit(AutosaveEvent::Saved {
            key: key.to_string(),
            saved_at,
            scheduled,
        });

        if self.shared.sync.mark_saved(key) {
            tracing::debug!(key, "offline; draft pending sync");
            self.emit(AutosaveEvent::PendingSync {
                key: key.to_string(),
            });
        }
    }

    fn record_failure(&self, key: &str, generation: u64, err: &DraftError) {
        if let Some(mut slot) = self.shared.slots.get_mut(key) {
            slot.last_error = Some(err.to_string());
            if slot.generation == generation {
                slot.status = SaveStatus::Idle;
            }
        }
    }
}

fn to_value<T: Serialize + ?Sized>(state: &T) -> Result<Value, DraftError> {
    serde_json::to_value(state).map_err(|e| DraftError::Serialization(e.to_string()))
}
