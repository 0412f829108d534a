//! Autosave events broadcast to subscribers.
//!
//! Scheduled saves run in the background, so their outcome (including
//! failures) is reported through these events rather than a return value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification emitted by the autosave controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutosaveEvent {
    /// A debounced save was armed (or re-armed) for `key`.
    Scheduled { key: String, delay_ms: u64 },

    /// A draft was persisted, either by its timer or by a manual save.
    Saved {
        key: String,
        saved_at: DateTime<Utc>,
        scheduled: bool,
    },

    /// A scheduled save failed. Manual saves return their error instead.
    SaveFailed { key: String, error: String },

    /// The draft for `key` was removed from the store.
    Cleared { key: String },

    /// A draft was saved while offline and awaits sync.
    PendingSync { key: String },

    /// Connectivity returned; these keys were pending sync.
    Synced { keys: Vec<String> },
}

impl AutosaveEvent {
    /// The draft key this event refers to, if it concerns a single key.
    pub fn key(&self) -> Option<&str> {
        match self {
            AutosaveEvent::Scheduled { key, .. }
            | AutosaveEvent::Saved { key, .. }
            | AutosaveEvent::SaveFailed { key, .. }
            | AutosaveEvent::Cleared { key }
            | AutosaveEvent::PendingSync { key } => Some(key),
            AutosaveEvent::Synced { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = AutosaveEvent::SaveFailed {
            key: "invoice-draft".to_string(),
            error: "quota exceeded".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"save_failed\""));
        assert!(json.contains("\"key\":\"invoice-draft\""));
    }

    #[test]
    fn test_event_key() {
        let event = AutosaveEvent::Cleared {
            key: "k".to_string(),
        };
        assert_eq!(event.key(), Some("k"));

        let synced = AutosaveEvent::Synced { keys: vec![] };
        assert_eq!(synced.key(), None);
    }
}
