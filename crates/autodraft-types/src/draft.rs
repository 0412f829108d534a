//! Draft types for autodraft.
//!
//! A draft is a locally persisted, not-yet-confirmed snapshot of form state.
//! These types model the draft as callers see it, the envelope it is stored
//! in, the server snapshot it is compared against, and the per-key save status.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DraftError;

/// Envelope schema version written by this release.
pub const DRAFT_SCHEMA_VERSION: u32 = 1;

/// A locally persisted snapshot of form state, identified by its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft<T = Value> {
    pub key: String,
    pub content: T,
    /// Stamped by the autosave controller on every save.
    pub saved_at: DateTime<Utc>,
}

/// The serialized form of a draft inside the store.
///
/// The store only ever sees the JSON text of this envelope. `schema_version`
/// lets a future release detect and migrate older payloads before decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftEnvelope {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub content: Value,
}

impl DraftEnvelope {
    /// Wrap `content` in a current-version envelope stamped `saved_at`.
    pub fn new(content: Value, saved_at: DateTime<Utc>) -> Self {
        Self {
            schema_version: DRAFT_SCHEMA_VERSION,
            saved_at,
            content,
        }
    }

    /// Encode the envelope as the JSON payload handed to the store.
    pub fn to_payload(&self) -> Result<String, DraftError> {
        serde_json::to_string(self).map_err(|e| DraftError::Serialization(e.to_string()))
    }

    /// Decode a payload read back from the store.
    ///
    /// Fails with `MalformedDraft` on invalid JSON, a missing field, or a
    /// schema version newer than this release understands.
    pub fn from_payload(key: &str, payload: &str) -> Result<Self, DraftError> {
        let envelope: Self =
            serde_json::from_str(payload).map_err(|e| DraftError::MalformedDraft {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if envelope.schema_version > DRAFT_SCHEMA_VERSION {
            return Err(DraftError::MalformedDraft {
                key: key.to_string(),
                reason: format!(
                    "unsupported schema version {} (max {DRAFT_SCHEMA_VERSION})",
                    envelope.schema_version
                ),
            });
        }

        Ok(envelope)
    }

    /// Turn the envelope into a typed draft for `key`.
    pub fn into_draft<T: DeserializeOwned>(self, key: &str) -> Result<Draft<T>, DraftError> {
        let content = serde_json::from_value(self.content).map_err(|e| {
            DraftError::MalformedDraft {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Draft {
            key: key.to_string(),
            content,
            saved_at: self.saved_at,
        })
    }
}

/// Result of reading a draft from the store.
///
/// A malformed payload is not an error at this level: conflict detection
/// treats it as "no local draft", while the reason stays available for
/// diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftLoad<T = Value> {
    Absent,
    Present(Draft<T>),
    Malformed { key: String, reason: String },
}

impl<T> DraftLoad<T> {
    /// The loaded draft, with `Malformed` folded into `None`.
    pub fn into_draft(self) -> Option<Draft<T>> {
        match self {
            Self::Present(draft) => Some(draft),
            Self::Absent | Self::Malformed { .. } => None,
        }
    }

    /// The loaded content, with `Malformed` folded into `None`.
    pub fn into_content(self) -> Option<T> {
        self.into_draft().map(|d| d.content)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// The decode failure behind a `Malformed` load, if any.
    pub fn malformed_error(&self) -> Option<DraftError> {
        match self {
            Self::Malformed { key, reason } => Some(DraftError::MalformedDraft {
                key: key.clone(),
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}

/// The authoritative version of an entity as last fetched from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSnapshot<T = Value> {
    pub content: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> ServerSnapshot<T> {
    pub fn new(content: T) -> Self {
        Self {
            content,
            fetched_at: None,
        }
    }
}

/// Per-key autosave state.
///
/// `Idle -> Pending (timer armed) -> Saving -> Saved`, and back to `Pending`
/// on the next change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    Idle,
    Pending,
    Saving,
    Saved,
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveStatus::Idle => write!(f, "idle"),
            SaveStatus::Pending => write!(f, "pending"),
            SaveStatus::Saving => write!(f, "saving"),
            SaveStatus::Saved => write!(f, "saved"),
        }
    }
}

/// A detected divergence between a local draft and the server snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub key: String,
    pub local: Draft,
    pub server: ServerSnapshot,
}

/// Outcome of comparing a local draft against a server snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    NoConflict,
    Conflict(Conflict),
}

impl Detection {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// A draft restored on load, with its comparison against the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    /// The usable local draft. `None` when absent or malformed.
    pub local: Option<Draft>,
    pub detection: Detection,
}

impl Restored {
    /// Content to show the user: the local draft when there is no conflict,
    /// otherwise nothing until the conflict is resolved.
    pub fn clean_content(&self) -> Option<&Value> {
        match self.detection {
            Detection::NoConflict => self.local.as_ref().map(|draft| &draft.content),
            Detection::Conflict(_) => None,
        }
    }
}

/// Which side wins when a conflict is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    KeepLocal,
    KeepServer,
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "keep_local" => Ok(Resolution::KeepLocal),
            "server" | "keep_server" => Ok(Resolution::KeepServer),
            other => Err(format!("invalid resolution: '{other}' (expected local or server)")),
        }
    }
}
