//! Configuration types for autodraft.
//!
//! `AutosaveConfig` represents the top-level `config.toml` that selects the
//! draft store backend and the autosave defaults.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.autodraft/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Debounce window applied when the caller does not pass one.
    #[serde(default = "default_delay_ms")]
    pub default_delay_ms: u64,

    /// Which draft store backs the controller.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Capacity of the autosave event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Whether the controller starts in the online state.
    #[serde(default = "default_start_online")]
    pub start_online: bool,

    /// Byte quota for the in-memory backend. `None` means unbounded.
    #[serde(default)]
    pub max_draft_bytes: Option<usize>,
}

fn default_delay_ms() -> u64 {
    1_000
}

fn default_event_capacity() -> usize {
    256
}

fn default_start_online() -> bool {
    true
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: default_delay_ms(),
            backend: StoreBackend::default(),
            event_capacity: default_event_capacity(),
            start_online: default_start_online(),
            max_draft_bytes: None,
        }
    }
}

impl AutosaveConfig {
    pub fn default_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.default_delay_ms)
    }
}

/// Draft store backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// `drafts.db` in the data directory.
    #[default]
    Sqlite,
    /// One JSON file per key under `{data_dir}/drafts/`.
    Files,
    /// Process-local; nothing survives exit.
    Memory,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Sqlite => write!(f, "sqlite"),
            StoreBackend::Files => write!(f, "files"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = AutosaveConfig::default();
        assert_eq!(config.default_delay_ms, 1_000);
        assert_eq!(config.backend, StoreBackend::Sqlite);
        assert_eq!(config.event_capacity, 256);
        assert!(config.start_online);
        assert!(config.max_draft_bytes.is_none());
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: AutosaveConfig = toml::from_str("").unwrap();
        assert_eq!(config.default_delay_ms, 1_000);
        assert_eq!(config.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn test_config_deserialize_with_values() {
        let toml_str = r#"
default_delay_ms = 500
backend = "memory"
start_online = false
max_draft_bytes = 5242880
"#;
        let config: AutosaveConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_delay_ms, 500);
        assert_eq!(config.default_delay(), std::time::Duration::from_millis(500));
        assert_eq!(config.backend, StoreBackend::Memory);
        assert!(!config.start_online);
        assert_eq!(config.max_draft_bytes, Some(5_242_880));
    }

    #[test]
    fn test_backend_rejects_unknown() {
        let result: Result<AutosaveConfig, _> = toml::from_str("backend = \"redis\"");
        assert!(result.is_err());
    }
}
