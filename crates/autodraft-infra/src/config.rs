//! Configuration loader for autodraft.
//!
//! Reads `config.toml` from the data directory (`~/.autodraft/` in production)
//! and deserializes it into [`AutosaveConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed.

use std::path::Path;

use autodraft_types::config::AutosaveConfig;

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`AutosaveConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_config(data_dir: &Path) -> AutosaveConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AutosaveConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AutosaveConfig::default();
        }
    };

    match toml::from_str::<AutosaveConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AutosaveConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autodraft_types::config::StoreBackend;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.default_delay_ms, 1_000);
        assert_eq!(config.backend, StoreBackend::Sqlite);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
default_delay_ms = 250
backend = "files"
event_capacity = 32
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.default_delay_ms, 250);
        assert_eq!(config.backend, StoreBackend::Files);
        assert_eq!(config.event_capacity, 32);
        assert!(config.start_online);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.default_delay_ms, 1_000);
        assert_eq!(config.backend, StoreBackend::Sqlite);
    }
}
