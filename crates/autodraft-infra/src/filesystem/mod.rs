//! Filesystem adapters for autodraft.
//!
//! `FileDraftStore` keeps one `<encoded-key>.json` file per draft under a
//! directory. Keys are escaped so any string maps to a safe file name, and
//! writes go through a temp file plus rename so a crash never leaves a
//! half-written draft behind.

use std::path::{Path, PathBuf};

use autodraft_core::storage::draft_store::DraftStore;
use autodraft_types::error::StoreError;

const EXTENSION: &str = "json";

/// Directory-backed implementation of `DraftStore`.
///
/// All operations go through `tokio::fs` for async I/O.
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", encode_key(key)))
    }
}

fn io_error(e: std::io::Error) -> StoreError {
    StoreError::Io(e.to_string())
}

/// Escape `key` into a file stem: ASCII alphanumerics, `-` and `_` pass
/// through, every other byte becomes `%XX`.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Inverse of [`encode_key`]. Returns `None` for stems it did not produce.
fn decode_key(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

impl DraftStore for FileDraftStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(e)),
        }
    }

    async fn set(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_error)?;

        let path = self.path_for(key);
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        tokio::fs::write(&tmp, payload).await.map_err(io_error)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_error)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match decode_key(stem) {
                Some(key) => keys.push(key),
                None => tracing::debug!(file = %path.display(), "skipping foreign file in draft dir"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority: `AUTODRAFT_DATA_DIR`, then `~/.autodraft`, then `./.autodraft`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AUTODRAFT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    // Use home directory fallback: ~/.autodraft
    if let Some(home) = dirs::home_dir() {
        return home.join(".autodraft");
    }

    // Last resort: current directory
    PathBuf::from(".autodraft")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_key_encoding_roundtrip() {
        for key in ["invoice-42", "a/b", "../etc/passwd", "with space", "ünïcode", "%41"] {
            let encoded = encode_key(key);
            assert!(!encoded.contains('/'));
            assert!(!encoded.contains('.'));
            assert_eq!(decode_key(&encoded).as_deref(), Some(key));
        }
    }

    #[test]
    fn test_decode_rejects_truncated_escape() {
        assert!(decode_key("abc%4").is_none());
        assert!(decode_key("abc%ZZ").is_none());
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let dir = tempdir().unwrap();
        let store = FileDraftStore::new(dir.path().join("drafts"));

        store.set("invoice-draft", r#"{"title":"A"}"#).await.unwrap();
        let loaded = store.get("invoice-draft").await.unwrap();
        assert_eq!(loaded.as_deref(), Some(r#"{"title":"A"}"#));
        assert!(dir.path().join("drafts/invoice-draft.json").exists());
    }

    #[tokio::test]
    async fn test_set_overwrites_without_leftover_tmp() {
        let dir = tempdir().unwrap();
        let store = FileDraftStore::new(dir.path());

        store.set("k", "one").await.unwrap();
        store.set("k", "two").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));
        assert!(!dir.path().join("k.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_dir_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileDraftStore::new(dir.path().join("never-created"));

        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.keys().await.unwrap().is_empty());
        store.remove("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_decoded_and_foreign_files_skipped() {
        let dir = tempdir().unwrap();
        let store = FileDraftStore::new(dir.path());

        store.set("a/b", "{}").await.unwrap();
        store.set("invoice-42", "{}").await.unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "x").await.unwrap();

        assert_eq!(store.keys().await.unwrap(), vec!["a/b", "invoice-42"]);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileDraftStore::new(dir.path());

        store.set("k", "v").await.unwrap();
        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }
}
