//! SQLite draft store.
//!
//! Drafts live in `drafts.db` inside the data directory, one row per key.
//! Payloads are stored verbatim; the upsert keeps the first `created_at`
//! and bumps `updated_at`. The database runs in WAL mode. Writes share one
//! connection, so they queue in the pool instead of hitting `SQLITE_BUSY`;
//! `get` and `keys` go through a small read-only pool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use autodraft_core::storage::draft_store::DraftStore;
use autodraft_types::error::StoreError;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

const DB_FILE: &str = "drafts.db";
const READ_CONNECTIONS: u32 = 2;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed implementation of `DraftStore`.
pub struct SqliteDraftStore {
    path: PathBuf,
    reader: SqlitePool,
    writer: SqlitePool,
}

impl SqliteDraftStore {
    /// Open `drafts.db` in `data_dir`, creating it and the `drafts` table
    /// if needed.
    pub async fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let path = data_dir.join(DB_FILE);
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await
            .map_err(query_error)?;

        // The table must exist before the read-only pool opens.
        sqlx::migrate!("../../migrations")
            .run(&writer)
            .await
            .map_err(|e| StoreError::Query(format!("draft schema migration failed: {e}")))?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READ_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await
            .map_err(query_error)?;

        tracing::debug!(path = %path.display(), "sqlite draft store opened");
        Ok(Self {
            path,
            reader,
            writer,
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn query_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Connection,
        sqlx::Error::Io(io) => StoreError::Io(io.to_string()),
        other => StoreError::Query(other.to_string()),
    }
}

impl DraftStore for SqliteDraftStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT payload FROM drafts WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let payload: String = row.try_get("payload").map_err(query_error)?;
                Ok(Some(payload))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO drafts (key, payload, created_at, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (key) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at"#,
        )
        .bind(key)
        .bind(payload)
        .bind(&now)
        .bind(&now)
        .execute(&self.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM drafts WHERE key = ?")
            .bind(key)
            .execute(&self.writer)
            .await
            .map_err(query_error)?;

        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT key FROM drafts ORDER BY key")
            .fetch_all(&self.reader)
            .await
            .map_err(query_error)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("key").map_err(query_error))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (SqliteDraftStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteDraftStore::open(dir.path()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_open_creates_only_drafts_table_in_wal_mode() {
        let (store, dir) = test_store().await;
        assert_eq!(store.path(), dir.path().join("drafts.db"));

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations'",
        )
        .fetch_all(&store.reader)
        .await
        .unwrap();
        assert_eq!(tables, vec![("drafts".to_string(),)]);

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&store.writer)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_reopen_keeps_drafts() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SqliteDraftStore::open(dir.path()).await.unwrap();
            store.set("invoice-42", r#"{"title":"AB"}"#).await.unwrap();
        }

        let store = SqliteDraftStore::open(dir.path()).await.unwrap();
        assert_eq!(
            store.get("invoice-42").await.unwrap().as_deref(),
            Some(r#"{"title":"AB"}"#)
        );
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let (store, _dir) = test_store().await;

        store.set("invoice-draft", r#"{"title":"A"}"#).await.unwrap();

        let loaded = store.get("invoice-draft").await.unwrap();
        assert_eq!(loaded.as_deref(), Some(r#"{"title":"A"}"#));
    }

    #[tokio::test]
    async fn test_set_upserts() {
        let (store, _dir) = test_store().await;

        store.set("k", "first").await.unwrap();
        store.set("k", "second").await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
        assert_eq!(store.keys().await.unwrap(), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (store, _dir) = test_store().await;
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_and_remove_missing() {
        let (store, _dir) = test_store().await;

        store.set("k", "v").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());

        // Should not error
        store.remove("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_sorted() {
        let (store, _dir) = test_store().await;

        store.set("payroll-run", "{}").await.unwrap();
        store.set("expense-7", "{}").await.unwrap();
        store.set("invoice-42", "{}").await.unwrap();

        assert_eq!(
            store.keys().await.unwrap(),
            vec!["expense-7", "invoice-42", "payroll-run"]
        );
    }

    #[tokio::test]
    async fn test_created_at_survives_upsert() {
        let (store, _dir) = test_store().await;

        store.set("k", "first").await.unwrap();
        let (created_before,): (String,) =
            sqlx::query_as("SELECT created_at FROM drafts WHERE key = 'k'")
                .fetch_one(&store.reader)
                .await
                .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        store.set("k", "second").await.unwrap();

        let (created_after, updated_after): (String, String) =
            sqlx::query_as("SELECT created_at, updated_at FROM drafts WHERE key = 'k'")
                .fetch_one(&store.reader)
                .await
                .unwrap();
        assert_eq!(created_before, created_after);
        assert_ne!(created_after, updated_after);
    }
}
