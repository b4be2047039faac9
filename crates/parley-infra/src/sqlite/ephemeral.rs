//! SQLite ephemeral store.
//!
//! Implements `EphemeralStore` from `parley-core` on a dedicated database
//! file. Documents live in `kv_entries`; the activity index is a separate
//! table with an index on the activity time, so `idle_since` never scans
//! document bodies.

use chrono::{DateTime, Utc};
use sqlx::Row;

use parley_core::session::EphemeralStore;
use parley_types::error::StoreError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `EphemeralStore`.
#[derive(Clone)]
pub struct SqliteEphemeralStore {
    pool: DatabasePool,
}

impl SqliteEphemeralStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Escape `%`, `_` and the escape character itself for a LIKE prefix match.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl EphemeralStore for SqliteEphemeralStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(backend)?;

        row.map(|row| row.try_get::<String, _>("value").map_err(backend))
            .transpose()
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO kv_entries (key, value, updated_at)
               VALUES (?, ?, ?)
               ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool.writer)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT key FROM kv_entries WHERE key LIKE ? ESCAPE '\\' ORDER BY key")
            .bind(like_prefix(prefix))
            .fetch_all(&self.pool.reader)
            .await
            .map_err(backend)?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in &rows {
            let key: String = row.try_get("key").map_err(backend)?;
            // LIKE is case-insensitive for ASCII; keep the match exact.
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    async fn touch_activity(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO activity_index (id, last_activity_us)
               VALUES (?, ?)
               ON CONFLICT (id) DO UPDATE SET last_activity_us = excluded.last_activity_us"#,
        )
        .bind(id)
        .bind(at.timestamp_micros())
        .execute(&self.pool.writer)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn clear_activity(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM activity_index WHERE id = ?")
            .bind(id)
            .execute(&self.pool.writer)
            .await
            .map_err(backend)?;

        Ok(())
    }

    async fn idle_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            "SELECT id FROM activity_index WHERE last_activity_us < ? ORDER BY last_activity_us",
        )
        .bind(cutoff.timestamp_micros())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(backend)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("id").map_err(backend))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::database_url;
    use chrono::Duration;
    use parley_core::session::SessionStore;
    use parley_types::config::EphemeralStoreConfig;
    use parley_types::session::{CorrespondentInfo, SessionDocument, TranscriptEntry};

    async fn test_store() -> SqliteEphemeralStore {
        let dir = tempfile::tempdir().unwrap();
        let url = database_url(dir.path(), "ephemeral.db");
        std::mem::forget(dir);
        let pool = DatabasePool::ephemeral(&url, &EphemeralStoreConfig::default())
            .await
            .unwrap();
        SqliteEphemeralStore::new(pool)
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let store = test_store().await;
        store.set("session:1", r#"{"a":1}"#).await.unwrap();
        assert_eq!(
            store.get("session:1").await.unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );
        assert!(store.get("session:2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_upserts() {
        let store = test_store().await;
        store.set("k", "1").await.unwrap();
        store.set("k", "2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_delete_reports_removal() {
        let store = test_store().await;
        store.set("k", "v").await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_with_prefix_is_exact() {
        let store = test_store().await;
        store.set("session:b", "1").await.unwrap();
        store.set("session:a", "1").await.unwrap();
        store.set("SESSION:c", "1").await.unwrap();
        store.set("sessionXd", "1").await.unwrap();
        store.set("interests:a", "1").await.unwrap();

        let keys = store.keys_with_prefix("session:").await.unwrap();
        assert_eq!(keys, vec!["session:a", "session:b"]);
    }

    #[tokio::test]
    async fn test_prefix_wildcards_are_literal() {
        let store = test_store().await;
        store.set("a_b", "1").await.unwrap();
        store.set("axb", "1").await.unwrap();
        assert_eq!(store.keys_with_prefix("a_").await.unwrap(), vec!["a_b"]);
    }

    #[tokio::test]
    async fn test_activity_index() {
        let store = test_store().await;
        let now = Utc::now();
        store.touch_activity("old", now - Duration::hours(2)).await.unwrap();
        store.touch_activity("new", now).await.unwrap();

        let cutoff = now - Duration::hours(1);
        assert_eq!(store.idle_since(cutoff).await.unwrap(), vec!["old"]);

        store.touch_activity("old", now).await.unwrap();
        assert!(store.idle_since(cutoff).await.unwrap().is_empty());

        store.clear_activity("old").await.unwrap();
        assert_eq!(
            store.idle_since(now + Duration::seconds(1)).await.unwrap(),
            vec!["new"]
        );
    }

    #[tokio::test]
    async fn test_session_store_over_sqlite() {
        let sessions = SessionStore::new(test_store().await);
        let at = Utc::now() - Duration::hours(2);
        let doc = SessionDocument::start(
            CorrespondentInfo {
                id: "5491100000000".to_string(),
                display_name: "Ana".to_string(),
            },
            "thread_1".to_string(),
            "thread_2".to_string(),
            TranscriptEntry::incoming("hola", "Ana", at),
        );
        sessions.create(&doc).await.unwrap();
        sessions
            .append_message(
                "5491100000000",
                TranscriptEntry::outgoing("buenas", "assistant", at + Duration::seconds(3)),
            )
            .await
            .unwrap();

        let stored = sessions.exists("5491100000000").await.unwrap().unwrap();
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.last_activity_at, at + Duration::seconds(3));
        assert_eq!(
            sessions.idle_candidates(Utc::now()).await.unwrap(),
            vec!["5491100000000"]
        );
        assert_eq!(sessions.list_ids().await.unwrap(), vec!["5491100000000"]);

        sessions.delete("5491100000000").await.unwrap();
        assert!(sessions.idle_candidates(Utc::now()).await.unwrap().is_empty());
    }
}
