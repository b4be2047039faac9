//! SQLite archive repository.
//!
//! Implements `ArchiveRepository` from `parley-core`. One migrated session is
//! written in a single transaction: correspondent upsert, thread, messages,
//! interests. Every insert is keyed on a natural key
//! (`threads(correspondent_id, started_at)`, `messages(thread_id, seq)`,
//! `interests(thread_id, interest)`) with `ON CONFLICT DO NOTHING`, so
//! re-archiving a committed bundle writes nothing new.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use uuid::Uuid;

use parley_core::repository::archive::ArchiveRepository;
use parley_types::archive::{ArchiveBundle, ArchiveReceipt, ArchivedThread};
use parley_types::error::RepositoryError;
use parley_types::session::SessionState;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ArchiveRepository`.
#[derive(Clone)]
pub struct SqliteArchiveRepository {
    pool: DatabasePool,
}

impl SqliteArchiveRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ThreadRow {
    id: String,
    correspondent_id: String,
    conversation_thread_id: String,
    analysis_thread_id: String,
    state: String,
    started_at: String,
    ended_at: String,
    archived_at: String,
    message_count: i64,
    interest_count: i64,
}

impl ThreadRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            correspondent_id: row.try_get("correspondent_id")?,
            conversation_thread_id: row.try_get("conversation_thread_id")?,
            analysis_thread_id: row.try_get("analysis_thread_id")?,
            state: row.try_get("state")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
            archived_at: row.try_get("archived_at")?,
            message_count: row.try_get("message_count")?,
            interest_count: row.try_get("interest_count")?,
        })
    }

    fn into_thread(self) -> Result<ArchivedThread, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid thread id: {e}")))?;
        let state: SessionState = self
            .state
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid thread state: {e}")))?;

        Ok(ArchivedThread {
            id,
            correspondent_id: self.correspondent_id,
            conversation_thread_id: self.conversation_thread_id,
            analysis_thread_id: self.analysis_thread_id,
            state,
            started_at: parse_datetime(&self.started_at)?,
            ended_at: parse_datetime(&self.ended_at)?,
            archived_at: parse_datetime(&self.archived_at)?,
            message_count: self.message_count.max(0) as u64,
            interest_count: self.interest_count.max(0) as u64,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 so stored timestamps sort as text and a given
/// instant always formats to the same natural key.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

// ---------------------------------------------------------------------------
// ArchiveRepository implementation
// ---------------------------------------------------------------------------

impl ArchiveRepository for SqliteArchiveRepository {
    async fn archive_session(&self, bundle: &ArchiveBundle) -> Result<ArchiveReceipt, RepositoryError> {
        let archived_at = format_datetime(&bundle.archived_at);
        let started_at = format_datetime(&bundle.started_at);

        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        sqlx::query(
            r#"INSERT INTO correspondents (id, display_name, created_at, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (id) DO UPDATE SET display_name = excluded.display_name, updated_at = excluded.updated_at"#,
        )
        .bind(&bundle.correspondent_id)
        .bind(&bundle.display_name)
        .bind(&archived_at)
        .bind(&archived_at)
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        let inserted = sqlx::query(
            r#"INSERT INTO threads (id, correspondent_id, conversation_thread_id, analysis_thread_id,
                                    state, started_at, ended_at, archived_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (correspondent_id, started_at) DO NOTHING"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(&bundle.correspondent_id)
        .bind(&bundle.conversation_thread_id)
        .bind(&bundle.analysis_thread_id)
        .bind(SessionState::Archived.to_string())
        .bind(&started_at)
        .bind(format_datetime(&bundle.ended_at))
        .bind(&archived_at)
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        let row = sqlx::query("SELECT id FROM threads WHERE correspondent_id = ? AND started_at = ?")
            .bind(&bundle.correspondent_id)
            .bind(&started_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(query_err)?;
        let thread_id: String = row.try_get("id").map_err(query_err)?;

        let mut messages_written = 0;
        for (seq, entry) in bundle.messages.iter().enumerate() {
            let result = sqlx::query(
                r#"INSERT INTO messages (id, thread_id, seq, text, sender, direction, sent_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?)
                   ON CONFLICT (thread_id, seq) DO NOTHING"#,
            )
            .bind(Uuid::now_v7().to_string())
            .bind(&thread_id)
            .bind(seq as i64)
            .bind(&entry.text)
            .bind(&entry.sender)
            .bind(entry.direction.to_string())
            .bind(format_datetime(&entry.timestamp))
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
            messages_written += result.rows_affected();
        }

        let mut interests_written = 0;
        for interest in &bundle.interests {
            let result = sqlx::query(
                r#"INSERT INTO interests (id, thread_id, interest, state, created_at)
                   VALUES (?, ?, ?, 'active', ?)
                   ON CONFLICT (thread_id, interest) DO NOTHING"#,
            )
            .bind(Uuid::now_v7().to_string())
            .bind(&thread_id)
            .bind(interest)
            .bind(&archived_at)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
            interests_written += result.rows_affected();
        }

        tx.commit().await.map_err(query_err)?;

        let thread_id = Uuid::parse_str(&thread_id)
            .map_err(|e| RepositoryError::Query(format!("invalid thread id: {e}")))?;
        Ok(ArchiveReceipt {
            thread_id,
            thread_created: inserted.rows_affected() > 0,
            messages_written,
            interests_written,
        })
    }

    async fn list_threads_for(&self, correspondent_id: &str) -> Result<Vec<ArchivedThread>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT t.*,
                      (SELECT COUNT(*) FROM messages m WHERE m.thread_id = t.id) AS message_count,
                      (SELECT COUNT(*) FROM interests i WHERE i.thread_id = t.id) AS interest_count
               FROM threads t
               WHERE t.correspondent_id = ?
               ORDER BY t.started_at DESC"#,
        )
        .bind(correspondent_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter()
            .map(|row| ThreadRow::from_row(row).map_err(query_err)?.into_thread())
            .collect()
    }

    async fn count_threads(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM threads")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_err)?;
        Ok(count.max(0) as u64)
    }
}
