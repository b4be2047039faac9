//! Durable archive types produced by session migration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interest::InterestRecord;
use crate::session::{SessionDocument, SessionState, TranscriptEntry};

/// Everything the sweeper writes to durable storage for one session.
///
/// Built from the ephemeral documents just before migration; the archive
/// repository writes it in a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveBundle {
    pub correspondent_id: String,
    pub display_name: String,
    pub conversation_thread_id: String,
    pub analysis_thread_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
    pub messages: Vec<TranscriptEntry>,
    pub interests: Vec<String>,
}

impl ArchiveBundle {
    pub fn from_documents(
        session: &SessionDocument,
        interests: Option<&InterestRecord>,
        archived_at: DateTime<Utc>,
    ) -> Self {
        Self {
            correspondent_id: session.user_info.id.clone(),
            display_name: session.user_info.display_name.clone(),
            conversation_thread_id: session.conversation_thread_id.clone(),
            analysis_thread_id: session.analysis_thread_id.clone(),
            started_at: session.started_at,
            ended_at: session.last_activity_at,
            archived_at,
            messages: session.messages.clone(),
            interests: interests.map(|r| r.interests.clone()).unwrap_or_default(),
        }
    }
}

/// Result of a committed archive write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveReceipt {
    pub thread_id: Uuid,
    /// False when the thread already existed (a retried migration).
    pub thread_created: bool,
    pub messages_written: u64,
    pub interests_written: u64,
}

/// A thread row read back from durable storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedThread {
    pub id: Uuid,
    pub correspondent_id: String,
    pub conversation_thread_id: String,
    pub analysis_thread_id: String,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
    pub message_count: u64,
    pub interest_count: u64,
}
