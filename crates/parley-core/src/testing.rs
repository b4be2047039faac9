//! Hand-written collaborator doubles shared by the pipeline and sweeper tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use parley_types::archive::{ArchiveBundle, ArchiveReceipt, ArchivedThread};
use parley_types::assistant::GeneratedReply;
use parley_types::error::{CollaboratorError, RepositoryError};
use parley_types::outbound::OutboundPayload;
use parley_types::session::{CorrespondentInfo, SessionDocument, SessionState, TranscriptEntry};

use crate::collaborator::{AssistantClient, MessageSender};
use crate::repository::archive::ArchiveRepository;

pub(crate) fn session(id: &str, last_activity: DateTime<Utc>) -> SessionDocument {
    SessionDocument::start(
        CorrespondentInfo {
            id: id.to_string(),
            display_name: format!("name-{id}"),
        },
        format!("conv-{id}"),
        format!("an-{id}"),
        TranscriptEntry::incoming("hola", format!("name-{id}"), last_activity),
    )
}

pub(crate) struct MockAssistant {
    next_id: AtomicU64,
    pub analysis: Mutex<String>,
    pub reply: Mutex<String>,
    pub fail_analyze: AtomicBool,
    pub fail_generate: AtomicBool,
    pub hang_generate: AtomicBool,
    pub contexts_created: AtomicU64,
}

impl MockAssistant {
    pub fn new(analysis: &str, reply: &str) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            analysis: Mutex::new(analysis.to_string()),
            reply: Mutex::new(reply.to_string()),
            fail_analyze: AtomicBool::new(false),
            fail_generate: AtomicBool::new(false),
            hang_generate: AtomicBool::new(false),
            contexts_created: AtomicU64::new(0),
        }
    }

    fn next(&self, prefix: &str) -> String {
        self.contexts_created.fetch_add(1, Ordering::SeqCst);
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl AssistantClient for MockAssistant {
    async fn create_conversation_context(&self) -> Result<String, CollaboratorError> {
        Ok(self.next("thread"))
    }

    async fn create_analysis_context(&self) -> Result<String, CollaboratorError> {
        Ok(self.next("analysis"))
    }

    async fn analyze(&self, _analysis: &str, _text: &str) -> Result<String, CollaboratorError> {
        if self.fail_analyze.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Transport("connection refused".into()));
        }
        Ok(self.analysis.lock().unwrap().clone())
    }

    async fn generate(
        &self,
        _conversation: &str,
        _correspondent: &str,
        _text: &str,
    ) -> Result<GeneratedReply, CollaboratorError> {
        if self.hang_generate.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_generate.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(GeneratedReply::parse(&self.reply.lock().unwrap()))
    }
}

#[derive(Default)]
pub(crate) struct MockSender {
    pub sent: Mutex<Vec<(String, OutboundPayload)>>,
    pub fail: AtomicBool,
}

impl MessageSender for MockSender {
    async fn send(&self, recipient: &str, payload: &OutboundPayload) -> Result<(), CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Transport("timeout".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), payload.clone()));
        Ok(())
    }
}

/// In-memory archive keyed on `(correspondent_id, started_at)`, like the
/// natural key of the durable threads table.
#[derive(Default)]
pub(crate) struct MockArchiveRepo {
    pub threads: Mutex<Vec<(Uuid, ArchiveBundle)>>,
    pub fail_for: Mutex<HashSet<String>>,
}

impl MockArchiveRepo {
    pub fn bundles_for(&self, correspondent_id: &str) -> Vec<ArchiveBundle> {
        self.threads
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, b)| b.correspondent_id == correspondent_id)
            .map(|(_, b)| b.clone())
            .collect()
    }
}

impl ArchiveRepository for MockArchiveRepo {
    async fn archive_session(&self, bundle: &ArchiveBundle) -> Result<ArchiveReceipt, RepositoryError> {
        if self.fail_for.lock().unwrap().contains(&bundle.correspondent_id) {
            return Err(RepositoryError::Query("disk I/O error".into()));
        }
        let mut threads = self.threads.lock().unwrap();
        if let Some((id, _)) = threads.iter().find(|(_, b)| {
            b.correspondent_id == bundle.correspondent_id && b.started_at == bundle.started_at
        }) {
            return Ok(ArchiveReceipt {
                thread_id: *id,
                thread_created: false,
                messages_written: 0,
                interests_written: 0,
            });
        }
        let id = Uuid::now_v7();
        threads.push((id, bundle.clone()));
        Ok(ArchiveReceipt {
            thread_id: id,
            thread_created: true,
            messages_written: bundle.messages.len() as u64,
            interests_written: bundle.interests.len() as u64,
        })
    }

    async fn list_threads_for(&self, correspondent_id: &str) -> Result<Vec<ArchivedThread>, RepositoryError> {
        Ok(self
            .threads
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, b)| b.correspondent_id == correspondent_id)
            .map(|(id, b)| ArchivedThread {
                id: *id,
                correspondent_id: b.correspondent_id.clone(),
                conversation_thread_id: b.conversation_thread_id.clone(),
                analysis_thread_id: b.analysis_thread_id.clone(),
                state: SessionState::Archived,
                started_at: b.started_at,
                ended_at: b.ended_at,
                archived_at: b.archived_at,
                message_count: b.messages.len() as u64,
                interest_count: b.interests.len() as u64,
            })
            .collect())
    }

    async fn count_threads(&self) -> Result<u64, RepositoryError> {
        Ok(self.threads.lock().unwrap().len() as u64)
    }
}
