//! InteractionOrchestrator: one inbound message from receipt to reply.
//!
//! Flow, all under the correspondent's key lock:
//! 1. Fetch the session; create contexts and a new session if absent,
//!    otherwise append the inbound entry.
//! 2. Analyze the text, validate the result against the catalog and merge the
//!    accepted interests.
//! 3. Generate the reply, append it to the transcript, then deliver the reply
//!    and the optional follow-up question.
//!
//! Any collaborator failure aborts the message. There is no retry here.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use parley_types::assistant::GeneratedReply;
use parley_types::config::PipelineConfig;
use parley_types::error::{CollaboratorError, PipelineError};
use parley_types::outbound::OutboundPayload;
use parley_types::session::{CorrespondentInfo, SessionDocument, TranscriptEntry};

use crate::catalog::ReferenceCatalog;
use crate::collaborator::{AssistantClient, MessageSender};
use crate::interest::InterestValidator;
use crate::metrics::PipelineCounters;
use crate::session::{EphemeralStore, KeyedLocks, SessionStore};

/// An inbound text message from a correspondent.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub correspondent_id: String,
    pub display_name: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(
        correspondent_id: impl Into<String>,
        display_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            correspondent_id: correspondent_id.into(),
            display_name: display_name.into(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// What happened to an inbound message that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionOutcome {
    /// Blank text; nothing was stored or sent.
    Ignored,
    Replied {
        created_session: bool,
        interests_added: usize,
        follow_up_sent: bool,
    },
}

pub struct InteractionOrchestrator<E, A, S> {
    sessions: Arc<SessionStore<E>>,
    catalog: Arc<ReferenceCatalog>,
    assistant: A,
    sender: S,
    locks: KeyedLocks,
    counters: Arc<PipelineCounters>,
    config: PipelineConfig,
}

impl<E, A, S> InteractionOrchestrator<E, A, S>
where
    E: EphemeralStore,
    A: AssistantClient,
    S: MessageSender,
{
    pub fn new(
        sessions: Arc<SessionStore<E>>,
        catalog: Arc<ReferenceCatalog>,
        assistant: A,
        sender: S,
        locks: KeyedLocks,
        counters: Arc<PipelineCounters>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            sessions,
            catalog,
            assistant,
            sender,
            locks,
            counters,
            config,
        }
    }

    /// Process one inbound message.
    ///
    /// Messages from the same correspondent are handled strictly one at a
    /// time. If `cancel` fires, the in-flight collaborator call is abandoned
    /// and no further store write is issued.
    #[tracing::instrument(skip_all, fields(correspondent = %message.correspondent_id))]
    pub async fn handle(
        &self,
        message: InboundMessage,
        cancel: &CancellationToken,
    ) -> Result<InteractionOutcome, PipelineError> {
        let text = message.text.trim();
        if text.is_empty() {
            debug!("Ignoring blank inbound message");
            return Ok(InteractionOutcome::Ignored);
        }
        let id = message.correspondent_id.as_str();
        let _guard = self.locks.lock(id).await;

        let inbound = TranscriptEntry::incoming(text, &message.display_name, message.received_at);
        let (session, created_session) = match self.sessions.exists(id).await? {
            Some(_) => {
                ensure_live(cancel)?;
                let session = self
                    .sessions
                    .append_message(id, inbound)
                    .await?
                    .ok_or_else(|| PipelineError::SessionMissing(id.to_string()))?;
                self.counters.message_appended();
                (session, false)
            }
            None => {
                let conversation =
                    collaborate(cancel, self.assistant.create_conversation_context()).await?;
                let analysis = collaborate(cancel, self.assistant.create_analysis_context()).await?;
                ensure_live(cancel)?;
                let session = SessionDocument::start(
                    CorrespondentInfo {
                        id: id.to_string(),
                        display_name: message.display_name.clone(),
                    },
                    conversation,
                    analysis,
                    inbound,
                );
                self.sessions.create(&session).await?;
                self.counters.session_created();
                info!(
                    conversation_thread = %session.conversation_thread_id,
                    analysis_thread = %session.analysis_thread_id,
                    "Session started"
                );
                (session, true)
            }
        };

        let raw = collaborate(cancel, self.assistant.analyze(&session.analysis_thread_id, text)).await?;
        let outcome = InterestValidator::validate(&raw, &self.catalog.snapshot());
        self.counters
            .record_validation(outcome.accepted.len(), outcome.malformed, outcome.unmatched);
        let interests_added = if outcome.is_empty() {
            0
        } else {
            ensure_live(cancel)?;
            let merge = self
                .sessions
                .merge_interests(
                    &session.analysis_thread_id,
                    &session.conversation_thread_id,
                    &outcome.accepted,
                    Utc::now(),
                )
                .await?;
            if merge.replaced_malformed {
                self.counters.document_malformed();
            }
            merge.added
        };

        let mut reply = collaborate(
            cancel,
            self.assistant
                .generate(&session.conversation_thread_id, id, text),
        )
        .await?;
        if reply.reply.trim().is_empty() {
            debug!("Empty generated reply; using fallback");
            reply.reply = self.config.fallback_reply.clone();
        }

        ensure_live(cancel)?;
        let outgoing = TranscriptEntry::outgoing(&reply.reply, &self.config.assistant_name, Utc::now());
        self.sessions
            .append_message(id, outgoing)
            .await?
            .ok_or_else(|| PipelineError::SessionMissing(id.to_string()))?;
        self.counters.message_appended();

        let follow_up_sent = self.deliver(id, reply).await?;

        Ok(InteractionOutcome::Replied {
            created_session,
            interests_added,
            follow_up_sent,
        })
    }

    /// Send the reply, then the follow-up question if there is one.
    async fn deliver(&self, recipient: &str, reply: GeneratedReply) -> Result<bool, PipelineError> {
        self.sender
            .send(recipient, &OutboundPayload::Text { body: reply.reply })
            .await
            .map_err(PipelineError::Delivery)?;

        let Some(follow_up) = reply.follow_up else {
            return Ok(false);
        };
        self.sender
            .send(
                recipient,
                &OutboundPayload::Interactive {
                    body: follow_up,
                    options: reply.options,
                },
            )
            .await
            .map_err(PipelineError::Delivery)?;
        Ok(true)
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}

/// Race a collaborator call against cancellation.
async fn collaborate<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T, CollaboratorError>>,
) -> Result<T, PipelineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        result = call => result.map_err(PipelineError::Collaborator),
    }
}
