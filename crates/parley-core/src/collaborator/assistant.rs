//! AssistantClient trait definition.

use parley_types::assistant::GeneratedReply;
use parley_types::error::CollaboratorError;

/// The remote assistant service.
///
/// Context ids are opaque strings owned by the service. The analysis context
/// is separate from the conversation context so interest extraction never
/// leaks into the reply history.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait AssistantClient: Send + Sync {
    /// Open a new conversation context and return its id.
    fn create_conversation_context(
        &self,
    ) -> impl std::future::Future<Output = Result<String, CollaboratorError>> + Send;

    /// Open a new analysis context and return its id.
    fn create_analysis_context(
        &self,
    ) -> impl std::future::Future<Output = Result<String, CollaboratorError>> + Send;

    /// Run interest analysis on one inbound text. Returns raw, unvalidated lines.
    fn analyze(
        &self,
        analysis_thread_id: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<String, CollaboratorError>> + Send;

    /// Generate the reply to one inbound text.
    fn generate(
        &self,
        conversation_thread_id: &str,
        correspondent_id: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<GeneratedReply, CollaboratorError>> + Send;
}
