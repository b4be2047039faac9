//! MessageSender trait definition.

use parley_types::error::CollaboratorError;
use parley_types::outbound::OutboundPayload;

/// Outbound delivery to a correspondent through the messaging provider.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait MessageSender: Send + Sync {
    fn send(
        &self,
        recipient: &str,
        payload: &OutboundPayload,
    ) -> impl std::future::Future<Output = Result<(), CollaboratorError>> + Send;
}
