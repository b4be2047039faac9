//! Outbound message payloads handed to the delivery collaborator.

use serde::{Deserialize, Serialize};

/// A message to deliver to a correspondent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundPayload {
    /// Plain text reply.
    Text { body: String },
    /// A question with quick-reply options.
    Interactive { body: String, options: Vec<String> },
}

impl OutboundPayload {
    pub fn body(&self) -> &str {
        match self {
            OutboundPayload::Text { body } | OutboundPayload::Interactive { body, .. } => body,
        }
    }
}
