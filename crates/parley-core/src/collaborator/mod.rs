//! Remote collaborator ports.
//!
//! - `AssistantClient`: conversation/analysis contexts, interest analysis and
//!   reply generation
//! - `MessageSender`: outbound delivery to the correspondent
//!
//! HTTP implementations live in parley-infra.

pub mod assistant;
pub mod delivery;

pub use assistant::AssistantClient;
pub use delivery::MessageSender;
