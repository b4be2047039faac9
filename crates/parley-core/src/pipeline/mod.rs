//! Per-message interaction workflow.

pub mod orchestrator;

pub use orchestrator::{InboundMessage, InteractionOrchestrator, InteractionOutcome};
