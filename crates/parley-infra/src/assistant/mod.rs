//! HTTP client for the remote assistant service.

pub mod client;
pub mod types;

pub use client::HttpAssistantClient;
