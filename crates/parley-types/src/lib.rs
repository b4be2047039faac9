//! Shared domain types for Parley.
//!
//! This crate contains the domain types used across the Parley service:
//! ephemeral session and interest documents, catalog entries, archive
//! bundles, collaborator payloads, configuration, and error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod archive;
pub mod assistant;
pub mod catalog;
pub mod config;
pub mod error;
pub mod interest;
pub mod outbound;
pub mod session;
