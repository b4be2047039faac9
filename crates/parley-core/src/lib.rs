//! Business logic and port trait definitions for Parley.
//!
//! This crate defines the "ports" (repository, ephemeral store and
//! collaborator traits) that the infrastructure layer implements, plus the
//! services built on them: the reference catalog, interest validation, the
//! session store, the interaction orchestrator and the inactivity sweeper.
//! It depends only on `parley-types` -- never on `parley-infra` or any
//! database/IO crate.

pub mod catalog;
pub mod collaborator;
pub mod interest;
pub mod metrics;
pub mod pipeline;
pub mod repository;
pub mod session;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod testing;
