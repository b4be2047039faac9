//! Periodic migration of idle sessions to durable storage.

pub mod inactivity;

pub use inactivity::{ArchiveHook, InactivitySweeper, SweepReport};
