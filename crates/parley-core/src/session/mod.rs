//! Active-session storage.
//!
//! - `EphemeralStore`: raw key/value port with an activity index
//! - `SessionStore`: typed session and interest documents on top of it
//! - `KeyedLocks`: per-correspondent serialization of read-modify-write
//! - `MemoryEphemeralStore`: in-process backend

pub mod locks;
pub mod memory;
pub mod service;
pub mod store;

pub use locks::KeyedLocks;
pub use memory::MemoryEphemeralStore;
pub use service::{IndexRebuild, InterestMerge, SessionStore};
pub use store::EphemeralStore;
