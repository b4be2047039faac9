//! Interest reference catalog.
//!
//! The catalog is the allow-list of `(code, description)` pairs an interest
//! line must match before it is recorded. It is loaded from durable storage
//! and cached in memory for the lifetime of the process.

pub mod cache;

pub use cache::{CatalogSnapshot, ReferenceCatalog};
