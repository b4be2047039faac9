//! Ephemeral store port.
//!
//! Raw string key/value operations plus a secondary activity index mapping a
//! correspondent id to its last activity time. The typed `SessionStore` is
//! built on top of this trait; implementations live in this crate
//! (`MemoryEphemeralStore`) and in parley-infra (SQLite).

use chrono::{DateTime, Utc};

use parley_types::error::StoreError;

/// Key/value storage for short-lived session documents.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait EphemeralStore: Send + Sync {
    /// Get the raw value at `key`. Returns `None` if absent.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Set the value at `key` (upsert).
    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete `key`. Returns whether anything was removed.
    fn delete(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// All keys starting with `prefix`, in no particular order.
    fn keys_with_prefix(
        &self,
        prefix: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Record `at` as the last activity of `id` in the activity index.
    fn touch_activity(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Remove `id` from the activity index. No-op if not indexed.
    fn clear_activity(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Ids whose indexed last activity is strictly before `cutoff`.
    fn idle_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<String>, StoreError>> + Send;
}
