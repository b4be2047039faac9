//! Archive repository trait definition.
//!
//! Durable destination of migrated sessions. The infrastructure layer
//! (parley-infra) implements this trait with SQLite persistence.

use parley_types::archive::{ArchiveBundle, ArchiveReceipt, ArchivedThread};
use parley_types::error::RepositoryError;

/// Repository trait for archived correspondents, threads, messages and interests.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ArchiveRepository: Send + Sync {
    /// Write one migrated session in a single transaction.
    ///
    /// Upserts the correspondent, creates the thread, one message row per
    /// transcript entry and one interest row per interest. Must be idempotent:
    /// re-archiving the same bundle after a successful commit writes nothing new
    /// and returns the existing thread id with `thread_created == false`.
    fn archive_session(
        &self,
        bundle: &ArchiveBundle,
    ) -> impl std::future::Future<Output = Result<ArchiveReceipt, RepositoryError>> + Send;

    /// Archived threads of one correspondent, most recent first.
    fn list_threads_for(
        &self,
        correspondent_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ArchivedThread>, RepositoryError>> + Send;

    /// Total number of archived threads.
    fn count_threads(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
