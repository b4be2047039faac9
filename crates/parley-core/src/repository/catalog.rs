//! Catalog repository trait definition.

use parley_types::catalog::CatalogEntry;
use parley_types::error::RepositoryError;

/// Durable source of the interest reference catalog.
pub trait CatalogRepository: Send + Sync {
    /// Fetch every catalog entry, ordered by code.
    fn list_entries(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<CatalogEntry>, RepositoryError>> + Send;

    /// Replace the whole catalog atomically (delete all, insert all, one transaction).
    fn replace_entries(
        &self,
        entries: &[CatalogEntry],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
