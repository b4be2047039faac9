//! SQLite interest catalog repository.
//!
//! Implements `CatalogRepository` from `parley-core`. Replacement is
//! all-or-nothing: the table is cleared and refilled in one transaction.

use chrono::Utc;
use sqlx::Row;

use parley_core::repository::catalog::CatalogRepository;
use parley_types::catalog::CatalogEntry;
use parley_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `CatalogRepository`.
#[derive(Clone)]
pub struct SqliteCatalogRepository {
    pool: DatabasePool,
}

impl SqliteCatalogRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl CatalogRepository for SqliteCatalogRepository {
    async fn list_entries(&self) -> Result<Vec<CatalogEntry>, RepositoryError> {
        let rows = sqlx::query("SELECT code, description FROM interest_catalog ORDER BY code")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let code: String = row
                .try_get("code")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let description: String = row
                .try_get("description")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            entries.push(CatalogEntry { code, description });
        }

        Ok(entries)
    }

    async fn replace_entries(&self, entries: &[CatalogEntry]) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query("DELETE FROM interest_catalog")
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        for entry in entries {
            sqlx::query("INSERT INTO interest_catalog (code, description, created_at) VALUES (?, ?, ?)")
                .bind(&entry.code)
                .bind(&entry.description)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if let sqlx::Error::Database(ref db_err) = e {
                        if db_err.message().contains("UNIQUE") {
                            return RepositoryError::Conflict(format!(
                                "duplicate catalog code '{}'",
                                entry.code
                            ));
                        }
                    }
                    RepositoryError::Query(e.to_string())
                })?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}
