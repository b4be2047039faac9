//! Runtime selection of the ephemeral store backend.
//!
//! `EphemeralStore` uses native async trait methods and is not object safe,
//! so the configured backend is wrapped in an enum that forwards each call.

use chrono::{DateTime, Utc};

use parley_core::session::{EphemeralStore, MemoryEphemeralStore};
use parley_types::config::{EphemeralBackend, EphemeralStoreConfig};
use parley_types::error::StoreError;

use crate::sqlite::ephemeral::SqliteEphemeralStore;
use crate::sqlite::pool::DatabasePool;

/// The ephemeral store chosen by `ephemeral.backend`.
#[derive(Clone)]
pub enum AnyEphemeralStore {
    Sqlite(SqliteEphemeralStore),
    Memory(MemoryEphemeralStore),
}

impl AnyEphemeralStore {
    /// Open the configured backend. The SQLite variant opens its own pool at
    /// `sqlite_url`; the returned pool must be closed on shutdown.
    pub async fn open(
        config: &EphemeralStoreConfig,
        sqlite_url: &str,
    ) -> Result<(Self, Option<DatabasePool>), sqlx::Error> {
        match config.backend {
            EphemeralBackend::Sqlite => {
                let pool = DatabasePool::ephemeral(sqlite_url, config).await?;
                Ok((Self::Sqlite(SqliteEphemeralStore::new(pool.clone())), Some(pool)))
            }
            EphemeralBackend::Memory => Ok((Self::Memory(MemoryEphemeralStore::new()), None)),
        }
    }

    pub fn backend(&self) -> EphemeralBackend {
        match self {
            Self::Sqlite(_) => EphemeralBackend::Sqlite,
            Self::Memory(_) => EphemeralBackend::Memory,
        }
    }
}

impl EphemeralStore for AnyEphemeralStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Self::Sqlite(store) => store.get(key).await,
            Self::Memory(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match self {
            Self::Sqlite(store) => store.set(key, value).await,
            Self::Memory(store) => store.set(key, value).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        match self {
            Self::Sqlite(store) => store.delete(key).await,
            Self::Memory(store) => store.delete(key).await,
        }
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Sqlite(store) => store.keys_with_prefix(prefix).await,
            Self::Memory(store) => store.keys_with_prefix(prefix).await,
        }
    }

    async fn touch_activity(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        match self {
            Self::Sqlite(store) => store.touch_activity(id, at).await,
            Self::Memory(store) => store.touch_activity(id, at).await,
        }
    }

    async fn clear_activity(&self, id: &str) -> Result<(), StoreError> {
        match self {
            Self::Sqlite(store) => store.clear_activity(id).await,
            Self::Memory(store) => store.clear_activity(id).await,
        }
    }

    async fn idle_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Sqlite(store) => store.idle_since(cutoff).await,
            Self::Memory(store) => store.idle_since(cutoff).await,
        }
    }
}
