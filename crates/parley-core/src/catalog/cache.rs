//! In-memory reference catalog with atomic snapshot replacement.
//!
//! Readers take an `Arc` to the current `CatalogSnapshot` under a momentary
//! read lock and then work lock-free. Writers build the complete replacement
//! snapshot before taking the write lock, so the lock is only held for the
//! pointer swap and a reader never sees a partially built catalog.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use parley_types::catalog::CatalogEntry;
use parley_types::error::CatalogError;

use crate::repository::catalog::CatalogRepository;

/// An immutable view of the catalog at one point in time.
#[derive(Debug)]
pub struct CatalogSnapshot {
    generation: u64,
    loaded_at: DateTime<Utc>,
    entries: Vec<CatalogEntry>,
    /// code -> descriptions, for exact pair lookup.
    index: HashMap<String, Vec<String>>,
}

impl CatalogSnapshot {
    fn build(entries: Vec<CatalogEntry>) -> Self {
        let mut index: HashMap<String, Vec<String>> = HashMap::with_capacity(entries.len());
        for entry in &entries {
            index
                .entry(entry.code.clone())
                .or_default()
                .push(entry.description.clone());
        }
        Self {
            generation: 0,
            loaded_at: Utc::now(),
            entries,
            index,
        }
    }

    /// Monotonic load counter; 0 is the empty catalog created at startup.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact, case-sensitive `(code, description)` match.
    pub fn contains(&self, code: &str, description: &str) -> bool {
        self.index
            .get(code)
            .is_some_and(|descriptions| descriptions.iter().any(|d| d == description))
    }
}

/// Process-wide cache of the interest reference catalog.
///
/// Replaced wholesale only: there is no per-entry mutation API.
#[derive(Debug)]
pub struct ReferenceCatalog {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl ReferenceCatalog {
    /// Create an empty catalog (generation 0). Every interest is rejected until
    /// the first `load` or `reload`.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::build(Vec::new()))),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Atomically replace the current snapshot with `entries`.
    pub fn load(&self, entries: Vec<CatalogEntry>) -> Arc<CatalogSnapshot> {
        let mut snapshot = CatalogSnapshot::build(entries);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        snapshot.generation = current.generation + 1;
        let snapshot = Arc::new(snapshot);
        *current = Arc::clone(&snapshot);
        snapshot
    }

    /// Re-fetch the catalog from durable storage and load it.
    ///
    /// On fetch failure the previous snapshot stays in effect.
    pub async fn reload<R: CatalogRepository>(
        &self,
        repo: &R,
    ) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let entries = match repo.list_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    error = %e,
                    generation = self.snapshot().generation(),
                    "Catalog reload failed; keeping previous snapshot"
                );
                return Err(CatalogError::Fetch(e));
            }
        };
        let snapshot = self.load(entries);
        info!(
            generation = snapshot.generation(),
            entries = snapshot.len(),
            "Interest catalog loaded"
        );
        Ok(snapshot)
    }

    /// Persist a new catalog and, once committed, load it.
    ///
    /// Duplicate codes are rejected before storage is touched.
    pub async fn replace<R: CatalogRepository>(
        &self,
        repo: &R,
        entries: Vec<CatalogEntry>,
    ) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.code.as_str()) {
                return Err(CatalogError::DuplicateCode(entry.code.clone()));
            }
        }
        repo.replace_entries(&entries).await?;
        let snapshot = self.load(entries);
        info!(
            generation = snapshot.generation(),
            entries = snapshot.len(),
            "Interest catalog replaced"
        );
        Ok(snapshot)
    }
}

impl Default for ReferenceCatalog {
    fn default() -> Self {
        Self::new()
    }
}
