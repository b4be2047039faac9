//! Typed session store over an `EphemeralStore`.
//!
//! Encodes and decodes the versioned session and interest documents, keeps
//! the activity index in step with session writes, and exposes the
//! read-modify-write operations used by the orchestrator and the sweeper.
//! Callers serialize operations on one correspondent with `KeyedLocks`.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use parley_types::error::StoreError;
use parley_types::interest::InterestRecord;
use parley_types::session::{
    SESSION_KEY_PREFIX, SessionDocument, TranscriptEntry, VersionedDocument,
    correspondent_from_key, decode_document, encode_document, interests_key, session_key,
};

use super::store::EphemeralStore;

/// Result of `rebuild_activity_index`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexRebuild {
    pub indexed: usize,
    pub malformed: usize,
}

/// Result of `merge_interests`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterestMerge {
    /// Interests that were not already recorded.
    pub added: usize,
    /// The stored record was unreadable and has been overwritten.
    pub replaced_malformed: bool,
}

pub struct SessionStore<E> {
    store: E,
}

impl<E: EphemeralStore> SessionStore<E> {
    pub fn new(store: E) -> Self {
        Self { store }
    }

    /// The underlying raw store.
    pub fn raw(&self) -> &E {
        &self.store
    }

    async fn read<T: VersionedDocument>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key).await? {
            Some(raw) => decode_document(&raw)
                .map(Some)
                .map_err(|e| StoreError::malformed(key, e)),
            None => Ok(None),
        }
    }

    async fn write<T: VersionedDocument>(&self, key: &str, doc: &T) -> Result<(), StoreError> {
        let raw = encode_document(doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(key, &raw).await
    }

    /// Existence check and fetch in a single read.
    pub async fn exists(&self, correspondent_id: &str) -> Result<Option<SessionDocument>, StoreError> {
        self.read(&session_key(correspondent_id)).await
    }

    pub async fn get(&self, correspondent_id: &str) -> Result<Option<SessionDocument>, StoreError> {
        self.exists(correspondent_id).await
    }

    /// Write a new session unconditionally and index its activity.
    pub async fn create(&self, doc: &SessionDocument) -> Result<(), StoreError> {
        let id = doc.correspondent_id();
        self.write(&session_key(id), doc).await?;
        self.store.touch_activity(id, doc.last_activity_at).await?;
        debug!(correspondent = %id, "Session created");
        Ok(())
    }

    /// Append one transcript entry. Returns `None` if the session does not exist.
    pub async fn append_message(
        &self,
        correspondent_id: &str,
        entry: TranscriptEntry,
    ) -> Result<Option<SessionDocument>, StoreError> {
        let key = session_key(correspondent_id);
        let Some(mut doc) = self.read::<SessionDocument>(&key).await? else {
            return Ok(None);
        };
        doc.append(entry);
        self.write(&key, &doc).await?;
        self.store
            .touch_activity(correspondent_id, doc.last_activity_at)
            .await?;
        Ok(Some(doc))
    }

    /// Remove a session and its activity index entry.
    pub async fn delete(&self, correspondent_id: &str) -> Result<bool, StoreError> {
        let removed = self.store.delete(&session_key(correspondent_id)).await?;
        self.store.clear_activity(correspondent_id).await?;
        Ok(removed)
    }

    /// Correspondent ids of every stored session.
    pub async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self
            .store
            .keys_with_prefix(SESSION_KEY_PREFIX)
            .await?
            .iter()
            .filter_map(|key| correspondent_from_key(key).map(str::to_string))
            .collect();
        ids.sort();
        Ok(ids)
    }

    pub async fn get_interests(
        &self,
        analysis_thread_id: &str,
    ) -> Result<Option<InterestRecord>, StoreError> {
        self.read(&interests_key(analysis_thread_id)).await
    }

    /// Union a validated batch into the interest record of `analysis_thread_id`.
    ///
    /// Creates the record on first non-empty batch. An empty batch never
    /// writes. A stored record that fails to decode is replaced by one built
    /// from this batch alone.
    pub async fn merge_interests(
        &self,
        analysis_thread_id: &str,
        conversation_thread_id: &str,
        batch: &[String],
        now: DateTime<Utc>,
    ) -> Result<InterestMerge, StoreError> {
        if batch.is_empty() {
            return Ok(InterestMerge::default());
        }
        let key = interests_key(analysis_thread_id);
        let (existing, replaced_malformed) = match self.read::<InterestRecord>(&key).await {
            Ok(record) => (record, false),
            Err(StoreError::Malformed { key, reason }) => {
                warn!(key = %key, reason = %reason, "Replacing malformed interest record");
                (None, true)
            }
            Err(e) => return Err(e),
        };
        let added = match existing {
            Some(mut record) => {
                let added = record.merge(batch, now);
                self.write(&key, &record).await?;
                added
            }
            None => match InterestRecord::from_batch(
                analysis_thread_id,
                conversation_thread_id,
                batch,
                now,
            ) {
                Some(record) => {
                    self.write(&key, &record).await?;
                    record.interests.len()
                }
                None => 0,
            },
        };
        Ok(InterestMerge {
            added,
            replaced_malformed,
        })
    }

    pub async fn delete_interests(&self, analysis_thread_id: &str) -> Result<bool, StoreError> {
        self.store.delete(&interests_key(analysis_thread_id)).await
    }

    /// Correspondents whose indexed activity is strictly before `cutoff`.
    pub async fn idle_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        self.store.idle_since(cutoff).await
    }

    pub async fn touch(&self, correspondent_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.store.touch_activity(correspondent_id, at).await
    }

    pub async fn clear_activity(&self, correspondent_id: &str) -> Result<(), StoreError> {
        self.store.clear_activity(correspondent_id).await
    }

    /// Scan every session document once and index its last activity.
    ///
    /// Picks up documents written before the index existed or by another
    /// process. Malformed documents are counted and left as they are.
    pub async fn rebuild_activity_index(&self) -> Result<IndexRebuild, StoreError> {
        let mut report = IndexRebuild::default();
        for id in self.list_ids().await? {
            match self.get(&id).await {
                Ok(Some(doc)) => {
                    self.store.touch_activity(&id, doc.last_activity_at).await?;
                    report.indexed += 1;
                }
                Ok(None) => {}
                Err(StoreError::Malformed { key, reason }) => {
                    warn!(key = %key, reason = %reason, "Skipping malformed session while indexing");
                    report.malformed += 1;
                }
                Err(e) => return Err(e),
            }
        }
        debug!(
            indexed = report.indexed,
            malformed = report.malformed,
            "Activity index rebuilt"
        );
        Ok(report)
    }
}
