//! Process-local ephemeral store backed by `DashMap`.
//!
//! Used by tests and by single-process deployments that can afford to lose
//! active sessions on restart. Values are cloned on read so no `DashMap`
//! guard is ever held across an `.await`.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use parley_types::error::StoreError;

use super::store::EphemeralStore;

#[derive(Debug, Default)]
struct ActivityIndex {
    by_id: HashMap<String, DateTime<Utc>>,
    ordered: BTreeSet<(DateTime<Utc>, String)>,
}

impl ActivityIndex {
    fn touch(&mut self, id: &str, at: DateTime<Utc>) {
        if let Some(prev) = self.by_id.insert(id.to_string(), at) {
            self.ordered.remove(&(prev, id.to_string()));
        }
        self.ordered.insert((at, id.to_string()));
    }

    fn clear(&mut self, id: &str) {
        if let Some(prev) = self.by_id.remove(id) {
            self.ordered.remove(&(prev, id.to_string()));
        }
    }

    fn before(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        self.ordered
            .range(..(cutoff, String::new()))
            .map(|(_, id)| id.clone())
            .collect()
    }
}

/// In-memory `EphemeralStore`.
///
/// Cloning produces a shared view of the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryEphemeralStore {
    entries: Arc<DashMap<String, String>>,
    activity: Arc<Mutex<ActivityIndex>>,
}

impl MemoryEphemeralStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn index(&self) -> std::sync::MutexGuard<'_, ActivityIndex> {
        self.activity.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EphemeralStore for MemoryEphemeralStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|r| r.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .iter()
            .filter(|r| r.key().starts_with(prefix))
            .map(|r| r.key().clone())
            .collect())
    }

    async fn touch_activity(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.index().touch(id, at);
        Ok(())
    }

    async fn clear_activity(&self, id: &str) -> Result<(), StoreError> {
        self.index().clear(id);
        Ok(())
    }

    async fn idle_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        Ok(self.index().before(cutoff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryEphemeralStore::new();
        assert!(store.get("k").await.unwrap().is_none());

        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_keys_with_prefix() {
        let store = MemoryEphemeralStore::new();
        store.set("session:1", "a").await.unwrap();
        store.set("session:2", "b").await.unwrap();
        store.set("interests:x", "c").await.unwrap();

        let mut keys = store.keys_with_prefix("session:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["session:1", "session:2"]);
    }

    #[tokio::test]
    async fn test_idle_since_is_strict_and_tracks_updates() {
        let store = MemoryEphemeralStore::new();
        let now = Utc::now();
        store.touch_activity("old", now - Duration::minutes(90)).await.unwrap();
        store.touch_activity("edge", now - Duration::minutes(60)).await.unwrap();
        store.touch_activity("new", now).await.unwrap();

        let cutoff = now - Duration::minutes(60);
        assert_eq!(store.idle_since(cutoff).await.unwrap(), vec!["old"]);

        store.touch_activity("old", now).await.unwrap();
        assert!(store.idle_since(cutoff).await.unwrap().is_empty());

        store.clear_activity("new").await.unwrap();
        store.clear_activity("missing").await.unwrap();
        let all = store.idle_since(now + Duration::seconds(1)).await.unwrap();
        assert_eq!(all, vec!["edge", "old"]);
    }
}
