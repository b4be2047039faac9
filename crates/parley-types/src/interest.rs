//! Interest records kept alongside an active session.
//!
//! Stored under `interests:<analysis_thread_id>`. The `interests` list behaves
//! as an insertion-ordered set: merging never introduces duplicates and never
//! reorders entries already present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{SCHEMA_VERSION, VersionedDocument, legacy_schema_version};

/// Validated interests extracted for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestRecord {
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
    #[serde(rename = "thread_analizer")]
    pub analysis_thread_id: String,
    /// Back-reference to the owning session's conversation thread.
    #[serde(rename = "thread")]
    pub conversation_thread_id: String,
    pub interests: Vec<String>,
    #[serde(rename = "start_timestamp")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "last_activity")]
    pub last_activity_at: DateTime<Utc>,
}

impl InterestRecord {
    /// Build a new record from a validated batch.
    ///
    /// Returns `None` for an empty batch so no placeholder document is ever written.
    pub fn from_batch(
        analysis_thread_id: &str,
        conversation_thread_id: &str,
        batch: &[String],
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let mut interests = Vec::with_capacity(batch.len());
        union_into(&mut interests, batch);
        if interests.is_empty() {
            return None;
        }
        Some(Self {
            schema_version: SCHEMA_VERSION,
            analysis_thread_id: analysis_thread_id.to_string(),
            conversation_thread_id: conversation_thread_id.to_string(),
            interests,
            started_at: now,
            last_activity_at: now,
        })
    }

    /// Union `batch` into this record and return how many interests were new.
    ///
    /// An empty batch leaves the record untouched, including `last_activity_at`.
    pub fn merge(&mut self, batch: &[String], now: DateTime<Utc>) -> usize {
        if batch.is_empty() {
            return 0;
        }
        self.last_activity_at = now;
        union_into(&mut self.interests, batch)
    }
}

impl VersionedDocument for InterestRecord {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

/// Append every string of `batch` not already in `existing`.
///
/// Equality is exact and case-sensitive. First appearance wins.
pub fn union_into(existing: &mut Vec<String>, batch: &[String]) -> usize {
    let mut added = 0;
    for interest in batch {
        if !existing.iter().any(|e| e == interest) {
            existing.push(interest.clone());
            added += 1;
        }
    }
    added
}
