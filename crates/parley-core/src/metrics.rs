//! Process-wide pipeline counters.
//!
//! Lines dropped by validation and documents skipped by the sweeper are not
//! errors, so they never reach a caller. These counters make them observable.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Shared atomic counters. Wrap in `Arc` and hand a clone to each service.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    interest_lines_malformed: AtomicU64,
    interest_lines_unmatched: AtomicU64,
    interests_accepted: AtomicU64,
    sessions_created: AtomicU64,
    messages_appended: AtomicU64,
    sessions_migrated: AtomicU64,
    migrations_failed: AtomicU64,
    documents_malformed: AtomicU64,
}

/// Point-in-time copy of `PipelineCounters`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub interest_lines_malformed: u64,
    pub interest_lines_unmatched: u64,
    pub interests_accepted: u64,
    pub sessions_created: u64,
    pub messages_appended: u64,
    pub sessions_migrated: u64,
    pub migrations_failed: u64,
    pub documents_malformed: u64,
}

impl PipelineCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_validation(&self, accepted: usize, malformed: usize, unmatched: usize) {
        self.interests_accepted
            .fetch_add(accepted as u64, Ordering::Relaxed);
        self.interest_lines_malformed
            .fetch_add(malformed as u64, Ordering::Relaxed);
        self.interest_lines_unmatched
            .fetch_add(unmatched as u64, Ordering::Relaxed);
    }

    pub fn session_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_appended(&self) {
        self.messages_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_migrated(&self) {
        self.sessions_migrated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn migration_failed(&self) {
        self.migrations_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn document_malformed(&self) {
        self.documents_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            interest_lines_malformed: self.interest_lines_malformed.load(Ordering::Relaxed),
            interest_lines_unmatched: self.interest_lines_unmatched.load(Ordering::Relaxed),
            interests_accepted: self.interests_accepted.load(Ordering::Relaxed),
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            messages_appended: self.messages_appended.load(Ordering::Relaxed),
            sessions_migrated: self.sessions_migrated.load(Ordering::Relaxed),
            migrations_failed: self.migrations_failed.load(Ordering::Relaxed),
            documents_malformed: self.documents_malformed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let counters = PipelineCounters::new();
        counters.record_validation(2, 1, 3);
        counters.record_validation(1, 0, 0);
        counters.session_created();
        counters.message_appended();
        counters.message_appended();

        let snap = counters.snapshot();
        assert_eq!(snap.interests_accepted, 3);
        assert_eq!(snap.interest_lines_malformed, 1);
        assert_eq!(snap.interest_lines_unmatched, 3);
        assert_eq!(snap.sessions_created, 1);
        assert_eq!(snap.messages_appended, 2);
        assert_eq!(snap.sessions_migrated, 0);
    }

    #[test]
    fn test_snapshot_serializes_field_names() {
        let counters = PipelineCounters::new();
        counters.migration_failed();
        let json = serde_json::to_value(counters.snapshot()).unwrap();
        assert_eq!(json["migrations_failed"], 1);
        assert_eq!(json["documents_malformed"], 0);
    }
}
