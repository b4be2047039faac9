//! InactivitySweeper: moves idle sessions from the ephemeral store into the
//! durable archive.
//!
//! Each tick asks the activity index for sessions idle past the threshold,
//! then for each candidate whose key lock is free: re-reads the document, archives
//! it with its interest record in one durable transaction, and only after the
//! commit deletes both ephemeral keys. A failed archive leaves the ephemeral
//! documents in place, and the next tick retries. The archive write is
//! idempotent, so a retry after a partial delete never duplicates rows.
//! A candidate whose lock is held is mid-interaction and waits for a later
//! tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parley_types::archive::{ArchiveBundle, ArchiveReceipt};
use parley_types::config::SweeperConfig;
use parley_types::error::{MigrationError, StoreError};

use crate::metrics::PipelineCounters;
use crate::repository::archive::ArchiveRepository;
use crate::session::{EphemeralStore, KeyedLocks, SessionStore};

/// Called after a session is committed to the archive, before its ephemeral
/// keys are deleted.
pub type ArchiveHook = Arc<dyn Fn(&ArchiveBundle, &ArchiveReceipt) + Send + Sync>;

/// Counts for one sweep tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Candidates returned by the activity index.
    pub scanned: usize,
    pub migrated: usize,
    /// Candidates whose document showed activity within the threshold.
    pub skipped_recent: usize,
    /// Candidates whose key lock was held by an interaction in flight.
    pub skipped_busy: usize,
    pub skipped_malformed: usize,
    pub failed: usize,
}

impl SweepReport {
    fn is_quiet(&self) -> bool {
        self.migrated == 0 && self.skipped_malformed == 0 && self.failed == 0
    }
}

enum Disposition {
    Migrated,
    Recent,
    Busy,
    Malformed,
    Gone,
}

pub struct InactivitySweeper<E, R> {
    sessions: Arc<SessionStore<E>>,
    archive: R,
    locks: KeyedLocks,
    counters: Arc<PipelineCounters>,
    threshold: chrono::Duration,
    interval: Duration,
    on_archived: Option<ArchiveHook>,
}

impl<E, R> InactivitySweeper<E, R>
where
    E: EphemeralStore,
    R: ArchiveRepository,
{
    pub fn new(
        sessions: Arc<SessionStore<E>>,
        archive: R,
        locks: KeyedLocks,
        counters: Arc<PipelineCounters>,
        config: &SweeperConfig,
    ) -> Self {
        Self {
            sessions,
            archive,
            locks,
            counters,
            threshold: chrono::Duration::from_std(config.inactivity_threshold())
                .unwrap_or(chrono::Duration::MAX),
            interval: config.sweep_interval(),
            on_archived: None,
        }
    }

    /// Install a hook run after each successful archive write.
    pub fn with_on_archived(mut self, hook: ArchiveHook) -> Self {
        self.on_archived = Some(hook);
        self
    }

    pub fn archive(&self) -> &R {
        &self.archive
    }

    /// Run ticks every `sweep_interval` until `cancel` fires.
    ///
    /// Rebuilds the activity index once on start. Ticks never overlap; a tick
    /// in progress runs to completion before the loop exits.
    pub async fn run(&self, cancel: CancellationToken) {
        match self.sessions.rebuild_activity_index().await {
            Ok(rebuild) => info!(
                indexed = rebuild.indexed,
                malformed = rebuild.malformed,
                "Activity index ready"
            ),
            Err(e) => warn!(error = %e, "Failed to rebuild activity index"),
        }

        info!(
            interval = ?self.interval,
            threshold_secs = self.threshold.num_seconds(),
            "Inactivity sweeper started"
        );
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep_once(Utc::now()).await;
                    let pruned = self.locks.prune();
                    if pruned > 0 {
                        debug!(pruned, "Pruned idle key locks");
                    }
                }
            }
        }
        info!("Inactivity sweeper stopped");
    }

    /// Migrate every session idle for strictly longer than the threshold at `now`.
    ///
    /// Per-correspondent failures are logged and counted; they never stop the
    /// tick.
    #[tracing::instrument(skip_all)]
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        let cutoff = now
            .checked_sub_signed(self.threshold)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let candidates = match self.sessions.idle_candidates(cutoff).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to list idle sessions");
                return report;
            }
        };

        for id in candidates {
            report.scanned += 1;
            match self.migrate_one(&id, now).await {
                Ok(Disposition::Migrated) => report.migrated += 1,
                Ok(Disposition::Recent) => report.skipped_recent += 1,
                Ok(Disposition::Busy) => report.skipped_busy += 1,
                Ok(Disposition::Malformed) => report.skipped_malformed += 1,
                Ok(Disposition::Gone) => {}
                Err(e) => {
                    warn!(correspondent = %id, error = %e, "Session migration failed; will retry");
                    self.counters.migration_failed();
                    report.failed += 1;
                }
            }
        }

        if report.is_quiet() {
            debug!(scanned = report.scanned, "Sweep finished");
        } else {
            info!(
                scanned = report.scanned,
                migrated = report.migrated,
                skipped_recent = report.skipped_recent,
                skipped_busy = report.skipped_busy,
                skipped_malformed = report.skipped_malformed,
                failed = report.failed,
                "Sweep finished"
            );
        }
        report
    }

    async fn migrate_one(&self, id: &str, now: DateTime<Utc>) -> Result<Disposition, MigrationError> {
        let Some(_guard) = self.locks.try_lock(id) else {
            debug!(correspondent = %id, "Session busy; leaving for a later tick");
            return Ok(Disposition::Busy);
        };

        let session = match self.sessions.get(id).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                self.sessions.clear_activity(id).await?;
                return Ok(Disposition::Gone);
            }
            Err(StoreError::Malformed { key, reason }) => {
                warn!(key = %key, reason = %reason, "Skipping malformed session");
                self.counters.document_malformed();
                return Ok(Disposition::Malformed);
            }
            Err(e) => return Err(e.into()),
        };

        if !session.is_idle(now, self.threshold) {
            self.sessions.touch(id, session.last_activity_at).await?;
            return Ok(Disposition::Recent);
        }

        // An unreadable interest record is dropped; the transcript still moves.
        let interests = match self.sessions.get_interests(&session.analysis_thread_id).await {
            Ok(record) => record,
            Err(StoreError::Malformed { key, reason }) => {
                warn!(key = %key, reason = %reason, "Archiving session without malformed interests");
                self.counters.document_malformed();
                None
            }
            Err(e) => return Err(e.into()),
        };

        let bundle = ArchiveBundle::from_documents(&session, interests.as_ref(), now);
        let receipt = self.archive.archive_session(&bundle).await?;
        match &self.on_archived {
            Some(hook) => hook(&bundle, &receipt),
            None => debug!(correspondent = %id, thread_id = %receipt.thread_id, "Session archived"),
        }

        self.sessions.delete_interests(&session.analysis_thread_id).await?;
        self.sessions.delete(id).await?;
        self.counters.session_migrated();
        info!(
            correspondent = %id,
            thread_id = %receipt.thread_id,
            messages = receipt.messages_written,
            interests = receipt.interests_written,
            retried = !receipt.thread_created,
            "Session migrated"
        );
        Ok(Disposition::Migrated)
    }
}
