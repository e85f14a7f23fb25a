//! Sync scheduler
//!
//! Picks clients whose automatic sync is due, runs them one after another and
//! writes back the next due time. A failing client never stops the loop.

use std::time::{Duration, Instant};

use serde::Serialize;
use shared::models::{ReconcileMode, SyncConfig, SyncFrequency, SyncRunStatus};

use crate::engine::{ReconcileOptions, ReconciliationEngine};
use crate::error::{SyncError, SyncResult};
use crate::store::{SyncConfigStore, SyncLogStore};

/// In-progress entries older than this are considered orphaned
pub const DEFAULT_STALE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Next due time after a run completed at `completed_at`
pub fn compute_next_run(frequency: SyncFrequency, completed_at: i64) -> i64 {
    completed_at.saturating_add(frequency.interval_millis())
}

/// What one scheduler tick did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub reaped: usize,
    pub due: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    /// Already running elsewhere; left due for the next tick
    pub skipped: usize,
}

#[derive(Clone)]
pub struct SyncScheduler {
    engine: ReconciliationEngine,
    stale_ttl: Duration,
    batch_size: usize,
    pause: Duration,
    budget: Option<Duration>,
}

impl SyncScheduler {
    pub fn new(engine: ReconciliationEngine) -> Self {
        let defaults = ReconcileOptions::scheduled(ReconcileMode::DryRun);
        Self {
            engine,
            stale_ttl: DEFAULT_STALE_TTL,
            batch_size: defaults.batch_size,
            pause: defaults.pause,
            budget: None,
        }
    }

    pub fn with_stale_ttl(mut self, ttl: Duration) -> Self {
        self.stale_ttl = ttl;
        self
    }

    pub fn with_batching(mut self, batch_size: usize, pause: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.pause = pause;
        self
    }

    pub fn with_budget(mut self, budget: Option<Duration>) -> Self {
        self.budget = budget;
        self
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    /// Wall-clock limit applied to every pass, scheduled or manual
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    pub async fn due_configs(&self, now: i64) -> SyncResult<Vec<SyncConfig>> {
        Ok(self.engine.store().due_configs(now).await?)
    }

    /// Store the outcome of a run and return the next due time
    pub async fn record_run(&self, config: &SyncConfig, completed_at: i64, status: SyncRunStatus) -> SyncResult<i64> {
        let next = compute_next_run(config.frequency, completed_at);
        self.engine
            .store()
            .record_schedule(config.client_id, completed_at, next, status)
            .await?;
        Ok(next)
    }

    /// Fail in-progress runs left behind by a crashed process
    ///
    /// Clients whose run lock is held in this process are still working and
    /// are never reaped, however long their pass takes.
    pub async fn reap_stale_runs(&self, now: i64) -> SyncResult<Vec<i64>> {
        let ttl_ms = i64::try_from(self.stale_ttl.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now.saturating_sub(ttl_ms);
        let payload = serde_json::json!({
            "kind": "orphaned",
            "message": "run exceeded the stale-run TTL without finishing",
            "ttl_secs": self.stale_ttl.as_secs(),
        });
        let live = self.engine.locks().running();
        let reaped = self
            .engine
            .store()
            .fail_stale_runs(cutoff, now, &live, &payload)
            .await?;
        if !reaped.is_empty() {
            tracing::warn!(count = reaped.len(), ids = ?reaped, "Reaped orphaned sync runs");
        }
        Ok(reaped)
    }

    /// One scheduler tick: reap, then run every due client in turn
    pub async fn run_due(&self, now: i64) -> SyncResult<TickSummary> {
        let tick = Instant::now();
        let mut summary = TickSummary {
            reaped: self.reap_stale_runs(now).await?.len(),
            ..Default::default()
        };

        let due = self.due_configs(now).await?;
        summary.due = due.len();
        if due.is_empty() {
            return Ok(summary);
        }
        tracing::info!(due = due.len(), "Running scheduled syncs");

        for config in &due {
            let mode = if config.auto_correct {
                ReconcileMode::Authoritative
            } else {
                ReconcileMode::DryRun
            };
            let options = ReconcileOptions::scheduled(mode)
                .with_batch_size(self.batch_size)
                .with_pause(self.pause)
                .with_budget(self.budget);

            let status = match self.engine.run(config.client_id, options).await {
                Ok(report) if report.budget_exhausted || !report.errors.is_empty() => {
                    summary.partial += 1;
                    SyncRunStatus::Partial
                }
                Ok(_) => {
                    summary.succeeded += 1;
                    SyncRunStatus::Success
                }
                Err(SyncError::AlreadyRunning(client_id)) => {
                    tracing::info!(client_id, "Sync already running, skipping");
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!(client_id = config.client_id, error = %e, "Scheduled sync failed");
                    summary.failed += 1;
                    SyncRunStatus::Failed
                }
            };

            let completed_at = now.saturating_add(elapsed_ms(tick));
            if let Err(e) = self.record_run(config, completed_at, status).await {
                tracing::error!(client_id = config.client_id, error = %e, "Failed to record schedule");
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            partial = summary.partial,
            failed = summary.failed,
            skipped = summary.skipped,
            "Scheduled syncs finished"
        );
        Ok(summary)
    }
}

fn elapsed_ms(since: Instant) -> i64 {
    i64::try_from(since.elapsed().as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_run_adds_interval_to_completion() {
        let done = 1_700_000_000_000;
        assert_eq!(compute_next_run(SyncFrequency::FiveMinutes, done), done + 300_000);
        assert_eq!(compute_next_run(SyncFrequency::Hourly, done), done + 3_600_000);
        assert_eq!(compute_next_run(SyncFrequency::Daily, done), done + 86_400_000);
        assert_eq!(compute_next_run(SyncFrequency::Weekly, done), done + 604_800_000);
    }

    #[test]
    fn next_run_saturates() {
        assert_eq!(compute_next_run(SyncFrequency::Weekly, i64::MAX - 1), i64::MAX);
    }
}
