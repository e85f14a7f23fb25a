//! Reconciliation engine
//!
//! One pass for one client:
//! 1. resolve store settings (missing settings fail the pass)
//! 2. split item-id aliases into the working set and conflicts
//! 3. fetch every remote level at the mapped location
//! 4. sum the ledger at the canonical location
//! 5. diff local against remote
//! 6. dry run stops here; authoritative pushes each discrepancy
//! 7. close the sync log entry
//!
//! A pass is never resumed. Passes for the same client never overlap.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use shared::models::{
    AliasKind, Discrepancy, ReconcileMode, ReconciliationReport, ReportError, SyncLogClose,
    SyncRunKind, SyncRunStatus,
};
use shared::util::now_millis;
use tally_client::Sleeper;

use crate::alias;
use crate::error::{ConfigGap, SyncError, SyncResult};
use crate::locks::RunLocks;
use crate::platform::{InventoryPlatform, PlatformConnector, StoreTarget};
use crate::pusher::{CorrectionPusher, PushTarget};
use crate::store::{AliasStore, ClientStoreSource, LedgerReader, SyncLogStore, SyncStore};

pub const DEFAULT_BATCH_SIZE: usize = 80;
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(250);

/// Errors copied into a closed log entry
const LOGGED_ERRORS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    FetchingRemote,
    AggregatingLocal,
    Diffing,
    Reporting,
    Correcting,
    Logging,
    Done,
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub mode: ReconcileMode,
    /// Pushes per batch
    pub batch_size: usize,
    /// Wait between two pushes
    pub pause: Duration,
    /// Stop correcting once a pass has run this long
    pub budget: Option<Duration>,
    pub run_kind: SyncRunKind,
}

impl ReconcileOptions {
    pub fn manual(mode: ReconcileMode) -> Self {
        let run_kind = match mode {
            ReconcileMode::DryRun => SyncRunKind::ManualDryRun,
            ReconcileMode::Authoritative => SyncRunKind::ManualAuthoritative,
        };
        Self {
            mode,
            batch_size: DEFAULT_BATCH_SIZE,
            pause: DEFAULT_PAUSE,
            budget: None,
            run_kind,
        }
    }

    pub fn scheduled(mode: ReconcileMode) -> Self {
        let run_kind = match mode {
            ReconcileMode::DryRun => SyncRunKind::ScheduledDryRun,
            ReconcileMode::Authoritative => SyncRunKind::ScheduledAuthoritative,
        };
        Self {
            run_kind,
            ..Self::manual(mode)
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_budget(mut self, budget: Option<Duration>) -> Self {
        self.budget = budget;
        self
    }
}

#[derive(Clone)]
pub struct ReconciliationEngine {
    store: Arc<dyn SyncStore>,
    connector: Arc<dyn PlatformConnector>,
    sleeper: Arc<dyn Sleeper>,
    pusher: CorrectionPusher,
    locks: RunLocks,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn SyncStore>,
        connector: Arc<dyn PlatformConnector>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let pusher = CorrectionPusher::new(store.clone(), connector.clone(), sleeper.clone());
        Self {
            store,
            connector,
            sleeper,
            pusher,
            locks: RunLocks::new(),
        }
    }

    pub fn with_pusher(mut self, pusher: CorrectionPusher) -> Self {
        self.pusher = pusher;
        self
    }

    pub fn locks(&self) -> &RunLocks {
        &self.locks
    }

    pub fn store(&self) -> &Arc<dyn SyncStore> {
        &self.store
    }

    /// Run one pass and persist exactly one sync log entry for it
    pub async fn run(&self, client_id: i64, options: ReconcileOptions) -> SyncResult<ReconciliationReport> {
        let started_at = now_millis();
        let _guard = self
            .locks
            .try_acquire(client_id, started_at)
            .ok_or(SyncError::AlreadyRunning(client_id))?;

        let clock = Instant::now();
        let log_id = self.store.open_run(client_id, options.run_kind, started_at).await?;
        tracing::info!(client_id, log_id, mode = ?options.mode, "Reconciliation started");

        let mut report = ReconciliationReport::new(client_id, options.mode);
        report.sync_log_id = Some(log_id);

        let outcome = self.execute(client_id, &options, clock, &mut report).await;
        report.duration_ms = elapsed_ms(clock);
        tracing::debug!(client_id, phase = ?RunPhase::Logging);

        let mut close = close_totals(&report);
        let status = match &outcome {
            Ok(()) if report.budget_exhausted || !report.errors.is_empty() => SyncRunStatus::Partial,
            Ok(()) => SyncRunStatus::Success,
            Err(_) => SyncRunStatus::Failed,
        };
        close.error = match &outcome {
            Err(e) => Some(e.to_log_payload()),
            Ok(()) if status == SyncRunStatus::Partial => Some(serde_json::json!({
                "kind": "partial",
                "budget_exhausted": report.budget_exhausted,
                "errors": report.first_errors(LOGGED_ERRORS),
            })),
            Ok(()) => None,
        };

        if !self.store.close_run(log_id, status, now_millis(), &close).await? {
            tracing::warn!(client_id, log_id, "Sync log entry was already closed");
        }

        match outcome {
            Ok(()) => {
                tracing::info!(
                    client_id,
                    log_id,
                    %status,
                    total_skus = report.total_skus,
                    discrepancies = report.discrepancies.len(),
                    conflicts = report.conflicts.len(),
                    corrected = close.corrected,
                    failed = close.failed,
                    duration_ms = report.duration_ms,
                    "Reconciliation finished"
                );
                tracing::debug!(client_id, phase = ?RunPhase::Done);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(client_id, log_id, error = %e, "Reconciliation failed");
                Err(e)
            }
        }
    }

    /// Push one SKU outside a pass, under the same per-client lock
    pub async fn push_one(&self, client_id: i64, sku_id: i64) -> SyncResult<shared::models::CorrectionOutcome> {
        let _guard = self
            .locks
            .try_acquire(client_id, now_millis())
            .ok_or(SyncError::AlreadyRunning(client_id))?;
        self.pusher.push(client_id, sku_id).await
    }

    async fn execute(
        &self,
        client_id: i64,
        options: &ReconcileOptions,
        clock: Instant,
        report: &mut ReconciliationReport,
    ) -> SyncResult<()> {
        let store = self
            .store
            .client_store(client_id)
            .await?
            .ok_or_else(|| {
                SyncError::configuration(
                    ConfigGap::Settings,
                    format!("client {client_id} has no store settings"),
                )
            })?;
        let target = StoreTarget::from_client_store(&store)?;

        let aliases = self
            .store
            .list_aliases(client_id, AliasKind::ExternalItemId)
            .await?;
        let working = alias::partition(aliases);
        for conflict in &working.conflicts {
            tracing::warn!(
                client_id,
                value = %conflict.alias_value,
                sku_ids = ?conflict.sku_ids,
                "External item id claimed by several SKUs"
            );
        }
        if options.mode.is_authoritative() && !working.conflicts.is_empty() {
            self.store
                .flag_conflicts(
                    client_id,
                    AliasKind::ExternalItemId,
                    &working.conflicted_values(),
                    now_millis(),
                )
                .await?;
        }
        report.conflicts = working.conflicts.clone();

        let sku_ids = working.sku_ids();
        report.total_skus = sku_ids.len();
        if working.resolved.is_empty() {
            return Ok(());
        }

        tracing::debug!(client_id, phase = ?RunPhase::FetchingRemote);
        let platform = self.connector.connect(&target).await?;
        let remote: HashMap<String, i64> = platform
            .inventory_levels(&target.external_location_id)
            .await?
            .into_iter()
            .map(|level| (level.item_id, level.quantity))
            .collect();

        tracing::debug!(client_id, phase = ?RunPhase::AggregatingLocal);
        let mut local: HashMap<i64, i64> = HashMap::with_capacity(sku_ids.len());
        for chunk in sku_ids.chunks(options.batch_size.max(1)) {
            local.extend(
                self.store
                    .sum_many(client_id, chunk, Some(target.location_id))
                    .await?,
            );
        }
        self.warn_on_other_locations(client_id, &sku_ids, target.location_id)
            .await?;

        tracing::debug!(client_id, phase = ?RunPhase::Diffing);
        for alias in &working.resolved {
            let local_qty = local.get(&alias.sku_id).copied().unwrap_or(0);
            let remote_qty = remote.get(&alias.value).copied().unwrap_or(0);
            if local_qty != remote_qty {
                report
                    .discrepancies
                    .push(Discrepancy::new(alias.sku_id, alias.value.clone(), local_qty, remote_qty));
            }
        }

        if !options.mode.is_authoritative() {
            tracing::debug!(client_id, phase = ?RunPhase::Reporting);
            return Ok(());
        }

        tracing::debug!(client_id, phase = ?RunPhase::Correcting);
        self.correct(platform.as_ref(), &target, options, clock, report)
            .await;
        Ok(())
    }

    /// Push every discrepancy in order; failures are recorded, never fatal
    async fn correct(
        &self,
        platform: &dyn InventoryPlatform,
        target: &StoreTarget,
        options: &ReconcileOptions,
        clock: Instant,
        report: &mut ReconciliationReport,
    ) {
        let discrepancies = report.discrepancies.clone();
        let mut pushed = 0usize;

        'batches: for (batch_no, batch) in discrepancies.chunks(options.batch_size.max(1)).enumerate() {
            tracing::debug!(client_id = report.client_id, batch = batch_no + 1, size = batch.len(), "Correction batch");
            for discrepancy in batch {
                if options.budget.is_some_and(|budget| clock.elapsed() >= budget) {
                    tracing::warn!(
                        client_id = report.client_id,
                        remaining = discrepancies.len() - pushed,
                        "Run budget exhausted, stopping corrections"
                    );
                    report.budget_exhausted = true;
                    break 'batches;
                }
                if pushed > 0 && !options.pause.is_zero() {
                    self.sleeper.sleep(options.pause).await;
                }
                pushed += 1;

                let push = PushTarget {
                    client_id: report.client_id,
                    sku_id: discrepancy.sku_id,
                    external_item_id: &discrepancy.external_item_id,
                    external_location_id: &target.external_location_id,
                };
                match self.pusher.push_to(platform, push).await {
                    Ok(outcome) => {
                        if !outcome.success {
                            report.errors.push(ReportError {
                                sku_id: Some(outcome.sku_id),
                                message: format!(
                                    "correction of SKU {} failed after {} attempts",
                                    outcome.sku_id, outcome.attempts
                                ),
                            });
                        }
                        report.corrected.push(outcome);
                    }
                    Err(e) => {
                        tracing::error!(client_id = report.client_id, sku_id = discrepancy.sku_id, error = %e, "Correction aborted");
                        report.errors.push(ReportError {
                            sku_id: Some(discrepancy.sku_id),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    async fn warn_on_other_locations(&self, client_id: i64, sku_ids: &[i64], canonical: i64) -> SyncResult<()> {
        let locations = self.store.locations_for(client_id, sku_ids).await?;
        let mut spread: Vec<i64> = locations
            .into_iter()
            .filter(|(_, locs)| locs.iter().any(|loc| *loc != canonical))
            .map(|(sku, _)| sku)
            .collect();
        if !spread.is_empty() {
            spread.sort_unstable();
            tracing::warn!(
                client_id,
                canonical_location = canonical,
                sku_ids = ?spread,
                "SKUs have ledger entries outside the canonical location; pushes use the global total"
            );
        }
        Ok(())
    }
}

fn close_totals(report: &ReconciliationReport) -> SyncLogClose {
    let corrected = report.corrected.iter().filter(|o| o.success).count();
    SyncLogClose {
        total_skus: report.total_skus as i64,
        discrepancies: report.discrepancies.len() as i64,
        conflicts: report.conflicts.len() as i64,
        corrected: corrected as i64,
        failed: report.errors.len() as i64,
        duration_ms: report.duration_ms,
        error: None,
    }
}

fn elapsed_ms(clock: Instant) -> i64 {
    i64::try_from(clock.elapsed().as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{CorrectionOutcome, CorrectionStatus};

    #[test]
    fn scheduled_options_carry_scheduled_kind() {
        let opts = ReconcileOptions::scheduled(ReconcileMode::Authoritative);
        assert_eq!(opts.run_kind, SyncRunKind::ScheduledAuthoritative);
        assert_eq!(opts.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(opts.pause, DEFAULT_PAUSE);

        let opts = ReconcileOptions::manual(ReconcileMode::DryRun).with_batch_size(0);
        assert_eq!(opts.run_kind, SyncRunKind::ManualDryRun);
        assert_eq!(opts.batch_size, 1);
    }

    #[test]
    fn totals_count_successes_and_errors() {
        let mut report = ReconciliationReport::new(1, ReconcileMode::Authoritative);
        report.total_skus = 3;
        report.discrepancies = vec![Discrepancy::new(1, "a", 5, 4), Discrepancy::new(2, "b", 0, 1)];
        report.corrected = vec![
            CorrectionOutcome {
                sku_id: 1,
                success: true,
                quantity: 5,
                status: CorrectionStatus::Updated,
                attempts: 1,
                audit_id: Some(1),
            },
            CorrectionOutcome {
                sku_id: 2,
                success: false,
                quantity: 0,
                status: CorrectionStatus::Failed,
                attempts: 3,
                audit_id: Some(2),
            },
        ];
        report.errors = vec![ReportError {
            sku_id: Some(2),
            message: "boom".into(),
        }];

        let close = close_totals(&report);
        assert_eq!(close.total_skus, 3);
        assert_eq!(close.discrepancies, 2);
        assert_eq!(close.corrected, 1);
        assert_eq!(close.failed, 1);
    }
}
