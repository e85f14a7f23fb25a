//! Scheduler ticks, schedule bookkeeping and the stale-run reaper

mod common;

use std::time::Duration;

use common::{CLIENT, Harness, item};
use shared::models::{
    SyncConfig, SyncFrequency, SyncLogEntry, SyncLogClose, SyncRunKind, SyncRunStatus,
};
use tally_sync::store::{SyncConfigStore, SyncLogStore};
use tally_sync::SyncScheduler;

const NOW: i64 = 1_700_000_000_000;
const HOUR: i64 = 3_600_000;

fn config(client_id: i64, next: Option<i64>, auto_correct: bool) -> SyncConfig {
    SyncConfig {
        client_id,
        auto_sync_enabled: true,
        frequency: SyncFrequency::Hourly,
        last_sync_at: None,
        next_sync_at: next,
        last_sync_status: None,
        auto_correct,
    }
}

fn in_progress(client_id: i64, started_at: i64) -> SyncLogEntry {
    SyncLogEntry {
        id: 0,
        client_id,
        run_kind: SyncRunKind::ScheduledDryRun,
        status: SyncRunStatus::InProgress,
        started_at,
        finished_at: None,
        total_skus: 0,
        discrepancies: 0,
        conflicts: 0,
        corrected: 0,
        failed: 0,
        duration_ms: None,
        error: None,
    }
}

#[tokio::test]
async fn due_selection() {
    let h = Harness::new();
    h.store.set_sync_config(config(1, None, false));
    h.store.set_sync_config(config(2, Some(NOW), false));
    h.store.set_sync_config(config(3, Some(NOW + 1), false));
    h.store.set_sync_config(SyncConfig {
        auto_sync_enabled: false,
        ..config(4, None, false)
    });

    let scheduler = SyncScheduler::new(h.engine.clone());
    let due: Vec<i64> = scheduler
        .due_configs(NOW)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.client_id)
        .collect();
    assert_eq!(due, vec![1, 2]);
}

#[tokio::test]
async fn dry_run_tick_records_next_run() {
    let h = Harness::new();
    h.stock(1, 5);
    h.map(1, &item(1));
    h.store.set_sync_config(config(CLIENT, None, false));
    let scheduler = SyncScheduler::new(h.engine.clone());

    let summary = scheduler.run_due(NOW).await.unwrap();
    assert_eq!(summary.due, 1);
    assert_eq!(summary.succeeded, 1);

    let logs = h.store.sync_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].run_kind, SyncRunKind::ScheduledDryRun);
    assert!(h.platform.mutations().is_empty());

    let cfg = h.store.sync_config(CLIENT).await.unwrap().unwrap();
    let last = cfg.last_sync_at.unwrap();
    assert!(last >= NOW);
    assert_eq!(cfg.next_sync_at, Some(last + HOUR));
    assert_eq!(cfg.last_sync_status, Some(SyncRunStatus::Success));

    // not due again until the next hour
    let summary = scheduler.run_due(NOW + 1).await.unwrap();
    assert_eq!(summary.due, 0);
}

#[tokio::test]
async fn auto_correct_runs_authoritatively() {
    let h = Harness::new();
    h.stock(1, 5);
    h.map(1, &item(1));
    h.store.set_sync_config(config(CLIENT, Some(NOW - 1), true));
    let scheduler = SyncScheduler::new(h.engine.clone()).with_batching(10, Duration::ZERO);

    scheduler.run_due(NOW).await.unwrap();

    assert_eq!(h.store.sync_logs()[0].run_kind, SyncRunKind::ScheduledAuthoritative);
    assert_eq!(h.platform.level(&item(1)), Some(5));
}

#[tokio::test]
async fn failing_client_does_not_stop_the_tick() {
    let h = Harness::new();
    h.store.set_sync_config(config(CLIENT, Some(NOW - 2), false));
    // client 2 has no store settings
    h.store.set_sync_config(config(2, Some(NOW - 1), false));
    let scheduler = SyncScheduler::new(h.engine.clone());

    let summary = scheduler.run_due(NOW).await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    let failed = h.store.sync_config(2).await.unwrap().unwrap();
    assert_eq!(failed.last_sync_status, Some(SyncRunStatus::Failed));
    assert!(failed.next_sync_at.unwrap() > NOW);

    let log = h
        .store
        .sync_logs()
        .into_iter()
        .find(|l| l.client_id == 2)
        .unwrap();
    assert_eq!(log.status, SyncRunStatus::Failed);
    assert!(log.error.is_some());
}

#[tokio::test]
async fn running_client_is_skipped_and_stays_due() {
    let h = Harness::new();
    h.store.set_sync_config(config(CLIENT, None, false));
    let scheduler = SyncScheduler::new(h.engine.clone());
    let _held = h.engine.locks().try_acquire(CLIENT, NOW).unwrap();

    let summary = scheduler.run_due(NOW).await.unwrap();
    assert_eq!(summary.skipped, 1);

    let cfg = h.store.sync_config(CLIENT).await.unwrap().unwrap();
    assert_eq!(cfg.next_sync_at, None);
    assert!(h.store.sync_logs().is_empty());
}

#[tokio::test]
async fn reaper_fails_only_stale_runs() {
    let h = Harness::new();
    let stale = h.store.insert_sync_log(in_progress(CLIENT, NOW - 3 * HOUR));
    let fresh = h.store.insert_sync_log(in_progress(CLIENT, NOW - HOUR));
    let scheduler = SyncScheduler::new(h.engine.clone());

    let reaped = scheduler.reap_stale_runs(NOW).await.unwrap();
    assert_eq!(reaped, vec![stale]);

    let logs = h.store.sync_logs();
    let stale_log = logs.iter().find(|l| l.id == stale).unwrap();
    assert_eq!(stale_log.status, SyncRunStatus::Failed);
    assert_eq!(stale_log.error.as_ref().unwrap()["kind"], "orphaned");
    assert_eq!(stale_log.duration_ms, Some(3 * HOUR));
    let fresh_log = logs.iter().find(|l| l.id == fresh).unwrap();
    assert_eq!(fresh_log.status, SyncRunStatus::InProgress);

    // a late close cannot overwrite the reaped entry
    let closed = h
        .store
        .close_run(stale, SyncRunStatus::Success, NOW, &SyncLogClose::default())
        .await
        .unwrap();
    assert!(!closed);
}

#[tokio::test]
async fn tick_reaps_before_running() {
    let h = Harness::new();
    h.store.insert_sync_log(in_progress(7, NOW - 5 * HOUR));
    let scheduler = SyncScheduler::new(h.engine.clone()).with_stale_ttl(Duration::from_secs(3600));

    let summary = scheduler.run_due(NOW).await.unwrap();
    assert_eq!(summary.reaped, 1);
    assert_eq!(summary.due, 0);
}

#[tokio::test]
async fn reaper_spares_long_runs_still_holding_their_lock() {
    let h = Harness::new();
    let _held = h.engine.locks().try_acquire(CLIENT, NOW).unwrap();
    let live = h
        .store
        .open_run(CLIENT, SyncRunKind::ManualAuthoritative, NOW)
        .await
        .unwrap();
    let orphan = h.store.insert_sync_log(in_progress(2, NOW));
    let scheduler = SyncScheduler::new(h.engine.clone());

    let reaped = scheduler.reap_stale_runs(NOW + 3 * HOUR).await.unwrap();
    assert_eq!(reaped, vec![orphan]);

    let closed = h
        .store
        .close_run(live, SyncRunStatus::Success, NOW + 3 * HOUR, &SyncLogClose::default())
        .await
        .unwrap();
    assert!(closed);
}
