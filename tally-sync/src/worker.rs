//! SyncWorker - background loop driving the scheduler

use std::sync::Arc;

use shared::util::now_millis;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::scheduler::SyncScheduler;

/// Default time between two scheduler ticks
pub const DEFAULT_TICK_SECS: u64 = 60;

pub struct SyncWorker {
    scheduler: Arc<SyncScheduler>,
    tick: Duration,
    shutdown: CancellationToken,
}

impl SyncWorker {
    pub fn new(scheduler: Arc<SyncScheduler>, tick: Duration, shutdown: CancellationToken) -> Self {
        Self {
            scheduler,
            tick,
            shutdown,
        }
    }

    /// Tick until cancelled; a tick in progress finishes before shutdown
    pub async fn run(self) {
        tracing::info!(tick_secs = self.tick.as_secs(), "SyncWorker started");

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("SyncWorker shutting down");
                    break;
                }

                _ = interval.tick() => {
                    match self.scheduler.run_due(now_millis()).await {
                        Ok(summary) if summary.due > 0 || summary.reaped > 0 => {
                            tracing::debug!(?summary, "Scheduler tick");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Scheduler tick failed"),
                    }
                }
            }
        }

        tracing::info!("SyncWorker stopped");
    }
}
