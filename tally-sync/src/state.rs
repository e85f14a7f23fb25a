//! Application state for the admin API

use std::sync::Arc;
use std::time::Duration;

use crate::engine::ReconciliationEngine;
use crate::scheduler::SyncScheduler;
use crate::store::SyncStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SyncStore>,
    pub engine: ReconciliationEngine,
    pub scheduler: Arc<SyncScheduler>,
    /// Budget for manual runs; same as the scheduler's
    pub run_budget: Option<Duration>,
}

impl AppState {
    pub fn new(scheduler: Arc<SyncScheduler>) -> Self {
        let engine = scheduler.engine().clone();
        Self {
            store: engine.store().clone(),
            run_budget: scheduler.budget(),
            engine,
            scheduler,
        }
    }
}
