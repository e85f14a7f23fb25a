//! Tally Sync - inventory reconciliation engine
//!
//! Keeps the platform's per-item available counts in line with the local
//! inventory ledger:
//! - [`engine`] runs reconciliation passes (dry run or authoritative)
//! - [`pusher`] applies one correction and audits it
//! - [`scheduler`] and [`worker`] run due clients in the background
//! - [`api`] exposes on-demand runs, logs and audit follow-up over HTTP
//!
//! Storage goes through the traits in [`store`]; [`db::PgStore`] is the
//! Postgres implementation and [`store::MemoryStore`] the in-memory one.

pub mod alias;
pub mod api;
pub mod audit;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod locks;
pub mod platform;
pub mod pusher;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod worker;

pub use engine::{ReconcileOptions, ReconciliationEngine, RunPhase};
pub use error::{ConfigGap, Refusal, SyncError, SyncResult};
pub use platform::{InventoryPlatform, PlatformConnector, StoreTarget, StorefrontConnector};
pub use pusher::CorrectionPusher;
pub use scheduler::{SyncScheduler, TickSummary};
pub use worker::SyncWorker;
