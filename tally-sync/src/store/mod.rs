//! Persistence seams
//!
//! The reconciler reads the ledger and alias table, and writes sync logs,
//! audit entries and schedule state. Each concern is its own trait so tests
//! and local runs can swap in [`MemoryStore`]; production uses
//! [`crate::db::PgStore`].

pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use shared::models::{
    AliasKind, AliasRef, AuditLogEntry, ClientStore, ExternalAlias, NewAuditEntry, SyncConfig,
    SyncLogClose, SyncLogEntry, SyncRunKind, SyncRunStatus,
};
use thiserror::Error;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be mapped onto the domain type
    #[error("invalid stored value: {0}")]
    InvalidData(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read-only view of the inventory ledger
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Sum of deltas for one SKU, optionally scoped to a location (0 if none)
    async fn sum(&self, client_id: i64, sku_id: i64, location_id: Option<i64>) -> StoreResult<i64>;

    /// Batch form of [`LedgerReader::sum`]; every requested SKU is present in the result
    async fn sum_many(
        &self,
        client_id: i64,
        sku_ids: &[i64],
        location_id: Option<i64>,
    ) -> StoreResult<HashMap<i64, i64>>;

    /// Distinct locations each SKU has ledger entries at (ascending)
    async fn locations_for(&self, client_id: i64, sku_ids: &[i64]) -> StoreResult<HashMap<i64, Vec<i64>>>;
}

#[async_trait]
pub trait AliasStore: Send + Sync {
    /// `{sku_id, value}` pairs ordered by SKU then value
    async fn list_aliases(&self, client_id: i64, kind: AliasKind) -> StoreResult<Vec<AliasRef>>;

    /// First alias value of a SKU (lowest id)
    async fn alias_for_sku(&self, client_id: i64, sku_id: i64, kind: AliasKind) -> StoreResult<Option<String>>;

    /// Idempotent on `(sku_id, kind, value)`
    async fn upsert_alias(
        &self,
        client_id: i64,
        sku_id: i64,
        kind: AliasKind,
        value: &str,
    ) -> StoreResult<ExternalAlias>;

    /// Mark every alias carrying one of `values` as conflicted; returns rows touched
    async fn flag_conflicts(&self, client_id: i64, kind: AliasKind, values: &[String], now: i64) -> StoreResult<u64>;
}

#[async_trait]
pub trait ClientStoreSource: Send + Sync {
    async fn client_store(&self, client_id: i64) -> StoreResult<Option<ClientStore>>;
}

#[async_trait]
pub trait SyncConfigStore: Send + Sync {
    /// Enabled configs whose next run time is unset or not after `now`
    async fn due_configs(&self, now: i64) -> StoreResult<Vec<SyncConfig>>;

    async fn sync_config(&self, client_id: i64) -> StoreResult<Option<SyncConfig>>;

    /// Write scheduler-owned fields only
    async fn record_schedule(
        &self,
        client_id: i64,
        last_sync_at: i64,
        next_sync_at: i64,
        status: SyncRunStatus,
    ) -> StoreResult<()>;
}

#[async_trait]
pub trait SyncLogStore: Send + Sync {
    /// Insert an in-progress entry and return its id
    async fn open_run(&self, client_id: i64, run_kind: SyncRunKind, started_at: i64) -> StoreResult<i64>;

    /// Close an in-progress entry; `false` if it was already terminal
    async fn close_run(
        &self,
        id: i64,
        status: SyncRunStatus,
        finished_at: i64,
        close: &SyncLogClose,
    ) -> StoreResult<bool>;

    /// Newest first
    async fn list_runs(&self, client_id: i64, limit: i64) -> StoreResult<Vec<SyncLogEntry>>;

    /// Fail every in-progress entry started before `started_before`, except
    /// those of clients in `live_clients`; returns their ids
    async fn fail_stale_runs(
        &self,
        started_before: i64,
        finished_at: i64,
        live_clients: &[i64],
        error: &Value,
    ) -> StoreResult<Vec<i64>>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert_audit(&self, entry: &NewAuditEntry, created_at: i64) -> StoreResult<AuditLogEntry>;

    /// Newest first; `open_only` keeps failed, unresolved entries
    async fn list_audit(&self, client_id: i64, open_only: bool, limit: i64) -> StoreResult<Vec<AuditLogEntry>>;

    async fn get_audit(&self, id: i64) -> StoreResult<Option<AuditLogEntry>>;

    /// Set resolution fields on an unresolved entry; `false` if already resolved
    async fn resolve_audit(&self, id: i64, notes: &str, resolved_at: i64) -> StoreResult<bool>;
}

/// Everything the reconciler needs from storage
pub trait SyncStore:
    LedgerReader + AliasStore + ClientStoreSource + SyncConfigStore + SyncLogStore + AuditStore
{
}

impl<T> SyncStore for T where
    T: LedgerReader + AliasStore + ClientStoreSource + SyncConfigStore + SyncLogStore + AuditStore
{
}
