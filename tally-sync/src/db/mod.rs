//! Database access layer
//!
//! Free functions per table, plus [`PgStore`] which exposes them through the
//! store traits.

pub mod aliases;
pub mod audit;
pub mod client_stores;
pub mod ledger;
pub mod sync_configs;
pub mod sync_logs;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use shared::models::{
    AliasKind, AliasRef, AuditLogEntry, ClientStore, ExternalAlias, NewAuditEntry, SyncConfig,
    SyncLogClose, SyncLogEntry, SyncRunKind, SyncRunStatus,
};
use sqlx::PgPool;

use crate::store::{
    AliasStore, AuditStore, ClientStoreSource, LedgerReader, StoreResult, SyncConfigStore,
    SyncLogStore,
};

/// Postgres-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and apply pending migrations
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;
        tracing::info!("Database migrations applied");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerReader for PgStore {
    async fn sum(&self, client_id: i64, sku_id: i64, location_id: Option<i64>) -> StoreResult<i64> {
        ledger::sum(&self.pool, client_id, sku_id, location_id).await
    }

    async fn sum_many(
        &self,
        client_id: i64,
        sku_ids: &[i64],
        location_id: Option<i64>,
    ) -> StoreResult<HashMap<i64, i64>> {
        ledger::sum_many(&self.pool, client_id, sku_ids, location_id).await
    }

    async fn locations_for(&self, client_id: i64, sku_ids: &[i64]) -> StoreResult<HashMap<i64, Vec<i64>>> {
        ledger::locations_for(&self.pool, client_id, sku_ids).await
    }
}

#[async_trait]
impl AliasStore for PgStore {
    async fn list_aliases(&self, client_id: i64, kind: AliasKind) -> StoreResult<Vec<AliasRef>> {
        aliases::list(&self.pool, client_id, kind).await
    }

    async fn alias_for_sku(&self, client_id: i64, sku_id: i64, kind: AliasKind) -> StoreResult<Option<String>> {
        aliases::find_for_sku(&self.pool, client_id, sku_id, kind).await
    }

    async fn upsert_alias(
        &self,
        client_id: i64,
        sku_id: i64,
        kind: AliasKind,
        value: &str,
    ) -> StoreResult<ExternalAlias> {
        aliases::upsert(&self.pool, client_id, sku_id, kind, value).await
    }

    async fn flag_conflicts(&self, client_id: i64, kind: AliasKind, values: &[String], now: i64) -> StoreResult<u64> {
        aliases::flag_conflicts(&self.pool, client_id, kind, values, now).await
    }
}

#[async_trait]
impl ClientStoreSource for PgStore {
    async fn client_store(&self, client_id: i64) -> StoreResult<Option<ClientStore>> {
        client_stores::find(&self.pool, client_id).await
    }
}

#[async_trait]
impl SyncConfigStore for PgStore {
    async fn due_configs(&self, now: i64) -> StoreResult<Vec<SyncConfig>> {
        sync_configs::due(&self.pool, now).await
    }

    async fn sync_config(&self, client_id: i64) -> StoreResult<Option<SyncConfig>> {
        sync_configs::find(&self.pool, client_id).await
    }

    async fn record_schedule(
        &self,
        client_id: i64,
        last_sync_at: i64,
        next_sync_at: i64,
        status: SyncRunStatus,
    ) -> StoreResult<()> {
        sync_configs::record_schedule(&self.pool, client_id, last_sync_at, next_sync_at, status).await
    }
}

#[async_trait]
impl SyncLogStore for PgStore {
    async fn open_run(&self, client_id: i64, run_kind: SyncRunKind, started_at: i64) -> StoreResult<i64> {
        sync_logs::open(&self.pool, client_id, run_kind, started_at).await
    }

    async fn close_run(
        &self,
        id: i64,
        status: SyncRunStatus,
        finished_at: i64,
        close: &SyncLogClose,
    ) -> StoreResult<bool> {
        sync_logs::close(&self.pool, id, status, finished_at, close).await
    }

    async fn list_runs(&self, client_id: i64, limit: i64) -> StoreResult<Vec<SyncLogEntry>> {
        sync_logs::list(&self.pool, client_id, limit).await
    }

    async fn fail_stale_runs(
        &self,
        started_before: i64,
        finished_at: i64,
        live_clients: &[i64],
        error: &Value,
    ) -> StoreResult<Vec<i64>> {
        sync_logs::fail_stale(&self.pool, started_before, finished_at, live_clients, error).await
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn insert_audit(&self, entry: &NewAuditEntry, created_at: i64) -> StoreResult<AuditLogEntry> {
        audit::insert(&self.pool, entry, created_at).await
    }

    async fn list_audit(&self, client_id: i64, open_only: bool, limit: i64) -> StoreResult<Vec<AuditLogEntry>> {
        audit::list(&self.pool, client_id, open_only, limit).await
    }

    async fn get_audit(&self, id: i64) -> StoreResult<Option<AuditLogEntry>> {
        audit::find(&self.pool, id).await
    }

    async fn resolve_audit(&self, id: i64, notes: &str, resolved_at: i64) -> StoreResult<bool> {
        audit::resolve(&self.pool, id, notes, resolved_at).await
    }
}
