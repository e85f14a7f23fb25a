//! In-memory store
//!
//! Implements every persistence seam over plain collections. Used by the test
//! suite and for local dry runs without Postgres.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use shared::models::{
    AliasKind, AliasRef, AuditLogEntry, ClientStore, CorrectionStatus, ExternalAlias, LedgerEntry,
    NewAuditEntry, SyncConfig, SyncLogClose, SyncLogEntry, SyncRunKind, SyncRunStatus,
    TransactionKind,
};

use super::{
    AliasStore, AuditStore, ClientStoreSource, LedgerReader, StoreResult, SyncConfigStore,
    SyncLogStore,
};

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    ledger: Vec<LedgerEntry>,
    aliases: Vec<ExternalAlias>,
    client_stores: HashMap<i64, ClientStore>,
    configs: BTreeMap<i64, SyncConfig>,
    logs: BTreeMap<i64, SyncLogEntry>,
    audit: BTreeMap<i64, AuditLogEntry>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ========== Seeding ==========

    /// Append a ledger entry (timestamp is the entry id)
    pub fn record_ledger(&self, client_id: i64, sku_id: i64, location_id: i64, delta: i64, kind: TransactionKind) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.ledger.push(LedgerEntry {
            id,
            client_id,
            sku_id,
            location_id,
            delta,
            kind,
            created_at: id,
            source_ref: None,
        });
        id
    }

    /// Insert an alias row without the upsert check (conflicts included)
    pub fn insert_alias(&self, client_id: i64, sku_id: i64, kind: AliasKind, value: &str) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.aliases.push(ExternalAlias {
            id,
            client_id,
            sku_id,
            kind,
            value: value.to_string(),
            conflict_flagged_at: None,
        });
        id
    }

    pub fn set_client_store(&self, store: ClientStore) {
        self.lock().client_stores.insert(store.client_id, store);
    }

    pub fn set_sync_config(&self, config: SyncConfig) {
        self.lock().configs.insert(config.client_id, config);
    }

    /// Insert a sync log entry as-is (used to simulate crashed runs)
    pub fn insert_sync_log(&self, mut entry: SyncLogEntry) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        entry.id = id;
        state.logs.insert(id, entry);
        id
    }

    // ========== Inspection ==========

    pub fn ledger(&self) -> Vec<LedgerEntry> {
        self.lock().ledger.clone()
    }

    pub fn aliases(&self) -> Vec<ExternalAlias> {
        self.lock().aliases.clone()
    }

    pub fn sync_logs(&self) -> Vec<SyncLogEntry> {
        self.lock().logs.values().cloned().collect()
    }

    pub fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.lock().audit.values().cloned().collect()
    }
}

#[async_trait]
impl LedgerReader for MemoryStore {
    async fn sum(&self, client_id: i64, sku_id: i64, location_id: Option<i64>) -> StoreResult<i64> {
        let state = self.lock();
        Ok(state
            .ledger
            .iter()
            .filter(|e| e.client_id == client_id && e.sku_id == sku_id)
            .filter(|e| location_id.is_none_or(|loc| e.location_id == loc))
            .map(|e| e.delta)
            .sum())
    }

    async fn sum_many(
        &self,
        client_id: i64,
        sku_ids: &[i64],
        location_id: Option<i64>,
    ) -> StoreResult<HashMap<i64, i64>> {
        let state = self.lock();
        let mut sums: HashMap<i64, i64> = sku_ids.iter().map(|id| (*id, 0)).collect();
        for entry in state
            .ledger
            .iter()
            .filter(|e| e.client_id == client_id)
            .filter(|e| location_id.is_none_or(|loc| e.location_id == loc))
        {
            if let Some(total) = sums.get_mut(&entry.sku_id) {
                *total += entry.delta;
            }
        }
        Ok(sums)
    }

    async fn locations_for(&self, client_id: i64, sku_ids: &[i64]) -> StoreResult<HashMap<i64, Vec<i64>>> {
        let state = self.lock();
        let mut seen: HashMap<i64, BTreeSet<i64>> = HashMap::new();
        for entry in state
            .ledger
            .iter()
            .filter(|e| e.client_id == client_id && sku_ids.contains(&e.sku_id))
        {
            seen.entry(entry.sku_id).or_default().insert(entry.location_id);
        }
        Ok(seen
            .into_iter()
            .map(|(sku, locs)| (sku, locs.into_iter().collect()))
            .collect())
    }
}

#[async_trait]
impl AliasStore for MemoryStore {
    async fn list_aliases(&self, client_id: i64, kind: AliasKind) -> StoreResult<Vec<AliasRef>> {
        let state = self.lock();
        let mut refs: Vec<AliasRef> = state
            .aliases
            .iter()
            .filter(|a| a.client_id == client_id && a.kind == kind)
            .map(AliasRef::from)
            .collect();
        refs.sort_by(|a, b| a.sku_id.cmp(&b.sku_id).then_with(|| a.value.cmp(&b.value)));
        Ok(refs)
    }

    async fn alias_for_sku(&self, client_id: i64, sku_id: i64, kind: AliasKind) -> StoreResult<Option<String>> {
        let state = self.lock();
        Ok(state
            .aliases
            .iter()
            .filter(|a| a.client_id == client_id && a.sku_id == sku_id && a.kind == kind)
            .min_by_key(|a| a.id)
            .map(|a| a.value.clone()))
    }

    async fn upsert_alias(
        &self,
        client_id: i64,
        sku_id: i64,
        kind: AliasKind,
        value: &str,
    ) -> StoreResult<ExternalAlias> {
        let mut state = self.lock();
        if let Some(existing) = state
            .aliases
            .iter()
            .find(|a| a.sku_id == sku_id && a.kind == kind && a.value == value)
        {
            return Ok(existing.clone());
        }
        let alias = ExternalAlias {
            id: state.next_id(),
            client_id,
            sku_id,
            kind,
            value: value.to_string(),
            conflict_flagged_at: None,
        };
        state.aliases.push(alias.clone());
        Ok(alias)
    }

    async fn flag_conflicts(&self, client_id: i64, kind: AliasKind, values: &[String], now: i64) -> StoreResult<u64> {
        let mut state = self.lock();
        let mut touched = 0;
        for alias in state
            .aliases
            .iter_mut()
            .filter(|a| a.client_id == client_id && a.kind == kind && values.contains(&a.value))
        {
            alias.conflict_flagged_at = Some(now);
            touched += 1;
        }
        Ok(touched)
    }
}

#[async_trait]
impl ClientStoreSource for MemoryStore {
    async fn client_store(&self, client_id: i64) -> StoreResult<Option<ClientStore>> {
        Ok(self.lock().client_stores.get(&client_id).cloned())
    }
}

#[async_trait]
impl SyncConfigStore for MemoryStore {
    async fn due_configs(&self, now: i64) -> StoreResult<Vec<SyncConfig>> {
        let state = self.lock();
        let mut due: Vec<SyncConfig> = state
            .configs
            .values()
            .filter(|c| c.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|c| (c.next_sync_at.unwrap_or(i64::MIN), c.client_id));
        Ok(due)
    }

    async fn sync_config(&self, client_id: i64) -> StoreResult<Option<SyncConfig>> {
        Ok(self.lock().configs.get(&client_id).cloned())
    }

    async fn record_schedule(
        &self,
        client_id: i64,
        last_sync_at: i64,
        next_sync_at: i64,
        status: SyncRunStatus,
    ) -> StoreResult<()> {
        let mut state = self.lock();
        if let Some(config) = state.configs.get_mut(&client_id) {
            config.last_sync_at = Some(last_sync_at);
            config.next_sync_at = Some(next_sync_at);
            config.last_sync_status = Some(status);
        }
        Ok(())
    }
}

#[async_trait]
impl SyncLogStore for MemoryStore {
    async fn open_run(&self, client_id: i64, run_kind: SyncRunKind, started_at: i64) -> StoreResult<i64> {
        let mut state = self.lock();
        let id = state.next_id();
        state.logs.insert(
            id,
            SyncLogEntry {
                id,
                client_id,
                run_kind,
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
            },
        );
        Ok(id)
    }

    async fn close_run(
        &self,
        id: i64,
        status: SyncRunStatus,
        finished_at: i64,
        close: &SyncLogClose,
    ) -> StoreResult<bool> {
        let mut state = self.lock();
        let Some(entry) = state.logs.get_mut(&id) else {
            return Ok(false);
        };
        if entry.status.is_terminal() {
            return Ok(false);
        }
        entry.status = status;
        entry.finished_at = Some(finished_at);
        entry.total_skus = close.total_skus;
        entry.discrepancies = close.discrepancies;
        entry.conflicts = close.conflicts;
        entry.corrected = close.corrected;
        entry.failed = close.failed;
        entry.duration_ms = Some(close.duration_ms);
        entry.error = close.error.clone();
        Ok(true)
    }

    async fn list_runs(&self, client_id: i64, limit: i64) -> StoreResult<Vec<SyncLogEntry>> {
        let state = self.lock();
        let mut runs: Vec<SyncLogEntry> = state
            .logs
            .values()
            .filter(|l| l.client_id == client_id)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        runs.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(runs)
    }

    async fn fail_stale_runs(
        &self,
        started_before: i64,
        finished_at: i64,
        live_clients: &[i64],
        error: &Value,
    ) -> StoreResult<Vec<i64>> {
        let mut state = self.lock();
        let mut reaped = Vec::new();
        for entry in state.logs.values_mut().filter(|l| {
            l.status == SyncRunStatus::InProgress
                && l.started_at < started_before
                && !live_clients.contains(&l.client_id)
        }) {
            entry.status = SyncRunStatus::Failed;
            entry.finished_at = Some(finished_at);
            entry.duration_ms = Some(finished_at - entry.started_at);
            entry.error = Some(error.clone());
            reaped.push(entry.id);
        }
        Ok(reaped)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn insert_audit(&self, entry: &NewAuditEntry, created_at: i64) -> StoreResult<AuditLogEntry> {
        let mut state = self.lock();
        let row = AuditLogEntry {
            id: state.next_id(),
            client_id: entry.client_id,
            sku_id: entry.sku_id,
            external_item_id: entry.external_item_id.clone(),
            before_quantity: entry.before_quantity,
            after_quantity: entry.after_quantity,
            attempts: entry.attempts,
            auto_correction_success: entry.status.is_success(),
            status: entry.status,
            notes: entry.notes.clone(),
            created_at,
            resolved_at: None,
            resolution_notes: None,
        };
        state.audit.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_audit(&self, client_id: i64, open_only: bool, limit: i64) -> StoreResult<Vec<AuditLogEntry>> {
        let state = self.lock();
        let mut rows: Vec<AuditLogEntry> = state
            .audit
            .values()
            .filter(|a| a.client_id == client_id)
            .filter(|a| !open_only || (a.status == CorrectionStatus::Failed && a.resolved_at.is_none()))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn get_audit(&self, id: i64) -> StoreResult<Option<AuditLogEntry>> {
        Ok(self.lock().audit.get(&id).cloned())
    }

    async fn resolve_audit(&self, id: i64, notes: &str, resolved_at: i64) -> StoreResult<bool> {
        let mut state = self.lock();
        match state.audit.get_mut(&id) {
            Some(row) if row.resolved_at.is_none() => {
                row.resolved_at = Some(resolved_at);
                row.resolution_notes = Some(notes.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sums_are_scoped_by_location() {
        let store = MemoryStore::new();
        store.record_ledger(1, 10, 100, 50, TransactionKind::Receipt);
        store.record_ledger(1, 10, 100, -5, TransactionKind::Shipment);
        store.record_ledger(1, 10, 200, 7, TransactionKind::Transfer);
        store.record_ledger(2, 10, 100, 999, TransactionKind::Receipt);

        assert_eq!(store.sum(1, 10, None).await.unwrap(), 52);
        assert_eq!(store.sum(1, 10, Some(100)).await.unwrap(), 45);
        assert_eq!(store.sum(1, 11, None).await.unwrap(), 0);

        let many = store.sum_many(1, &[10, 11], Some(100)).await.unwrap();
        assert_eq!(many[&10], 45);
        assert_eq!(many[&11], 0);

        let locs = store.locations_for(1, &[10, 11]).await.unwrap();
        assert_eq!(locs[&10], vec![100, 200]);
        assert!(!locs.contains_key(&11));
    }

    #[tokio::test]
    async fn close_run_only_once() {
        let store = MemoryStore::new();
        let id = store.open_run(1, SyncRunKind::ManualDryRun, 1_000).await.unwrap();
        let close = SyncLogClose { duration_ms: 5, ..Default::default() };

        assert!(store.close_run(id, SyncRunStatus::Success, 1_005, &close).await.unwrap());
        assert!(!store.close_run(id, SyncRunStatus::Failed, 1_010, &close).await.unwrap());
        assert_eq!(store.sync_logs()[0].status, SyncRunStatus::Success);
    }

    #[tokio::test]
    async fn upsert_alias_is_idempotent() {
        let store = MemoryStore::new();
        let a = store.upsert_alias(1, 10, AliasKind::ExternalItemId, "gid://x/1").await.unwrap();
        let b = store.upsert_alias(1, 10, AliasKind::ExternalItemId, "gid://x/1").await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(store.aliases().len(), 1);
    }
}
