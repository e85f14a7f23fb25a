//! Shared fixtures: in-memory platform, connector and a seeded store

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shared::models::{AliasKind, ClientStore, TransactionKind};
use tally_client::types::UserError;
use tally_client::{ClientError, ClientResult, RecordingSleeper, RemoteLevel};
use tally_sync::store::MemoryStore;
use tally_sync::{InventoryPlatform, PlatformConnector, ReconciliationEngine, StoreTarget, SyncResult};

pub const CLIENT: i64 = 1;
pub const LOCATION: i64 = 10;
pub const OTHER_LOCATION: i64 = 20;
pub const EXTERNAL_LOCATION: &str = "gid://shopify/Location/1";

pub fn item(n: u32) -> String {
    format!("gid://shopify/InventoryItem/{n}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Levels,
    Level(String),
    Set(String, i64),
    Activate(String),
}

#[derive(Default)]
struct FakeState {
    levels: BTreeMap<String, i64>,
    unstocked: BTreeSet<String>,
    set_failures: VecDeque<ClientError>,
    activate_failures: VecDeque<ClientError>,
    /// Activation reports success but the item stays unstocked
    activation_ineffective: bool,
    calls: Vec<Call>,
}

/// Platform double keyed by inventory item id at a single location
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn set_level(&self, item_id: &str, quantity: i64) {
        self.lock().levels.insert(item_id.to_string(), quantity);
    }

    /// Item exists but is not stocked at the location
    pub fn unstock(&self, item_id: &str) {
        let mut state = self.lock();
        state.levels.remove(item_id);
        state.unstocked.insert(item_id.to_string());
    }

    pub fn fail_next_set(&self, error: ClientError) {
        self.lock().set_failures.push_back(error);
    }

    pub fn fail_next_activate(&self, error: ClientError) {
        self.lock().activate_failures.push_back(error);
    }

    pub fn make_activation_ineffective(&self) {
        self.lock().activation_ineffective = true;
    }

    pub fn level(&self, item_id: &str) -> Option<i64> {
        self.lock().levels.get(item_id).copied()
    }

    pub fn levels(&self) -> BTreeMap<String, i64> {
        self.lock().levels.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Mutating calls only
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Set(..) | Call::Activate(_)))
            .collect()
    }
}

pub fn not_stocked_error() -> ClientError {
    ClientError::UserErrors(vec![UserError {
        field: Some(vec!["input".into(), "quantities".into(), "0".into()]),
        message: "The item is not stocked at the location.".into(),
        code: Some("ITEM_NOT_STOCKED_AT_LOCATION".into()),
    }])
}

#[async_trait]
impl InventoryPlatform for FakePlatform {
    async fn inventory_levels(&self, location_gid: &str) -> ClientResult<Vec<RemoteLevel>> {
        let mut state = self.lock();
        state.calls.push(Call::Levels);
        assert_eq!(location_gid, EXTERNAL_LOCATION);
        Ok(state
            .levels
            .iter()
            .map(|(item_id, quantity)| RemoteLevel {
                item_id: item_id.clone(),
                quantity: *quantity,
            })
            .collect())
    }

    async fn inventory_level(&self, item_gid: &str, _location_gid: &str) -> ClientResult<Option<i64>> {
        let mut state = self.lock();
        state.calls.push(Call::Level(item_gid.to_string()));
        Ok(state.levels.get(item_gid).copied())
    }

    async fn set_available(&self, item_gid: &str, _location_gid: &str, quantity: i64) -> ClientResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::Set(item_gid.to_string(), quantity));
        if let Some(err) = state.set_failures.pop_front() {
            return Err(err);
        }
        if state.unstocked.contains(item_gid) {
            return Err(not_stocked_error());
        }
        state.levels.insert(item_gid.to_string(), quantity);
        Ok(())
    }

    async fn activate(&self, item_gid: &str, _location_gid: &str) -> ClientResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::Activate(item_gid.to_string()));
        if let Some(err) = state.activate_failures.pop_front() {
            return Err(err);
        }
        if !state.activation_ineffective {
            state.unstocked.remove(item_gid);
            state.levels.entry(item_gid.to_string()).or_insert(0);
        }
        Ok(())
    }
}

/// Hands out the same fake platform and counts connections
pub struct FakeConnector {
    pub platform: Arc<FakePlatform>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(platform: Arc<FakePlatform>) -> Self {
        Self {
            platform,
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformConnector for FakeConnector {
    async fn connect(&self, target: &StoreTarget) -> SyncResult<Arc<dyn InventoryPlatform>> {
        assert_eq!(target.external_location_id, EXTERNAL_LOCATION);
        self.connects.fetch_add(1, Ordering::SeqCst);
        let platform: Arc<dyn InventoryPlatform> = self.platform.clone();
        Ok(platform)
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub platform: Arc<FakePlatform>,
    pub connector: Arc<FakeConnector>,
    pub sleeper: Arc<RecordingSleeper>,
    pub engine: ReconciliationEngine,
}

impl Harness {
    /// Store with a fully configured client, empty ledger and no aliases
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        store.set_client_store(client_store());

        let platform = Arc::new(FakePlatform::new());
        let connector = Arc::new(FakeConnector::new(platform.clone()));
        let sleeper = Arc::new(RecordingSleeper::new());
        let engine = ReconciliationEngine::new(store.clone(), connector.clone(), sleeper.clone());

        Self {
            store,
            platform,
            connector,
            sleeper,
            engine,
        }
    }

    /// Ledger entries at the canonical location summing to `quantity`
    pub fn stock(&self, sku_id: i64, quantity: i64) {
        self.store
            .record_ledger(CLIENT, sku_id, LOCATION, quantity, TransactionKind::Receipt);
    }

    pub fn map(&self, sku_id: i64, item_id: &str) {
        self.store
            .insert_alias(CLIENT, sku_id, AliasKind::ExternalItemId, item_id);
    }
}

pub fn client_store() -> ClientStore {
    ClientStore {
        client_id: CLIENT,
        shop_domain: Some("acme.myshopify.com".into()),
        access_token: Some("shpat_test".into()),
        location_id: Some(LOCATION),
        external_location_id: Some(EXTERNAL_LOCATION.into()),
    }
}
