//! External platform seam
//!
//! The engine and pusher talk to [`InventoryPlatform`]; a [`PlatformConnector`]
//! builds one per client from its stored credentials.

use std::sync::Arc;

use async_trait::async_trait;
use shared::models::ClientStore;
use tally_client::{ClientConfig, ClientResult, RemoteLevel, Sleeper, StorefrontClient, TokioSleeper};

use crate::error::{ConfigGap, SyncError, SyncResult};

/// Inventory operations the reconciler needs from the platform
#[async_trait]
pub trait InventoryPlatform: Send + Sync {
    /// Every level at a location (all pages)
    async fn inventory_levels(&self, location_gid: &str) -> ClientResult<Vec<RemoteLevel>>;

    /// Current available quantity; `None` if the item is not stocked there
    async fn inventory_level(&self, item_gid: &str, location_gid: &str) -> ClientResult<Option<i64>>;

    /// Absolute set
    async fn set_available(&self, item_gid: &str, location_gid: &str, quantity: i64) -> ClientResult<()>;

    async fn activate(&self, item_gid: &str, location_gid: &str) -> ClientResult<()>;
}

#[async_trait]
impl InventoryPlatform for StorefrontClient {
    async fn inventory_levels(&self, location_gid: &str) -> ClientResult<Vec<RemoteLevel>> {
        StorefrontClient::inventory_levels(self, location_gid).await
    }

    async fn inventory_level(&self, item_gid: &str, location_gid: &str) -> ClientResult<Option<i64>> {
        StorefrontClient::inventory_level(self, item_gid, location_gid).await
    }

    async fn set_available(&self, item_gid: &str, location_gid: &str, quantity: i64) -> ClientResult<()> {
        self.set_available_quantity(item_gid, location_gid, quantity).await
    }

    async fn activate(&self, item_gid: &str, location_gid: &str) -> ClientResult<()> {
        self.activate_inventory(item_gid, location_gid).await
    }
}

/// Store settings required before a client can be reconciled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTarget {
    pub shop_domain: String,
    pub access_token: String,
    /// Canonical local location
    pub location_id: i64,
    /// Platform GID of the same location
    pub external_location_id: String,
}

impl StoreTarget {
    /// Fail with a configuration error naming the first missing field
    pub fn from_client_store(store: &ClientStore) -> SyncResult<Self> {
        let missing = |gap: ConfigGap, field: &str| {
            SyncError::configuration(gap, format!("client {} has no {field}", store.client_id))
        };
        let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.trim().is_empty()).map(str::to_string);

        Ok(Self {
            shop_domain: non_empty(&store.shop_domain)
                .ok_or_else(|| missing(ConfigGap::Credentials, "shop domain"))?,
            access_token: non_empty(&store.access_token)
                .ok_or_else(|| missing(ConfigGap::Credentials, "access token"))?,
            location_id: store
                .location_id
                .ok_or_else(|| missing(ConfigGap::Location, "canonical location"))?,
            external_location_id: non_empty(&store.external_location_id)
                .ok_or_else(|| missing(ConfigGap::Location, "external location mapping"))?,
        })
    }
}

/// Builds a platform handle for one client
#[async_trait]
pub trait PlatformConnector: Send + Sync {
    async fn connect(&self, target: &StoreTarget) -> SyncResult<Arc<dyn InventoryPlatform>>;
}

/// Production connector: one [`StorefrontClient`] per call
pub struct StorefrontConnector {
    api_version: String,
    timeout_secs: u64,
    sleeper: Arc<dyn Sleeper>,
}

impl StorefrontConnector {
    pub fn new(api_version: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            api_version: api_version.into(),
            timeout_secs,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

#[async_trait]
impl PlatformConnector for StorefrontConnector {
    async fn connect(&self, target: &StoreTarget) -> SyncResult<Arc<dyn InventoryPlatform>> {
        let config = ClientConfig::new(&target.shop_domain, &target.access_token)
            .with_api_version(&self.api_version)
            .with_timeout(self.timeout_secs);
        let client: Arc<dyn InventoryPlatform> =
            Arc::new(StorefrontClient::new(&config)?.with_sleeper(self.sleeper.clone()));
        Ok(client)
    }
}
