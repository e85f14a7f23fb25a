//! Correction pusher
//!
//! Sets the platform's available quantity of one SKU to the local ledger total.
//! The set is absolute, so repeating a push converges on the same value.
//! Every attempt writes exactly one audit row, successful or not.
//!
//! The pushed quantity is the SKU's ledger total across all locations, while
//! discrepancies are computed against the canonical location only. The two
//! agree as long as a client keeps stock at a single location; the engine
//! warns when it sees otherwise.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use shared::models::{AliasKind, CorrectionOutcome, CorrectionStatus, NewAuditEntry};
use shared::util::now_millis;
use tally_client::{ClientError, RetryPolicy, Sleeper};

use crate::alias::find_conflicts;
use crate::error::{ConfigGap, Refusal, SyncError, SyncResult};
use crate::platform::{InventoryPlatform, PlatformConnector, StoreTarget};
use crate::store::{AliasStore, AuditStore, ClientStoreSource, LedgerReader, SyncStore};

/// Wait between activating an item and retrying the set
pub const ACTIVATION_SETTLE: Duration = Duration::from_millis(500);

/// Retry policy for transient failures during a push: 2s, 4s, 8s
pub fn transient_policy() -> RetryPolicy {
    RetryPolicy::exponential(3, Duration::from_secs(2))
}

/// One SKU to push
#[derive(Debug, Clone, Copy)]
pub struct PushTarget<'a> {
    pub client_id: i64,
    pub sku_id: i64,
    pub external_item_id: &'a str,
    pub external_location_id: &'a str,
}

#[derive(Clone)]
pub struct CorrectionPusher {
    store: Arc<dyn SyncStore>,
    connector: Arc<dyn PlatformConnector>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl CorrectionPusher {
    pub fn new(
        store: Arc<dyn SyncStore>,
        connector: Arc<dyn PlatformConnector>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            store,
            connector,
            sleeper,
            policy: transient_policy(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Push one SKU on demand, resolving its store settings and alias first
    pub async fn push(&self, client_id: i64, sku_id: i64) -> SyncResult<CorrectionOutcome> {
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

        let item_id = self
            .store
            .alias_for_sku(client_id, sku_id, AliasKind::ExternalItemId)
            .await?
            .ok_or_else(|| SyncError::Correction {
                sku_id,
                refusal: Refusal::Unmapped,
                reason: "SKU has no external item id".to_string(),
            })?;

        let aliases = self
            .store
            .list_aliases(client_id, AliasKind::ExternalItemId)
            .await?;
        if let Some(conflict) = find_conflicts(&aliases)
            .into_iter()
            .find(|c| c.alias_value == item_id)
        {
            return Err(SyncError::Correction {
                sku_id,
                refusal: Refusal::Conflicted,
                reason: format!(
                    "external item {} is claimed by SKUs {:?}",
                    conflict.alias_value, conflict.sku_ids
                ),
            });
        }

        let platform = self.connector.connect(&target).await?;
        self.push_to(
            platform.as_ref(),
            PushTarget {
                client_id,
                sku_id,
                external_item_id: &item_id,
                external_location_id: &target.external_location_id,
            },
        )
        .await
    }

    /// Push through an already-connected platform
    ///
    /// Platform failures come back as an unsuccessful, audited outcome; only
    /// storage failures are errors.
    pub async fn push_to(
        &self,
        platform: &dyn InventoryPlatform,
        target: PushTarget<'_>,
    ) -> SyncResult<CorrectionOutcome> {
        let quantity = self.store.sum(target.client_id, target.sku_id, None).await?;

        let before_quantity = match platform
            .inventory_level(target.external_item_id, target.external_location_id)
            .await
        {
            Ok(level) => level,
            Err(e) => {
                tracing::warn!(sku_id = target.sku_id, error = %e, "Could not read level before push");
                None
            }
        };

        let attempts = AtomicU32::new(0);
        let first = self.set_with_retry(platform, &target, quantity, &attempts).await;

        let (status, notes) = match first {
            Ok(()) => (CorrectionStatus::Updated, None),
            Err(e) if e.is_not_stocked() => {
                tracing::info!(
                    sku_id = target.sku_id,
                    item = target.external_item_id,
                    "Item not stocked at location, activating"
                );
                match self.activate_and_retry(platform, &target, quantity, &attempts).await {
                    Ok(()) => (CorrectionStatus::UpdatedAfterActivation, None),
                    Err(reason) => (CorrectionStatus::Failed, Some(reason)),
                }
            }
            Err(e) => (CorrectionStatus::Failed, Some(e.to_string())),
        };

        let attempts = attempts.load(Ordering::Relaxed);
        let audit = self
            .store
            .insert_audit(
                &NewAuditEntry {
                    client_id: target.client_id,
                    sku_id: target.sku_id,
                    external_item_id: target.external_item_id.to_string(),
                    before_quantity,
                    after_quantity: quantity,
                    attempts,
                    status,
                    notes: notes.clone(),
                },
                now_millis(),
            )
            .await?;

        if status.is_success() {
            tracing::info!(
                client_id = target.client_id,
                sku_id = target.sku_id,
                before = ?before_quantity,
                after = quantity,
                %status,
                "Inventory corrected"
            );
        } else {
            tracing::warn!(
                client_id = target.client_id,
                sku_id = target.sku_id,
                attempts,
                reason = notes.as_deref().unwrap_or_default(),
                "Inventory correction failed"
            );
        }

        Ok(CorrectionOutcome {
            sku_id: target.sku_id,
            success: status.is_success(),
            quantity,
            status,
            attempts,
            audit_id: Some(audit.id),
        })
    }

    async fn set_with_retry(
        &self,
        platform: &dyn InventoryPlatform,
        target: &PushTarget<'_>,
        quantity: i64,
        attempts: &AtomicU32,
    ) -> Result<(), ClientError> {
        self.policy
            .execute(
                self.sleeper.as_ref(),
                "inventory_set",
                ClientError::is_transient,
                move || async move {
                    attempts.fetch_add(1, Ordering::Relaxed);
                    platform
                        .set_available(target.external_item_id, target.external_location_id, quantity)
                        .await
                },
            )
            .await
    }

    /// Activate, wait, then set once more; a second failure is final
    async fn activate_and_retry(
        &self,
        platform: &dyn InventoryPlatform,
        target: &PushTarget<'_>,
        quantity: i64,
        attempts: &AtomicU32,
    ) -> Result<(), String> {
        self.policy
            .execute(
                self.sleeper.as_ref(),
                "inventory_activate",
                ClientError::is_transient,
                move || async move {
                    platform
                        .activate(target.external_item_id, target.external_location_id)
                        .await
                },
            )
            .await
            .map_err(|e| format!("activation failed: {e}"))?;

        self.sleeper.sleep(ACTIVATION_SETTLE).await;

        self.set_with_retry(platform, target, quantity, attempts)
            .await
            .map_err(|e| format!("set after activation failed: {e}"))
    }
}
