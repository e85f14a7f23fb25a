//! Correction audit follow-up

use shared::models::AuditLogEntry;
use shared::util::now_millis;

use crate::error::{SyncError, SyncResult};
use crate::store::AuditStore;

/// Mark a failed correction as handled by an operator
///
/// Successful corrections are settled on insert and count as resolved.
pub async fn resolve_audit<S>(store: &S, audit_id: i64, notes: &str) -> SyncResult<AuditLogEntry>
where
    S: AuditStore + ?Sized,
{
    let entry = store
        .get_audit(audit_id)
        .await?
        .ok_or_else(|| SyncError::NotFound(format!("audit entry {audit_id}")))?;

    if entry.resolved_at.is_some() || entry.status.is_success() {
        return Err(SyncError::AlreadyResolved(audit_id));
    }

    if !store.resolve_audit(audit_id, notes, now_millis()).await? {
        // resolved concurrently between the read and the write
        return Err(SyncError::AlreadyResolved(audit_id));
    }
    tracing::info!(audit_id, client_id = entry.client_id, sku_id = entry.sku_id, "Audit entry resolved");

    store
        .get_audit(audit_id)
        .await?
        .ok_or_else(|| SyncError::NotFound(format!("audit entry {audit_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use shared::models::{CorrectionStatus, NewAuditEntry};

    fn entry(status: CorrectionStatus) -> NewAuditEntry {
        NewAuditEntry {
            client_id: 1,
            sku_id: 2,
            external_item_id: "gid://shopify/InventoryItem/3".into(),
            before_quantity: Some(4),
            after_quantity: 5,
            attempts: 1,
            status,
            notes: None,
        }
    }

    #[tokio::test]
    async fn failed_entry_resolves_once() {
        let store = MemoryStore::new();
        let row = store.insert_audit(&entry(CorrectionStatus::Failed), 10).await.unwrap();

        let resolved = resolve_audit(&store, row.id, "recounted shelf").await.unwrap();
        assert!(resolved.resolved_at.is_some());
        assert_eq!(resolved.resolution_notes.as_deref(), Some("recounted shelf"));
        assert_eq!(resolved.after_quantity, 5);

        let again = resolve_audit(&store, row.id, "twice").await.unwrap_err();
        assert!(matches!(again, SyncError::AlreadyResolved(id) if id == row.id));
    }

    #[tokio::test]
    async fn successful_entry_needs_no_resolution() {
        let store = MemoryStore::new();
        let row = store.insert_audit(&entry(CorrectionStatus::Updated), 10).await.unwrap();
        assert!(matches!(
            resolve_audit(&store, row.id, "n/a").await,
            Err(SyncError::AlreadyResolved(_))
        ));
    }

    #[tokio::test]
    async fn unknown_entry_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(resolve_audit(&store, 99, "x").await, Err(SyncError::NotFound(_))));
    }
}
