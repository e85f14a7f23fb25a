//! Correction audit log operations

use shared::models::{AuditLogEntry, CorrectionStatus, NewAuditEntry};
use sqlx::PgPool;

use crate::store::{StoreError, StoreResult};

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    client_id: i64,
    sku_id: i64,
    external_item_id: String,
    before_quantity: Option<i64>,
    after_quantity: i64,
    attempts: i32,
    auto_correction_success: bool,
    status: String,
    notes: Option<String>,
    created_at: i64,
    resolved_at: Option<i64>,
    resolution_notes: Option<String>,
}

impl TryFrom<AuditRow> for AuditLogEntry {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let status = CorrectionStatus::from_db(&row.status)
            .ok_or_else(|| StoreError::InvalidData(format!("correction status '{}'", row.status)))?;
        Ok(Self {
            id: row.id,
            client_id: row.client_id,
            sku_id: row.sku_id,
            external_item_id: row.external_item_id,
            before_quantity: row.before_quantity,
            after_quantity: row.after_quantity,
            attempts: u32::try_from(row.attempts).unwrap_or(0),
            auto_correction_success: row.auto_correction_success,
            status,
            notes: row.notes,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
            resolution_notes: row.resolution_notes,
        })
    }
}

const COLUMNS: &str = "id, client_id, sku_id, external_item_id, before_quantity, after_quantity, attempts,
    auto_correction_success, status, notes, created_at, resolved_at, resolution_notes";

pub async fn insert(pool: &PgPool, entry: &NewAuditEntry, created_at: i64) -> StoreResult<AuditLogEntry> {
    let row: AuditRow = sqlx::query_as(&format!(
        "INSERT INTO inventory_audit_logs
            (client_id, sku_id, external_item_id, before_quantity, after_quantity, attempts,
             auto_correction_success, status, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {COLUMNS}"
    ))
    .bind(entry.client_id)
    .bind(entry.sku_id)
    .bind(&entry.external_item_id)
    .bind(entry.before_quantity)
    .bind(entry.after_quantity)
    .bind(i32::try_from(entry.attempts).unwrap_or(i32::MAX))
    .bind(entry.status.is_success())
    .bind(entry.status.as_db())
    .bind(&entry.notes)
    .bind(created_at)
    .fetch_one(pool)
    .await?;
    row.try_into()
}

pub async fn list(pool: &PgPool, client_id: i64, open_only: bool, limit: i64) -> StoreResult<Vec<AuditLogEntry>> {
    let rows: Vec<AuditRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM inventory_audit_logs
            WHERE client_id = $1
              AND (NOT $2 OR (status = 'failed' AND resolved_at IS NULL))
            ORDER BY created_at DESC, id DESC LIMIT $3"
    ))
    .bind(client_id)
    .bind(open_only)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(AuditLogEntry::try_from).collect()
}

pub async fn find(pool: &PgPool, id: i64) -> StoreResult<Option<AuditLogEntry>> {
    let row: Option<AuditRow> =
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM inventory_audit_logs WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    row.map(AuditLogEntry::try_from).transpose()
}

pub async fn resolve(pool: &PgPool, id: i64, notes: &str, resolved_at: i64) -> StoreResult<bool> {
    let result = sqlx::query(
        "UPDATE inventory_audit_logs SET resolved_at = $2, resolution_notes = $3
            WHERE id = $1 AND resolved_at IS NULL",
    )
    .bind(id)
    .bind(resolved_at)
    .bind(notes)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
