//! Sync run log
//!
//! Entries open as `in_progress` and are closed exactly once. Every close is
//! guarded by `status = 'in_progress'` so a reaped run cannot be overwritten.

use shared::models::{SyncLogClose, SyncLogEntry, SyncRunKind, SyncRunStatus};
use sqlx::PgPool;

use crate::store::{StoreError, StoreResult};

#[derive(sqlx::FromRow)]
struct SyncLogRow {
    id: i64,
    client_id: i64,
    run_kind: String,
    status: String,
    started_at: i64,
    finished_at: Option<i64>,
    total_skus: i64,
    discrepancies: i64,
    conflicts: i64,
    corrected: i64,
    failed: i64,
    duration_ms: Option<i64>,
    error: Option<serde_json::Value>,
}

impl TryFrom<SyncLogRow> for SyncLogEntry {
    type Error = StoreError;

    fn try_from(row: SyncLogRow) -> Result<Self, Self::Error> {
        let run_kind = SyncRunKind::from_db(&row.run_kind)
            .ok_or_else(|| StoreError::InvalidData(format!("run kind '{}'", row.run_kind)))?;
        let status = SyncRunStatus::from_db(&row.status)
            .ok_or_else(|| StoreError::InvalidData(format!("sync status '{}'", row.status)))?;
        Ok(Self {
            id: row.id,
            client_id: row.client_id,
            run_kind,
            status,
            started_at: row.started_at,
            finished_at: row.finished_at,
            total_skus: row.total_skus,
            discrepancies: row.discrepancies,
            conflicts: row.conflicts,
            corrected: row.corrected,
            failed: row.failed,
            duration_ms: row.duration_ms,
            error: row.error,
        })
    }
}

pub async fn open(pool: &PgPool, client_id: i64, run_kind: SyncRunKind, started_at: i64) -> StoreResult<i64> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO sync_logs (client_id, run_kind, status, started_at)
            VALUES ($1, $2, 'in_progress', $3) RETURNING id",
    )
    .bind(client_id)
    .bind(run_kind.as_db())
    .bind(started_at)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn close(
    pool: &PgPool,
    id: i64,
    status: SyncRunStatus,
    finished_at: i64,
    close: &SyncLogClose,
) -> StoreResult<bool> {
    let result = sqlx::query(
        "UPDATE sync_logs SET status = $2, finished_at = $3, total_skus = $4, discrepancies = $5,
            conflicts = $6, corrected = $7, failed = $8, duration_ms = $9, error = $10
            WHERE id = $1 AND status = 'in_progress'",
    )
    .bind(id)
    .bind(status.as_db())
    .bind(finished_at)
    .bind(close.total_skus)
    .bind(close.discrepancies)
    .bind(close.conflicts)
    .bind(close.corrected)
    .bind(close.failed)
    .bind(close.duration_ms)
    .bind(&close.error)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list(pool: &PgPool, client_id: i64, limit: i64) -> StoreResult<Vec<SyncLogEntry>> {
    let rows: Vec<SyncLogRow> = sqlx::query_as(
        "SELECT id, client_id, run_kind, status, started_at, finished_at, total_skus,
            discrepancies, conflicts, corrected, failed, duration_ms, error
            FROM sync_logs WHERE client_id = $1
            ORDER BY started_at DESC, id DESC LIMIT $2",
    )
    .bind(client_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(SyncLogEntry::try_from).collect()
}

/// Fail runs left in progress by a crashed process
pub async fn fail_stale(
    pool: &PgPool,
    started_before: i64,
    finished_at: i64,
    live_clients: &[i64],
    error: &serde_json::Value,
) -> StoreResult<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "UPDATE sync_logs SET status = 'failed', finished_at = $2,
            duration_ms = $2 - started_at, error = $3
            WHERE status = 'in_progress' AND started_at < $1
              AND NOT (client_id = ANY($4))
            RETURNING id",
    )
    .bind(started_before)
    .bind(finished_at)
    .bind(error)
    .bind(live_clients)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
