//! Per-client schedule settings

use shared::models::{SyncConfig, SyncFrequency, SyncRunStatus};
use sqlx::PgPool;

use crate::store::{StoreError, StoreResult};

#[derive(sqlx::FromRow)]
struct SyncConfigRow {
    client_id: i64,
    auto_sync_enabled: bool,
    frequency: String,
    last_sync_at: Option<i64>,
    next_sync_at: Option<i64>,
    last_sync_status: Option<String>,
    auto_correct: bool,
}

impl TryFrom<SyncConfigRow> for SyncConfig {
    type Error = StoreError;

    fn try_from(row: SyncConfigRow) -> Result<Self, Self::Error> {
        let frequency = SyncFrequency::from_db(&row.frequency)
            .ok_or_else(|| StoreError::InvalidData(format!("sync frequency '{}'", row.frequency)))?;
        let last_sync_status = match row.last_sync_status.as_deref() {
            None => None,
            Some(s) => Some(
                SyncRunStatus::from_db(s)
                    .ok_or_else(|| StoreError::InvalidData(format!("sync status '{s}'")))?,
            ),
        };
        Ok(Self {
            client_id: row.client_id,
            auto_sync_enabled: row.auto_sync_enabled,
            frequency,
            last_sync_at: row.last_sync_at,
            next_sync_at: row.next_sync_at,
            last_sync_status,
            auto_correct: row.auto_correct,
        })
    }
}

const COLUMNS: &str =
    "client_id, auto_sync_enabled, frequency, last_sync_at, next_sync_at, last_sync_status, auto_correct";

/// Enabled configs whose next run is unset or has passed, oldest first
pub async fn due(pool: &PgPool, now: i64) -> StoreResult<Vec<SyncConfig>> {
    let rows: Vec<SyncConfigRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM sync_configs
            WHERE auto_sync_enabled AND (next_sync_at IS NULL OR next_sync_at <= $1)
            ORDER BY next_sync_at NULLS FIRST, client_id"
    ))
    .bind(now)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(SyncConfig::try_from).collect()
}

pub async fn find(pool: &PgPool, client_id: i64) -> StoreResult<Option<SyncConfig>> {
    let row: Option<SyncConfigRow> =
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM sync_configs WHERE client_id = $1"))
            .bind(client_id)
            .fetch_optional(pool)
            .await?;
    row.map(SyncConfig::try_from).transpose()
}

pub async fn record_schedule(
    pool: &PgPool,
    client_id: i64,
    last_sync_at: i64,
    next_sync_at: i64,
    status: SyncRunStatus,
) -> StoreResult<()> {
    sqlx::query(
        "UPDATE sync_configs SET last_sync_at = $2, next_sync_at = $3, last_sync_status = $4
            WHERE client_id = $1",
    )
    .bind(client_id)
    .bind(last_sync_at)
    .bind(next_sync_at)
    .bind(status.as_db())
    .execute(pool)
    .await?;
    Ok(())
}
