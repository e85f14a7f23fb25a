//! External alias queries

use shared::models::{AliasKind, AliasRef, ExternalAlias};
use sqlx::PgPool;

use crate::store::{StoreError, StoreResult};

#[derive(sqlx::FromRow)]
struct AliasRow {
    id: i64,
    client_id: i64,
    sku_id: i64,
    kind: String,
    value: String,
    conflict_flagged_at: Option<i64>,
}

impl TryFrom<AliasRow> for ExternalAlias {
    type Error = StoreError;

    fn try_from(row: AliasRow) -> Result<Self, Self::Error> {
        let kind = AliasKind::from_db(&row.kind)
            .ok_or_else(|| StoreError::InvalidData(format!("alias kind '{}'", row.kind)))?;
        Ok(Self {
            id: row.id,
            client_id: row.client_id,
            sku_id: row.sku_id,
            kind,
            value: row.value,
            conflict_flagged_at: row.conflict_flagged_at,
        })
    }
}

pub async fn list(pool: &PgPool, client_id: i64, kind: AliasKind) -> StoreResult<Vec<AliasRef>> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT sku_id, value FROM external_aliases
            WHERE client_id = $1 AND kind = $2
            ORDER BY sku_id, value",
    )
    .bind(client_id)
    .bind(kind.as_db())
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(sku_id, value)| AliasRef { sku_id, value })
        .collect())
}

pub async fn find_for_sku(pool: &PgPool, client_id: i64, sku_id: i64, kind: AliasKind) -> StoreResult<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT value FROM external_aliases
            WHERE client_id = $1 AND sku_id = $2 AND kind = $3
            ORDER BY id LIMIT 1",
    )
    .bind(client_id)
    .bind(sku_id)
    .bind(kind.as_db())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.0))
}

/// Insert or return the existing `(sku_id, kind, value)` row
pub async fn upsert(
    pool: &PgPool,
    client_id: i64,
    sku_id: i64,
    kind: AliasKind,
    value: &str,
) -> StoreResult<ExternalAlias> {
    let row: AliasRow = sqlx::query_as(
        "INSERT INTO external_aliases (client_id, sku_id, kind, value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (sku_id, kind, value) DO UPDATE SET value = EXCLUDED.value
            RETURNING id, client_id, sku_id, kind, value, conflict_flagged_at",
    )
    .bind(client_id)
    .bind(sku_id)
    .bind(kind.as_db())
    .bind(value)
    .fetch_one(pool)
    .await?;
    row.try_into()
}

pub async fn flag_conflicts(
    pool: &PgPool,
    client_id: i64,
    kind: AliasKind,
    values: &[String],
    now: i64,
) -> StoreResult<u64> {
    if values.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        "UPDATE external_aliases SET conflict_flagged_at = $4
            WHERE client_id = $1 AND kind = $2 AND value = ANY($3)",
    )
    .bind(client_id)
    .bind(kind.as_db())
    .bind(values)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
