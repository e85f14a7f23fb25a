//! Ledger aggregation queries

use std::collections::HashMap;

use sqlx::PgPool;

use crate::store::StoreResult;

/// Sum of deltas for one SKU (0 when it has no entries)
pub async fn sum(pool: &PgPool, client_id: i64, sku_id: i64, location_id: Option<i64>) -> StoreResult<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(delta), 0)::BIGINT FROM ledger_entries
            WHERE client_id = $1 AND sku_id = $2 AND ($3::BIGINT IS NULL OR location_id = $3)",
    )
    .bind(client_id)
    .bind(sku_id)
    .bind(location_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Per-SKU sums in one round trip; SKUs without entries map to 0
pub async fn sum_many(
    pool: &PgPool,
    client_id: i64,
    sku_ids: &[i64],
    location_id: Option<i64>,
) -> StoreResult<HashMap<i64, i64>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT sku_id, COALESCE(SUM(delta), 0)::BIGINT FROM ledger_entries
            WHERE client_id = $1 AND sku_id = ANY($2) AND ($3::BIGINT IS NULL OR location_id = $3)
            GROUP BY sku_id",
    )
    .bind(client_id)
    .bind(sku_ids)
    .bind(location_id)
    .fetch_all(pool)
    .await?;

    let mut sums: HashMap<i64, i64> = sku_ids.iter().map(|id| (*id, 0)).collect();
    sums.extend(rows);
    Ok(sums)
}

pub async fn locations_for(pool: &PgPool, client_id: i64, sku_ids: &[i64]) -> StoreResult<HashMap<i64, Vec<i64>>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT DISTINCT sku_id, location_id FROM ledger_entries
            WHERE client_id = $1 AND sku_id = ANY($2)
            ORDER BY sku_id, location_id",
    )
    .bind(client_id)
    .bind(sku_ids)
    .fetch_all(pool)
    .await?;

    let mut out: HashMap<i64, Vec<i64>> = HashMap::new();
    for (sku_id, location_id) in rows {
        out.entry(sku_id).or_default().push(location_id);
    }
    Ok(out)
}
