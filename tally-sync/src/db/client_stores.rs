//! Client store credentials and location mapping

use shared::models::ClientStore;
use sqlx::PgPool;

use crate::store::StoreResult;

#[derive(sqlx::FromRow)]
struct ClientStoreRow {
    client_id: i64,
    shop_domain: Option<String>,
    access_token: Option<String>,
    location_id: Option<i64>,
    external_location_id: Option<String>,
}

pub async fn find(pool: &PgPool, client_id: i64) -> StoreResult<Option<ClientStore>> {
    let row: Option<ClientStoreRow> = sqlx::query_as(
        "SELECT client_id, shop_domain, access_token, location_id, external_location_id
            FROM client_stores WHERE client_id = $1",
    )
    .bind(client_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| ClientStore {
        client_id: r.client_id,
        shop_domain: r.shop_domain,
        access_token: r.access_token,
        location_id: r.location_id,
        external_location_id: r.external_location_id,
    }))
}
