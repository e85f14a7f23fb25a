//! Typed inventory operations
//!
//! Quantities are read and written under the `available` name. Writes are
//! absolute sets, so repeating one is harmless.

use serde_json::json;

use crate::types::{
    InventoryActivateData, InventoryItemLevelData, InventoryLevelNode, InventorySetQuantitiesData,
    RemoteLevel,
};
use crate::{ClientError, ClientResult, StorefrontClient};

pub const QUANTITY_NAME: &str = "available";

/// Reason recorded by the platform for our writes
const SET_REASON: &str = "correction";

pub const INVENTORY_LEVELS_QUERY: &str = r#"
query InventoryLevels($locationId: ID!, $after: String) {
  location(id: $locationId) {
    inventoryLevels(first: 250, after: $after) {
      nodes {
        item { id }
        quantities(names: ["available"]) { name quantity }
      }
      pageInfo { hasNextPage endCursor }
    }
  }
}
"#;

pub const INVENTORY_LEVEL_QUERY: &str = r#"
query InventoryLevel($itemId: ID!, $locationId: ID!) {
  inventoryItem(id: $itemId) {
    inventoryLevel(locationId: $locationId) {
      quantities(names: ["available"]) { name quantity }
    }
  }
}
"#;

pub const SET_QUANTITIES_MUTATION: &str = r#"
mutation SetAvailable($input: InventorySetQuantitiesInput!) {
  inventorySetQuantities(input: $input) {
    inventoryAdjustmentGroup { id }
    userErrors { field message code }
  }
}
"#;

pub const ACTIVATE_MUTATION: &str = r#"
mutation Activate($inventoryItemId: ID!, $locationId: ID!) {
  inventoryActivate(inventoryItemId: $inventoryItemId, locationId: $locationId) {
    inventoryLevel { id }
    userErrors { field message }
  }
}
"#;

impl StorefrontClient {
    /// Every inventory level stocked at `location_gid`
    pub async fn inventory_levels(&self, location_gid: &str) -> ClientResult<Vec<RemoteLevel>> {
        let nodes: Vec<InventoryLevelNode> = self
            .query_paginated(
                INVENTORY_LEVELS_QUERY,
                json!({ "locationId": location_gid }),
                &["location", "inventoryLevels"],
            )
            .await?;

        Ok(nodes
            .into_iter()
            .map(|node| RemoteLevel {
                quantity: node.quantity(QUANTITY_NAME).unwrap_or(0),
                item_id: node.item.id,
            })
            .collect())
    }

    /// Quantity of one item at one location; `None` when not stocked there
    pub async fn inventory_level(&self, item_gid: &str, location_gid: &str) -> ClientResult<Option<i64>> {
        let data: InventoryItemLevelData = self
            .query(
                INVENTORY_LEVEL_QUERY,
                json!({ "itemId": item_gid, "locationId": location_gid }),
            )
            .await?;

        let item = data
            .inventory_item
            .ok_or_else(|| ClientError::InvalidResponse(format!("inventory item {item_gid} not found")))?;

        Ok(item
            .inventory_level
            .map(|level| level.quantity(QUANTITY_NAME).unwrap_or(0)))
    }

    /// Set the absolute available quantity of an item at a location
    pub async fn set_available_quantity(
        &self,
        item_gid: &str,
        location_gid: &str,
        quantity: i64,
    ) -> ClientResult<()> {
        let input = json!({
            "name": QUANTITY_NAME,
            "reason": SET_REASON,
            "ignoreCompareQuantity": true,
            "quantities": [{
                "inventoryItemId": item_gid,
                "locationId": location_gid,
                "quantity": quantity,
            }],
        });

        let data: InventorySetQuantitiesData = self
            .query(SET_QUANTITIES_MUTATION, json!({ "input": input }))
            .await?;

        let payload = data.inventory_set_quantities.ok_or_else(|| {
            ClientError::InvalidResponse("missing inventorySetQuantities payload".to_string())
        })?;

        if !payload.user_errors.is_empty() {
            return Err(ClientError::UserErrors(payload.user_errors));
        }

        tracing::debug!(
            item = item_gid,
            location = location_gid,
            quantity,
            group = ?payload.inventory_adjustment_group.and_then(|g| g.id),
            "Available quantity set"
        );
        Ok(())
    }

    /// Start stocking an item at a location
    pub async fn activate_inventory(&self, item_gid: &str, location_gid: &str) -> ClientResult<()> {
        let data: InventoryActivateData = self
            .query(
                ACTIVATE_MUTATION,
                json!({ "inventoryItemId": item_gid, "locationId": location_gid }),
            )
            .await?;

        let payload = data
            .inventory_activate
            .ok_or_else(|| ClientError::InvalidResponse("missing inventoryActivate payload".to_string()))?;

        if !payload.user_errors.is_empty() {
            return Err(ClientError::UserErrors(payload.user_errors));
        }
        if payload.inventory_level.is_none() {
            return Err(ClientError::InvalidResponse(
                "inventoryActivate returned no level".to_string(),
            ));
        }

        tracing::info!(item = item_gid, location = location_gid, "Inventory activated at location");
        Ok(())
    }
}
