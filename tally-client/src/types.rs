//! Decoded GraphQL response types
//!
//! Every query and mutation the client issues decodes into one of these;
//! nothing downstream pokes at raw JSON.

use serde::{Deserialize, Serialize};

use crate::error::{NOT_STOCKED_CODE, mentions_not_stocked};

/// Top-level GraphQL response envelope
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

/// One entry of the top-level `errors` list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub locations: Vec<ErrorLocation>,
    #[serde(default)]
    pub path: Vec<serde_json::Value>,
    #[serde(default)]
    pub extensions: Option<ErrorExtensions>,
}

impl GraphQlError {
    pub fn code(&self) -> Option<&str> {
        self.extensions.as_ref().and_then(|e| e.code.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorLocation {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorExtensions {
    pub code: Option<String>,
}

/// Mutation-level validation error
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserError {
    pub field: Option<Vec<String>>,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl UserError {
    pub fn is_not_stocked(&self) -> bool {
        self.code.as_deref() == Some(NOT_STOCKED_CODE) || mentions_not_stocked(&self.message)
    }
}

/// Relay cursor info
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// A `nodes` + `pageInfo` connection
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<N> {
    pub nodes: Vec<N>,
    pub page_info: PageInfo,
}

// ========== Inventory levels ==========

#[derive(Debug, Clone, Deserialize)]
pub struct ItemRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedQuantity {
    pub name: String,
    pub quantity: i64,
}

/// Node of `location.inventoryLevels`
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryLevelNode {
    pub item: ItemRef,
    #[serde(default)]
    pub quantities: Vec<NamedQuantity>,
}

impl InventoryLevelNode {
    pub fn quantity(&self, name: &str) -> Option<i64> {
        quantity_named(&self.quantities, name)
    }
}

fn quantity_named(quantities: &[NamedQuantity], name: &str) -> Option<i64> {
    quantities.iter().find(|q| q.name == name).map(|q| q.quantity)
}

/// `data` of the single-level lookup
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemLevelData {
    pub inventory_item: Option<InventoryItemLevel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemLevel {
    pub inventory_level: Option<LevelQuantities>,
}

#[derive(Debug, Deserialize)]
pub struct LevelQuantities {
    #[serde(default)]
    pub quantities: Vec<NamedQuantity>,
}

impl LevelQuantities {
    pub fn quantity(&self, name: &str) -> Option<i64> {
        quantity_named(&self.quantities, name)
    }
}

/// Remote quantity of one inventory item at one location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteLevel {
    pub item_id: String,
    pub quantity: i64,
}

// ========== Mutations ==========

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySetQuantitiesData {
    pub inventory_set_quantities: Option<InventorySetQuantitiesPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySetQuantitiesPayload {
    pub inventory_adjustment_group: Option<AdjustmentGroup>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentGroup {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryActivateData {
    pub inventory_activate: Option<InventoryActivatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryActivatePayload {
    pub inventory_level: Option<ActivatedLevel>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
pub struct ActivatedLevel {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_error_list_with_extensions() {
        let body = json!({
            "errors": [{
                "message": "Throttled",
                "locations": [{"line": 2, "column": 3}],
                "path": ["location", "inventoryLevels"],
                "extensions": {"code": "THROTTLED"}
            }]
        });
        let resp: GraphQlResponse<serde_json::Value> = serde_json::from_value(body).unwrap();
        assert!(resp.data.is_none());
        assert_eq!(resp.errors.len(), 1);
        assert_eq!(resp.errors[0].code(), Some("THROTTLED"));
        assert_eq!(resp.errors[0].locations[0].line, 2);
    }

    #[test]
    fn missing_errors_defaults_to_empty() {
        let resp: GraphQlResponse<serde_json::Value> =
            serde_json::from_value(json!({"data": {"shop": {"name": "x"}}})).unwrap();
        assert!(resp.errors.is_empty());
        assert!(resp.data.is_some());
    }

    #[test]
    fn decodes_level_connection() {
        let body = json!({
            "nodes": [
                {"item": {"id": "gid://shopify/InventoryItem/1"},
                 "quantities": [
                     {"name": "on_hand", "quantity": 15},
                     {"name": "available", "quantity": 12}
                 ]}
            ],
            "pageInfo": {"hasNextPage": true, "endCursor": "abc"}
        });
        let conn: Connection<InventoryLevelNode> = serde_json::from_value(body).unwrap();
        assert_eq!(conn.nodes[0].quantity("available"), Some(12));
        assert_eq!(conn.nodes[0].quantity("committed"), None);
        assert!(conn.page_info.has_next_page);
        assert_eq!(conn.page_info.end_cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn decodes_set_quantities_user_errors() {
        let body = json!({
            "inventorySetQuantities": {
                "inventoryAdjustmentGroup": null,
                "userErrors": [{
                    "field": ["input", "quantities", "0", "locationId"],
                    "message": "The specified inventory item is not stocked at the location.",
                    "code": "ITEM_NOT_STOCKED_AT_LOCATION"
                }]
            }
        });
        let data: InventorySetQuantitiesData = serde_json::from_value(body).unwrap();
        let payload = data.inventory_set_quantities.unwrap();
        assert!(payload.inventory_adjustment_group.is_none());
        assert!(payload.user_errors[0].is_not_stocked());
    }
}
