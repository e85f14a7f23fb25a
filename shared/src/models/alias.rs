//! External alias model
//!
//! Maps a local SKU to an identifier meaningful to the external platform.
//! For a given client at most one SKU may own a `(kind, value)` pair;
//! anything else is a conflict that must be reported, never auto-resolved.

use serde::{Deserialize, Serialize};

/// Kind of external identifier an alias carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasKind {
    /// Platform inventory item id (the unit inventory levels are keyed by)
    ExternalItemId,
    /// Platform product variant id
    ExternalVariantId,
}

impl AliasKind {
    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "external_item_id" => Some(Self::ExternalItemId),
            "external_variant_id" => Some(Self::ExternalVariantId),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::ExternalItemId => "external_item_id",
            Self::ExternalVariantId => "external_variant_id",
        }
    }
}

impl std::fmt::Display for AliasKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_db())
    }
}

/// Alias row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAlias {
    pub id: i64,
    pub client_id: i64,
    pub sku_id: i64,
    pub kind: AliasKind,
    pub value: String,
    /// Set when reconciliation found this value claimed by several SKUs
    pub conflict_flagged_at: Option<i64>,
}

/// The working-set projection of an alias: `{sku_id, value}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasRef {
    pub sku_id: i64,
    pub value: String,
}

impl From<&ExternalAlias> for AliasRef {
    fn from(alias: &ExternalAlias) -> Self {
        Self {
            sku_id: alias.sku_id,
            value: alias.value.clone(),
        }
    }
}

/// One external value claimed by more than one local SKU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasConflict {
    pub alias_value: String,
    /// Distinct SKU ids, ascending
    pub sku_ids: Vec<i64>,
}
