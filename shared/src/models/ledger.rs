//! Inventory ledger model
//!
//! Append-only log of signed quantity deltas. The on-hand quantity of a SKU
//! (optionally scoped to one location) is exactly the sum of its entries.

use serde::{Deserialize, Serialize};

/// Business event that produced a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Receipt,
    Shipment,
    Adjustment,
    Return,
    Transfer,
}

impl TransactionKind {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "receipt" => Some(Self::Receipt),
            "shipment" => Some(Self::Shipment),
            "adjustment" => Some(Self::Adjustment),
            "return" => Some(Self::Return),
            "transfer" => Some(Self::Transfer),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Shipment => "shipment",
            Self::Adjustment => "adjustment",
            Self::Return => "return",
            Self::Transfer => "transfer",
        }
    }
}

/// Immutable ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub client_id: i64,
    pub sku_id: i64,
    pub location_id: i64,
    /// Signed quantity change
    pub delta: i64,
    pub kind: TransactionKind,
    pub created_at: i64,
    /// Originating document (shipment id, receipt id, ...)
    pub source_ref: Option<String>,
}
