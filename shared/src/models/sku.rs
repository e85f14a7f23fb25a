//! SKU Model

use serde::{Deserialize, Serialize};

/// Lifecycle status of a local SKU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkuStatus {
    Active,
    Inactive,
}

impl SkuStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Local product identity (owned by catalog management, read-only here)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub id: i64,
    pub client_id: i64,
    /// Human-readable SKU code
    pub code: String,
    pub title: String,
    pub status: SkuStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_db_strings() {
        assert_eq!(SkuStatus::from_db("active"), Some(SkuStatus::Active));
        assert_eq!(SkuStatus::Inactive.as_db(), "inactive");
        assert_eq!(SkuStatus::from_db("archived"), None);
    }
}
