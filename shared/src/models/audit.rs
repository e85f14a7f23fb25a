//! Correction audit model
//!
//! One row per correction attempt against the external platform. Rows are
//! insert-only; the only later write is marking a failed row resolved.

use serde::{Deserialize, Serialize};

/// Result of a correction attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionStatus {
    /// Absolute quantity set on first try (possibly after transient retries)
    Updated,
    /// Item had to be activated at the location before the set succeeded
    UpdatedAfterActivation,
    /// Gave up; left open for manual follow-up
    Failed,
}

impl CorrectionStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "updated" => Some(Self::Updated),
            "updated_after_activation" => Some(Self::UpdatedAfterActivation),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::UpdatedAfterActivation => "updated_after_activation",
            Self::Failed => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for CorrectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_db())
    }
}

/// Durable record of one correction attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub client_id: i64,
    pub sku_id: i64,
    pub external_item_id: String,
    /// Remote quantity observed before the push (unknown if the read failed)
    pub before_quantity: Option<i64>,
    /// Quantity the push tried to set
    pub after_quantity: i64,
    pub attempts: u32,
    pub auto_correction_success: bool,
    pub status: CorrectionStatus,
    pub notes: Option<String>,
    pub created_at: i64,
    pub resolved_at: Option<i64>,
    pub resolution_notes: Option<String>,
}

/// Insert payload for [`AuditLogEntry`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub client_id: i64,
    pub sku_id: i64,
    pub external_item_id: String,
    pub before_quantity: Option<i64>,
    pub after_quantity: i64,
    pub attempts: u32,
    pub status: CorrectionStatus,
    pub notes: Option<String>,
}
