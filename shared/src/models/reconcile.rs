//! Reconciliation report types
//!
//! Derived data produced by one reconciliation pass. Nothing here is
//! persisted directly; the admin surface renders the report as-is.

use serde::{Deserialize, Serialize};

use super::alias::AliasConflict;
use super::audit::CorrectionStatus;

/// Whether a pass may mutate the external platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    /// Report discrepancies only
    #[default]
    DryRun,
    /// Push local truth to the platform
    Authoritative,
}

impl ReconcileMode {
    pub fn is_authoritative(&self) -> bool {
        matches!(self, Self::Authoritative)
    }
}

/// Local and remote quantities disagree for one SKU
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Discrepancy {
    pub sku_id: i64,
    pub external_item_id: String,
    pub local_quantity: i64,
    pub remote_quantity: i64,
    /// `local - remote`
    pub difference: i64,
}

impl Discrepancy {
    pub fn new(
        sku_id: i64,
        external_item_id: impl Into<String>,
        local_quantity: i64,
        remote_quantity: i64,
    ) -> Self {
        Self {
            sku_id,
            external_item_id: external_item_id.into(),
            local_quantity,
            remote_quantity,
            difference: local_quantity - remote_quantity,
        }
    }
}

/// Outcome of pushing one SKU's quantity to the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    pub sku_id: i64,
    pub success: bool,
    /// Quantity set (or attempted) on the platform
    pub quantity: i64,
    pub status: CorrectionStatus,
    pub attempts: u32,
    pub audit_id: Option<i64>,
}

/// Per-item error carried in the report (never a raw transport error)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportError {
    pub sku_id: Option<i64>,
    pub message: String,
}

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub client_id: i64,
    pub mode: ReconcileMode,
    /// Non-conflicted SKUs that were compared
    pub total_skus: usize,
    /// In discovery order
    pub discrepancies: Vec<Discrepancy>,
    pub conflicts: Vec<AliasConflict>,
    pub corrected: Vec<CorrectionOutcome>,
    pub errors: Vec<ReportError>,
    /// Stopped early because the run budget ran out
    pub budget_exhausted: bool,
    pub sync_log_id: Option<i64>,
    pub duration_ms: i64,
}

impl ReconciliationReport {
    pub fn new(client_id: i64, mode: ReconcileMode) -> Self {
        Self {
            client_id,
            mode,
            ..Default::default()
        }
    }

    /// First `n` error messages, for compact display
    pub fn first_errors(&self, n: usize) -> Vec<&str> {
        self.errors.iter().take(n).map(|e| e.message.as_str()).collect()
    }
}
