//! On-demand reconciliation and single-SKU push

use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use shared::error::{ApiResponse, AppError};
use shared::models::{CorrectionOutcome, ReconcileMode, ReconciliationReport};

use crate::engine::ReconcileOptions;
use crate::state::AppState;

use super::ApiResult;

const MAX_BATCH_SIZE: usize = 250;

#[derive(Debug, Default, Deserialize)]
pub struct ReconcileRequest {
    #[serde(default)]
    pub mode: ReconcileMode,
    pub batch_size: Option<usize>,
    pub pause_ms: Option<u64>,
}

/// POST /api/clients/{id}/reconcile
pub async fn reconcile(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
    body: Option<Json<ReconcileRequest>>,
) -> ApiResult<ReconciliationReport> {
    let req = body.map(|Json(b)| b).unwrap_or_default();

    let mut options = ReconcileOptions::manual(req.mode).with_budget(state.run_budget);
    if let Some(size) = req.batch_size {
        if size == 0 || size > MAX_BATCH_SIZE {
            return Err(AppError::validation(format!(
                "batch_size must be between 1 and {MAX_BATCH_SIZE}"
            )));
        }
        options = options.with_batch_size(size);
    }
    if let Some(ms) = req.pause_ms {
        options = options.with_pause(Duration::from_millis(ms));
    }

    let report = state.engine.run(client_id, options).await?;
    Ok(ApiResponse::success(report))
}

/// POST /api/clients/{id}/skus/{sku_id}/push
pub async fn push_sku(
    State(state): State<AppState>,
    Path((client_id, sku_id)): Path<(i64, i64)>,
) -> ApiResult<CorrectionOutcome> {
    let outcome = state.engine.push_one(client_id, sku_id).await?;
    Ok(ApiResponse::success(outcome))
}
