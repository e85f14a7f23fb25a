//! Sync log and correction audit endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use shared::error::{ApiResponse, AppError};
use shared::models::{AuditLogEntry, SyncLogEntry};

use crate::error::SyncError;
use crate::state::AppState;
use crate::store::{AuditStore, SyncLogStore};

use super::ApiResult;

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
    /// Only failed, unresolved corrections
    #[serde(default)]
    pub open: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub notes: String,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(20).clamp(1, 100)
}

/// GET /api/clients/{id}/sync-logs
pub async fn sync_logs(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
    Query(query): Query<LogQuery>,
) -> ApiResult<Vec<SyncLogEntry>> {
    let runs = state
        .store
        .list_runs(client_id, clamp_limit(query.limit))
        .await
        .map_err(SyncError::from)?;
    Ok(ApiResponse::success(runs))
}

/// GET /api/clients/{id}/audit
pub async fn audit_log(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Vec<AuditLogEntry>> {
    let entries = state
        .store
        .list_audit(client_id, query.open, clamp_limit(query.limit))
        .await
        .map_err(SyncError::from)?;
    Ok(ApiResponse::success(entries))
}

/// POST /api/audit/{id}/resolve
pub async fn resolve(
    State(state): State<AppState>,
    Path(audit_id): Path<i64>,
    Json(req): Json<ResolveRequest>,
) -> ApiResult<AuditLogEntry> {
    let notes = req.notes.trim();
    if notes.is_empty() {
        return Err(AppError::validation("notes must not be empty"));
    }
    let entry = crate::audit::resolve_audit(state.store.as_ref(), audit_id, notes).await?;
    Ok(ApiResponse::success(entry))
}
