//! Admin API routes

pub mod health;
pub mod logs;
pub mod reconcile;

use axum::Router;
use axum::routing::{get, post};
use shared::error::{ApiResponse, AppError};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub(crate) type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create the admin router
pub fn create_router(state: AppState) -> Router {
    let clients = Router::new()
        .route("/api/clients/{id}/reconcile", post(reconcile::reconcile))
        .route("/api/clients/{id}/skus/{sku_id}/push", post(reconcile::push_sku))
        .route("/api/clients/{id}/sync-logs", get(logs::sync_logs))
        .route("/api/clients/{id}/audit", get(logs::audit_log));

    let audit = Router::new().route("/api/audit/{id}/resolve", post(logs::resolve));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(clients)
        .merge(audit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
