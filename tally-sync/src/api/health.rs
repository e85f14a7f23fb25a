//! Health check endpoint

use axum::Json;
use axum::extract::State;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let running: Vec<i64> = state.engine.locks().running();
    Json(serde_json::json!({
        "status": "ok",
        "service": "tally-sync",
        "version": env!("CARGO_PKG_VERSION"),
        "running_clients": running,
    }))
}
