//! Admin API over the in-memory store

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{CLIENT, Harness, item};
use shared::models::SyncRunStatus;
use tally_client::ClientError;
use tally_sync::SyncScheduler;
use tally_sync::api::create_router;
use tally_sync::state::AppState;

fn app(h: &Harness) -> Router {
    let scheduler = Arc::new(SyncScheduler::new(h.engine.clone()));
    create_router(AppState::new(scheduler))
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_reports_service() {
    let h = Harness::new();
    let (status, body) = send(app(&h), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "tally-sync");
}

#[tokio::test]
async fn manual_dry_run_returns_report() {
    let h = Harness::new();
    h.stock(1, 120);
    h.map(1, &item(1));
    h.platform.set_level(&item(1), 100);

    let (status, body) = send(
        app(&h),
        "POST",
        "/api/clients/1/reconcile",
        Some(json!({ "mode": "dry_run" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["discrepancies"][0]["difference"], 20);
    assert_eq!(body["data"]["mode"], "dry_run");
    assert!(h.platform.mutations().is_empty());
}

#[tokio::test]
async fn reconcile_without_body_defaults_to_dry_run() {
    let h = Harness::new();
    let (status, body) = send(app(&h), "POST", "/api/clients/1/reconcile", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["mode"], "dry_run");
}

#[tokio::test]
async fn invalid_batch_size_is_rejected() {
    let h = Harness::new();
    let (status, body) = send(
        app(&h),
        "POST",
        "/api/clients/1/reconcile",
        Some(json!({ "mode": "authoritative", "batch_size": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 2);
    assert!(h.store.sync_logs().is_empty());
}

#[tokio::test]
async fn unconfigured_client_is_unprocessable() {
    let h = Harness::new();
    let (status, body) = send(app(&h), "POST", "/api/clients/99/reconcile", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 1002);
}

#[tokio::test]
async fn concurrent_run_is_a_conflict() {
    let h = Harness::new();
    let _held = h.engine.locks().try_acquire(CLIENT, 0).unwrap();

    let (status, body) = send(app(&h), "POST", "/api/clients/1/skus/1/push", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 1001);
    assert_eq!(body["details"]["client_id"], CLIENT);
}

#[tokio::test]
async fn sync_logs_newest_first() {
    let h = Harness::new();
    h.engine
        .run(CLIENT, tally_sync::ReconcileOptions::manual(Default::default()))
        .await
        .unwrap();
    h.engine
        .run(CLIENT, tally_sync::ReconcileOptions::manual(Default::default()))
        .await
        .unwrap();

    let (status, body) = send(app(&h), "GET", "/api/clients/1/sync-logs?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    let runs = body["data"].as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["status"], SyncRunStatus::Success.as_db());
}

#[tokio::test]
async fn failed_push_can_be_resolved_once() {
    let h = Harness::new();
    h.stock(1, 3);
    h.map(1, &item(1));
    h.platform.fail_next_set(ClientError::InvalidResponse("garbled".into()));

    let (status, body) = send(app(&h), "POST", "/api/clients/1/skus/1/push", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], false);
    let audit_id = body["data"]["audit_id"].as_i64().unwrap();

    let (_, open) = send(app(&h), "GET", "/api/clients/1/audit?open=true", None).await;
    assert_eq!(open["data"].as_array().unwrap().len(), 1);

    let uri = format!("/api/audit/{audit_id}/resolve");
    let (status, body) = send(app(&h), "POST", &uri, Some(json!({ "notes": "fixed by hand" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["resolution_notes"], "fixed by hand");

    let (status, body) = send(app(&h), "POST", &uri, Some(json!({ "notes": "again" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 1009);

    let (_, open) = send(app(&h), "GET", "/api/clients/1/audit?open=true", None).await;
    assert!(open["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn resolve_requires_notes() {
    let h = Harness::new();
    let (status, _) = send(app(&h), "POST", "/api/audit/1/resolve", Some(json!({ "notes": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn push_of_unmapped_sku_is_unprocessable() {
    let h = Harness::new();
    let (status, body) = send(app(&h), "POST", "/api/clients/1/skus/9/push", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 1007);
    assert_eq!(body["details"]["sku_id"], 9);
}

#[tokio::test]
async fn missing_credentials_have_their_own_code() {
    let h = Harness::new();
    let mut settings = common::client_store();
    settings.access_token = None;
    h.store.set_client_store(settings);

    let (status, body) = send(app(&h), "POST", "/api/clients/1/reconcile", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 1003);
}

#[tokio::test]
async fn manual_run_honours_configured_budget() {
    let h = Harness::new();
    h.stock(1, 10);
    h.map(1, &item(1));
    let scheduler = Arc::new(SyncScheduler::new(h.engine.clone()).with_budget(Some(Duration::ZERO)));
    let app = create_router(AppState::new(scheduler));

    let (status, body) = send(
        app,
        "POST",
        "/api/clients/1/reconcile",
        Some(json!({ "mode": "authoritative" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["budget_exhausted"], true);
    assert!(h.platform.mutations().is_empty());
    assert_eq!(h.store.sync_logs()[0].status, SyncRunStatus::Partial);
}
