//! tally-sync - inventory reconciliation service
//!
//! Long-running service that:
//! - runs due client reconciliations on a fixed tick
//! - serves the admin API (manual runs, sync logs, correction audit)

use std::sync::Arc;

use tally_client::TokioSleeper;
use tally_sync::api;
use tally_sync::config::Config;
use tally_sync::db::PgStore;
use tally_sync::state::AppState;
use tally_sync::{ReconciliationEngine, StorefrontConnector, SyncScheduler, SyncWorker};
use tokio_util::sync::CancellationToken;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DEFAULT_LOG_FILTER: &str = "tally_sync=info,tally_client=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    init_tracing(config.log_json);

    tracing::info!(
        env = %config.environment,
        api_version = %config.platform_api_version,
        "Starting tally-sync"
    );

    let store = Arc::new(PgStore::connect(&config.database_url).await?);
    let sleeper = Arc::new(TokioSleeper);
    let connector = Arc::new(
        StorefrontConnector::new(&config.platform_api_version, config.platform_timeout_secs)
            .with_sleeper(sleeper.clone()),
    );

    let engine = ReconciliationEngine::new(store, connector, sleeper);
    let scheduler = Arc::new(
        SyncScheduler::new(engine)
            .with_stale_ttl(config.stale_run_ttl)
            .with_batching(config.batch_size, config.pause)
            .with_budget(config.run_budget),
    );

    let shutdown = CancellationToken::new();
    let worker = SyncWorker::new(scheduler.clone(), config.scheduler_tick, shutdown.clone());
    let worker_handle = tokio::spawn(worker.run());

    let app = api::create_router(AppState::new(scheduler));
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("tally-sync HTTP listening on {addr}");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {e}");
            }
            tracing::info!("Shutdown signal received");
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    worker_handle.await?;
    tracing::info!("tally-sync stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
