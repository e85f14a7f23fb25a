//! Sync service configuration

use std::time::Duration;

use crate::engine::{DEFAULT_BATCH_SIZE, DEFAULT_PAUSE};
use crate::scheduler::DEFAULT_STALE_TTL;
use crate::worker::DEFAULT_TICK_SECS;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Sync service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Admin API port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Platform Admin API version, e.g. `2024-10`
    pub platform_api_version: String,
    /// Per-request platform timeout (seconds)
    pub platform_timeout_secs: u64,
    /// Time between scheduler ticks
    pub scheduler_tick: Duration,
    pub batch_size: usize,
    /// Wait between two correction pushes
    pub pause: Duration,
    /// Wall-clock limit for one pass (unset = unlimited)
    pub run_budget: Option<Duration>,
    /// In-progress runs older than this are failed by the reaper
    pub stale_run_ttl: Duration,
    /// Emit JSON log lines
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: env_parse("HTTP_PORT").unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            platform_api_version: std::env::var("PLATFORM_API_VERSION")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| tally_client::config::DEFAULT_API_VERSION.to_string()),
            platform_timeout_secs: env_parse("PLATFORM_TIMEOUT_SECS").unwrap_or(30),
            scheduler_tick: Duration::from_secs(
                env_parse::<u64>("SCHEDULER_TICK_SECS")
                    .filter(|s| *s > 0)
                    .unwrap_or(DEFAULT_TICK_SECS),
            ),
            batch_size: env_parse::<usize>("RECONCILE_BATCH_SIZE")
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_BATCH_SIZE),
            pause: env_parse("RECONCILE_PAUSE_MS")
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_PAUSE),
            run_budget: env_parse::<u64>("RUN_BUDGET_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
            stale_run_ttl: env_parse("STALE_RUN_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_STALE_TTL),
            log_json: std::env::var("LOG_JSON")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
