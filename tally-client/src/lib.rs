//! Tally Client - rate-aware GraphQL client for the storefront platform
//!
//! Wraps the platform's Admin GraphQL endpoint with:
//! - proactive throttling from the call-limit header
//! - bounded retries for 429 and 5xx responses (explicit [`RetryPolicy`])
//! - cursor pagination
//! - typed inventory queries and mutations
//!
//! Every sleep goes through a [`Sleeper`], so callers (and tests) control time.

pub mod client;
pub mod config;
pub mod error;
pub mod inventory;
pub mod retry;
pub mod throttle;
pub mod types;

pub use client::StorefrontClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use retry::{Backoff, RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper};
pub use throttle::CallLimit;
pub use types::{GraphQlError, PageInfo, RemoteLevel, UserError};
