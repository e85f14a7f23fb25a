//! Rate-aware GraphQL client

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use shared::util::truncate_chars;

use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::throttle::{self, CALL_LIMIT_HEADER, CallLimit, Throttle};
use crate::types::{Connection, GraphQlResponse};
use crate::{ClientConfig, ClientError, ClientResult};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Characters of the query document carried in [`ClientError::GraphQl`]
const QUERY_EXCERPT_CHARS: usize = 100;

/// Pause between two pages of a paginated query
pub const PAGE_DELAY: Duration = Duration::from_millis(500);

/// GraphQL client for one store
#[derive(Clone)]
pub struct StorefrontClient {
    client: Client,
    endpoint: String,
    access_token: String,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for StorefrontClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontClient")
            .field("endpoint", &self.endpoint)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl StorefrontClient {
    /// Create a client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            access_token: config.access_token.clone(),
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the request-level retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the sleeper used for backoff, throttling and page delays
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }

    /// Execute one query or mutation and decode its `data`
    ///
    /// 429, 5xx and connection-level failures are retried up to the policy
    /// ceiling; every other failure is returned immediately.
    pub async fn query<T: DeserializeOwned>(&self, document: &str, variables: Value) -> ClientResult<T> {
        let body = json!({ "query": document, "variables": variables });
        let mut attempt: u32 = 1;

        loop {
            let sent = self
                .client
                .post(&self.endpoint)
                .header(ACCESS_TOKEN_HEADER, &self.access_token)
                .json(&body)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(err) if is_retryable_transport(&err) => {
                    if !self.policy.has_attempts_left(attempt) {
                        tracing::error!(error = %err, attempts = attempt, "Platform unreachable");
                        return Err(ClientError::Transport(err));
                    }
                    let wait = self.policy.delay_for(attempt);
                    tracing::warn!(
                        error = %err,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "Transport error, retrying"
                    );
                    self.sleeper.sleep(wait).await;
                    attempt += 1;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if !self.policy.has_attempts_left(attempt) {
                    tracing::warn!(attempts = attempt, "Rate limit ceiling reached");
                    return Err(ClientError::RateLimited { attempts: attempt });
                }
                let wait = retry_after(&response).unwrap_or(self.policy.rate_limit_wait);
                tracing::warn!(
                    attempt,
                    wait_secs = wait.as_secs(),
                    "Rate limited by platform, backing off"
                );
                self.sleeper.sleep(wait).await;
                attempt += 1;
                continue;
            }

            if status.is_server_error() {
                if !self.policy.has_attempts_left(attempt) {
                    tracing::error!(status = status.as_u16(), attempts = attempt, "Platform server error");
                    return Err(ClientError::Server {
                        status: status.as_u16(),
                        attempts: attempt,
                    });
                }
                let wait = self.policy.delay_for(attempt);
                tracing::warn!(
                    status = status.as_u16(),
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "Platform server error, retrying"
                );
                self.sleeper.sleep(wait).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(ClientError::GraphQl {
                    message: format!("HTTP {}: {}", status.as_u16(), truncate_chars(&text, 200)),
                    code: None,
                    query_excerpt: excerpt(document),
                });
            }

            let limit = call_limit(&response);
            if let Some(limit) = limit {
                self.throttle(limit).await;
            }
            return Self::handle_response(response, document).await;
        }
    }

    /// Execute a paginated query and collect every node
    ///
    /// `page_path` locates the connection inside `data` (e.g.
    /// `["location", "inventoryLevels"]`). The document must declare an
    /// `$after: String` variable.
    pub async fn query_paginated<N: DeserializeOwned>(
        &self,
        document: &str,
        variables: Value,
        page_path: &[&str],
    ) -> ClientResult<Vec<N>> {
        let pointer = format!("/{}", page_path.join("/"));
        let mut variables = match variables {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(ClientError::InvalidResponse(format!(
                    "variables must be an object, got {other}"
                )));
            }
        };

        let mut nodes = Vec::new();
        let mut pages: u32 = 0;

        loop {
            let mut data: Value = self.query(document, Value::Object(variables.clone())).await?;
            let connection = data
                .pointer_mut(&pointer)
                .map(Value::take)
                .filter(|v| !v.is_null())
                .ok_or_else(|| ClientError::InvalidResponse(format!("missing connection at {pointer}")))?;
            let page: Connection<N> = serde_json::from_value(connection)?;

            pages += 1;
            nodes.extend(page.nodes);

            match (page.page_info.has_next_page, page.page_info.end_cursor) {
                (true, Some(cursor)) => {
                    variables.insert("after".to_string(), Value::String(cursor));
                    self.sleeper.sleep(PAGE_DELAY).await;
                }
                (true, None) => {
                    return Err(ClientError::InvalidResponse(
                        "hasNextPage without endCursor".to_string(),
                    ));
                }
                (false, _) => break,
            }
        }

        tracing::debug!(pages, nodes = nodes.len(), "Paginated query complete");
        Ok(nodes)
    }

    /// Pause or warn based on the call-limit header of a successful response
    async fn throttle(&self, limit: CallLimit) {
        match throttle::assess(limit) {
            Throttle::Proceed => {}
            Throttle::Warn => {
                tracing::warn!(used = limit.used, max = limit.max, "Approaching platform call limit");
            }
            Throttle::Pause(wait) => {
                tracing::warn!(
                    used = limit.used,
                    max = limit.max,
                    wait_ms = wait.as_millis() as u64,
                    "Call limit nearly exhausted, pausing"
                );
                self.sleeper.sleep(wait).await;
            }
        }
    }

    /// Decode the GraphQL envelope of a 2xx response
    async fn handle_response<T: DeserializeOwned>(response: Response, document: &str) -> ClientResult<T> {
        let text = response.text().await?;
        let envelope: GraphQlResponse<T> = serde_json::from_str(&text)?;

        if let Some(first) = envelope.errors.first() {
            tracing::error!(
                error = %first.message,
                code = ?first.code(),
                errors = envelope.errors.len(),
                "GraphQL query returned errors"
            );
            return Err(ClientError::GraphQl {
                message: first.message.clone(),
                code: first.code().map(str::to_string),
                query_excerpt: excerpt(document),
            });
        }

        envelope
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Missing data".to_string()))
    }
}

fn call_limit(response: &Response) -> Option<CallLimit> {
    response
        .headers()
        .get(CALL_LIMIT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(CallLimit::parse)
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Connect failures, timeouts and requests that never completed
fn is_retryable_transport(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

fn excerpt(document: &str) -> String {
    truncate_chars(document.trim(), QUERY_EXCERPT_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_caps_query_text() {
        let doc = format!("query {{ {} }}", "x".repeat(300));
        let e = excerpt(&doc);
        assert_eq!(e.chars().count(), QUERY_EXCERPT_CHARS);
        assert!(e.starts_with("query {"));
    }

    #[test]
    fn client_builds_from_config() {
        let config = ClientConfig::new("acme.myshopify.com", "shpat_test");
        let client = StorefrontClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://acme.myshopify.com/admin/api/2024-10/graphql.json"
        );
    }
}
