//! Request executor
//!
//! This module issues every billed call to the catalog API:
//! - Building the HTTP client
//! - Refusing calls once the quota is known to be exhausted
//! - Retrying transient failures with a fixed delay
//! - Waiting out HTTP 429 for the server-directed duration
//! - Publishing quota headers from successful responses

use crate::config::ApiConfig;
use crate::retry::{parse_retry_after, AttemptError, RetryError, RetryPolicy};
use crate::state::QuotaTracker;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Response header carrying the calls left in the current quota window
pub const HEADER_QUOTA_REMAINING: &str = "x-ratelimit-remaining";

/// Response header carrying the size of the quota window
pub const HEADER_QUOTA_LIMIT: &str = "x-ratelimit-limit";

/// Builds the HTTP client used for catalog calls
///
/// No overall timeout is set unless `request-timeout-secs` is configured;
/// attempt counts, not deadlines, bound each call.
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .gzip(true)
        .brotli(true);

    if let Some(secs) = config.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder.build()
}

/// Issues GET requests with retry, backoff and quota tracking
///
/// The executor owns the process [`QuotaTracker`] and is its only writer.
pub struct Executor {
    client: Client,
    policy: RetryPolicy,
    quota: QuotaTracker,
}

impl Executor {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            quota: QuotaTracker::new(),
        }
    }

    /// Read access to the quota state for the coordinator
    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches `url` and parses the body as JSON
    ///
    /// # Arguments
    ///
    /// * `what` - Label used in log lines (the URL carries the API key, so it is never logged)
    /// * `url` - Fully built request URL
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - HTTP 200 with a JSON body
    /// * `Err(RetryError::Exhausted)` - Every attempt failed; callers treat the result as absent
    /// * `Err(RetryError::QuotaExhausted)` - The call was not issued
    pub async fn get_json(&self, what: &str, url: &Url) -> Result<Value, RetryError> {
        self.policy
            .run(what, |attempt| self.attempt(what, url, attempt))
            .await
    }

    /// One billed call; refused once the quota is known to be exhausted,
    /// including between retries of the same request
    async fn attempt(&self, what: &str, url: &Url, attempt: u32) -> Result<Value, AttemptError> {
        if self.quota.is_exhausted() {
            return Err(AttemptError::QuotaExhausted);
        }
        tracing::debug!("{} attempt {}", what, attempt);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(AttemptError::RateLimited { retry_after });
        }

        if status != StatusCode::OK {
            return Err(AttemptError::Transient(format!("HTTP {}", status.as_u16())));
        }

        let (remaining, limit) = quota_headers(response.headers());
        self.quota.observe(remaining, limit);

        response
            .json::<Value>()
            .await
            .map_err(|e| AttemptError::Transient(format!("invalid JSON body: {}", e.without_url())))
    }
}

/// Extracts (remaining, limit) from response headers; non-numeric values are ignored
pub fn quota_headers(headers: &HeaderMap) -> (Option<u32>, Option<u32>) {
    let numeric = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok())
    };
    (numeric(HEADER_QUOTA_REMAINING), numeric(HEADER_QUOTA_LIMIT))
}

fn classify_transport_error(error: reqwest::Error) -> AttemptError {
    if error.is_timeout() {
        AttemptError::Transient("request timeout".to_string())
    } else if error.is_connect() {
        AttemptError::Transient("connection failed".to_string())
    } else {
        AttemptError::Transient(error.without_url().to_string())
    }
}
