//! HTTP access with bounded retries and exponential backoff.
//!
//! Every outbound call in the pipeline (news search, summary generation,
//! model inference) goes through [`RetryingClient`].
//!
//! # Architecture
//!
//! - [`Transport`]: performs exactly one HTTP attempt
//! - [`ReqwestTransport`]: the production transport built on `reqwest`
//! - [`RetryingClient`]: decorator that adds the retry policy to any transport
//!
//! # Retry Strategy
//!
//! - At most `max_attempts` attempts (3 by default)
//! - HTTP 429, 5xx and transport failures are retried
//! - Any other 4xx fails immediately
//! - Delay before retry `n` (1-based) is `base_delay * 2^(n-1)` capped at
//!   `max_delay`, plus random jitter in `0..=max_jitter`

use crate::config::RetryConfig;
use crate::error::{RequestError, TransportError};
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound request, independent of the transport that sends it.
#[derive(Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    /// A POST carrying a JSON body.
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    /// Host part of the URL, used for logging so query-string secrets never
    /// reach the logs.
    pub fn host(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "<invalid url>".to_string())
    }
}

// Query values and headers can carry API keys.
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("host", &self.host())
            .field("query_keys", &self.query.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Performs a single HTTP attempt.
///
/// Non-success statuses are *not* errors at this level; they are returned as
/// responses so the retry policy can classify them.
pub trait Transport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production transport on top of a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose every attempt is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

/// Attempt budget and backoff shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(c: &RetryConfig) -> Self {
        Self {
            max_attempts: c.max_attempts,
            base_delay: Duration::from_millis(c.base_delay_ms),
            max_delay: Duration::from_millis(c.max_delay_ms),
            max_jitter: Duration::from_millis(c.max_jitter_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exp = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << exp).min(self.max_delay);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rng().random_range(0..=jitter_ms))
    }
}

/// Whether a failed status should be retried: rate limiting and server errors.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Decorator that adds [`RetryPolicy`] to a [`Transport`].
pub struct RetryingClient<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> RetryingClient<T>
where
    T: Transport,
{
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Send `request`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Status`] immediately for a non-429 4xx, or with the
    ///   last status once the budget is spent on 429/5xx responses
    /// - [`RequestError::Transport`] once the budget is spent on transport
    ///   failures
    #[instrument(level = "info", skip_all, fields(host = %request.host()))]
    pub async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
        let total_t0 = Instant::now();
        let max = self.policy.max_attempts.max(1);
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let attempt_t0 = Instant::now();

            let err = match self.inner.send(request).await {
                Ok(resp) if resp.is_success() => {
                    debug!(
                        attempt,
                        status = resp.status,
                        elapsed_ms = attempt_t0.elapsed().as_millis() as u64,
                        "request succeeded"
                    );
                    return Ok(resp);
                }
                Ok(resp) => {
                    let status = resp.status;
                    warn!(
                        attempt,
                        max,
                        status,
                        body = %truncate_for_log(&resp.body, 300),
                        "request attempt returned error status"
                    );
                    let err = RequestError::Status {
                        status,
                        attempts: attempt,
                        body: resp.body,
                    };
                    if !is_retryable_status(status) {
                        error!(attempt, status, "permanent client error; not retrying");
                        return Err(err);
                    }
                    err
                }
                Err(e) => {
                    warn!(attempt, max, error = %e, "request attempt failed");
                    RequestError::Transport {
                        cause: e.0,
                        attempts: attempt,
                    }
                }
            };

            if attempt >= max {
                error!(
                    attempt,
                    max,
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    error = %err,
                    "request exhausted retries"
                );
                return Err(err);
            }

            let delay = self.policy.delay_for(attempt);
            warn!(attempt, max, ?delay, "backing off before retry");
            sleep(delay).await;
        }
    }

    /// [`Self::request`] followed by JSON decoding of the body.
    pub async fn request_json<R: DeserializeOwned>(
        &self,
        request: &HttpRequest,
    ) -> Result<R, RequestError> {
        self.request(request).await?.json()
    }
}

impl<T> fmt::Debug for RetryingClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingClient")
            .field("policy", &self.policy)
            .finish()
    }
}
