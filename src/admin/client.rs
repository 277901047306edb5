//! HTTP client for the Kong admin API.
//!
//! Every request is logged with its method and URL, and every response with
//! its status. Non-2xx responses become [`AdminApiError::Api`] carrying the
//! status code and raw body; transient statuses are retried with exponential
//! backoff before the error surfaces.

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Statuses worth retrying:
/// - 5xx: the admin container itself may still be starting
/// - 404: the serverless ingress answers 404 until the service has propagated
/// - 403: the ingress auth layer may need a token refresh
fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 404 || status == 403
}

/// Retry schedule for transient admin API failures.
///
/// Delays follow `base_delay * backoff_factor^attempt`, so the defaults give
/// 2, 4, 8, 16 and 32 seconds.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(2),
            backoff_factor: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep before retrying after `attempt` failed tries.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * self.backoff_factor.pow(attempt)
    }
}

/// Errors returned by the admin API client
#[derive(Error, Debug)]
pub enum AdminApiError {
    #[error("admin API error {status}: {}", extract_message(body))]
    Api { status: u16, body: String },

    #[error("admin API request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl AdminApiError {
    /// Status code of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => is_retryable_status(*status),
            // Connection-level failures are as transient as a 5xx here
            Self::Transport(_) => true,
        }
    }
}

/// Pull the `message` field out of a JSON error body, falling back to the
/// raw text for non-JSON bodies.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Authenticated JSON client for the Kong admin API.
///
/// When a token is configured it is sent as `X-Auth-Token` on every request;
/// without one the requests are unauthenticated (local stack).
pub struct AdminClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    retry: RetryPolicy,
}

impl AdminClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy (tests use millisecond delays).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn get(&self, path: &str) -> Result<Value, AdminApiError> {
        self.request(Method::GET, path, None, false).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, AdminApiError> {
        self.request(Method::PUT, path, Some(body), false).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, AdminApiError> {
        self.request(Method::POST, path, Some(body), false).await
    }

    /// POST with no body but an urlencoded content type.
    ///
    /// The JWT credential endpoint rejects `application/json` requests with
    /// an empty body, so this quirk is preserved.
    pub async fn post_form_empty(&self, path: &str) -> Result<Value, AdminApiError> {
        self.request(Method::POST, path, None, true).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, AdminApiError> {
        self.request(Method::DELETE, path, None, false).await
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        urlencoded: bool,
    ) -> Result<Value, AdminApiError> {
        let mut attempt = 0;
        loop {
            match self.send_once(method.clone(), path, body, urlencoded).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.retry.max_retries && err.is_retryable() => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        "{} {} failed ({}), retrying in {:?}",
                        method,
                        path,
                        err.status().map(|s| s.to_string()).unwrap_or_else(|| "transport".into()),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        urlencoded: bool,
    ) -> Result<Value, AdminApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{method}: {url}");

        let mut req = self.client.request(method, &url);
        if let Some(ref token) = self.token {
            req = req.header("X-Auth-Token", token);
        }
        if urlencoded {
            req = req.header("Content-Type", "application/x-www-form-urlencoded");
        } else if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!("response {}: {}", status.as_u16(), text);

        if !status.is_success() {
            return Err(AdminApiError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.is_empty() {
            Ok(Value::Null)
        } else {
            // Some endpoints (DELETE) answer 204 with an empty or non-JSON body
            Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_schedule() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..policy.max_retries).map(|a| policy.delay(a).as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 32]);
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(404));
        assert!(is_retryable_status(403));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(409));
        assert!(!is_retryable_status(401));
    }

    #[test]
    fn test_error_message_extracted_from_json_body() {
        let err = AdminApiError::Api {
            status: 400,
            body: r#"{"message":"schema violation"}"#.to_string(),
        };
        assert_eq!(err.to_string(), "admin API error 400: schema violation");
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        let err = AdminApiError::Api {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "admin API error 502: bad gateway");
    }
}
