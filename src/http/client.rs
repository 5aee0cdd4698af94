//! Authenticated, retrying API client shared by the Braze and Transifex code.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::retry::{is_transient_status, parse_retry_after, RetryPolicy};
use super::transport::{ApiRequest, RawResponse, Transport};

/// One remote service: base URL, credentials and retry policy over a shared
/// transport.
pub struct ApiClient<T: Transport> {
    transport: Arc<T>,
    service: &'static str,
    base_url: String,
    default_headers: Vec<(String, String)>,
    retry: RetryPolicy,
}

impl<T: Transport> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            service: self.service,
            base_url: self.base_url.clone(),
            default_headers: self.default_headers.clone(),
            retry: self.retry.clone(),
        }
    }
}

impl<T: Transport> ApiClient<T> {
    /// Create a client for `service` rooted at `base_url`.
    pub fn new(transport: Arc<T>, service: &'static str, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            transport,
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: Vec::new(),
            retry,
        }
    }

    /// Send `Authorization: Bearer <token>` with every authenticated request.
    #[must_use]
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {token}"))
    }

    /// Add a header sent with every authenticated request.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.default_headers.push((name.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn service(&self) -> &'static str {
        self.service
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a request for `path` relative to the base URL.
    #[must_use]
    pub fn request(&self, method: Method, path: &str) -> ApiRequest {
        ApiRequest::new(method, format!("{}{}", self.base_url, path))
    }

    /// Send with credentials and default headers, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - `Error::Auth` on 401/403
    /// - `Error::Client` on any other 4xx
    /// - `Error::Transient` once retries are exhausted
    pub async fn send(&self, mut request: ApiRequest) -> Result<RawResponse> {
        let mut headers = self.default_headers.clone();
        headers.append(&mut request.headers);
        request.headers = headers;
        self.send_with_retry(&request).await
    }

    /// Send without credentials, e.g. to a pre-signed download URL.
    ///
    /// # Errors
    ///
    /// Same classification as [`send`](Self::send).
    pub async fn send_unauthenticated(&self, request: ApiRequest) -> Result<RawResponse> {
        self.send_with_retry(&request).await
    }

    /// Send and parse the response body as JSON.
    ///
    /// # Errors
    ///
    /// Everything [`send`](Self::send) returns, plus `Error::Json` for an
    /// unparseable body.
    pub async fn send_json(&self, request: ApiRequest) -> Result<Value> {
        let response = self.send(request).await?;
        parse_json(&response)
    }

    async fn send_with_retry(&self, request: &ApiRequest) -> Result<RawResponse> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            debug!(
                service = self.service,
                method = %request.method,
                url = %request.url,
                attempt,
                "Sending request"
            );

            let (message, retry_after) = match self.transport.execute(request).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status;
                    if status == 401 || status == 403 {
                        return Err(Error::Auth {
                            service: self.service.to_string(),
                            status,
                            message: response.snippet(),
                        });
                    }
                    if !is_transient_status(status) {
                        return Err(Error::Client {
                            service: self.service.to_string(),
                            status,
                            message: response.snippet(),
                        });
                    }
                    let hint = response
                        .retry_after
                        .as_deref()
                        .and_then(|v| parse_retry_after(v, Utc::now()));
                    (format!("HTTP {status}: {}", response.snippet()), hint)
                }
                Err(err) => (err.to_string(), None),
            };

            if attempt >= self.retry.max_attempts {
                return Err(Error::Transient {
                    service: self.service.to_string(),
                    attempts: attempt,
                    message,
                });
            }

            let wait = self.retry.wait_before(attempt, retry_after);
            warn!(
                service = self.service,
                url = %request.url,
                attempt,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                error = %message,
                "Transient failure, retrying"
            );
            sleep_if_needed(wait).await;
        }
    }
}

/// Parse a response body as JSON.
///
/// # Errors
///
/// Returns `Error::Json` if the body is not valid JSON.
pub fn parse_json(response: &RawResponse) -> Result<Value> {
    if response.body.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&response.body)?)
}

pub(crate) async fn sleep_if_needed(wait: Duration) {
    if !wait.is_zero() {
        tokio::time::sleep(wait).await;
    }
}
