//! ============================================================================
//! HTTP Client Wrapper
//! ============================================================================
//! Thin layer over reqwest shared by every endpoint call:
//! - Base URL, fixed timeout, `Content-Type: application/json`
//! - Outgoing request hook (no-op unless one is installed)
//! - Error-status classification (401 / 403 / 429 / everything else)
//!
//! Errors are returned to the caller unchanged after classification.
//! There is no retry or backoff here.
//! ============================================================================

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;

/// Longest server error body echoed back in an error message
const MAX_ERROR_BODY: usize = 200;

/// Hook applied to every outgoing request before it is sent
pub trait RequestHook: Send + Sync {
    fn prepare(&self, request: RequestBuilder) -> RequestBuilder;
}

/// Leaves requests untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl RequestHook for NoopHook {
    fn prepare(&self, request: RequestBuilder) -> RequestBuilder {
        request
    }
}

/// Configured JSON client for the recommendation backend
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    hook: Arc<dyn RequestHook>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            hook: Arc::new(NoopHook),
        })
    }

    /// Install a request hook (e.g. for attaching credentials)
    pub fn with_hook(mut self, hook: Arc<dyn RequestHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST a JSON body and decode a JSON reply
    pub async fn post_json<B, R>(&self, path: &str, query: &[(&str, &str)], body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.client.post(self.endpoint(path)).json(body);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.execute(path, request).await
    }

    /// GET and decode a JSON reply
    pub async fn get_json<R>(&self, path: &str) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
    {
        let request = self.client.get(self.endpoint(path));
        self.execute(path, request).await
    }

    async fn execute<R>(&self, path: &str, request: RequestBuilder) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
    {
        let request = self.hook.prepare(request);
        debug!("-> {}", path);

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let error = classify_status(status, &headers, &body);
            warn!("<- {} failed: {}", path, error);
            return Err(error);
        }

        debug!("<- {} {}", path, status);
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{} (path {})", e, path)))
    }

    fn transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else if error.is_decode() {
            ApiError::Decode(error.to_string())
        } else {
            ApiError::Transport(error.to_string())
        }
    }
}

/// Map an error status onto the error taxonomy
pub fn classify_status(status: StatusCode, headers: &HeaderMap, body: &str) -> ApiError {
    let message = error_message(body);
    match status.as_u16() {
        401 => ApiError::Unauthorized(message),
        403 => ApiError::Forbidden(message),
        429 => ApiError::RateLimited {
            retry_after: parse_retry_after(headers),
        },
        code => ApiError::Status {
            status: code,
            message,
        },
    }
}

/// `Retry-After` in delta-seconds form; HTTP-date values are ignored
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Prefer the backend's `{"error": ..}` / `{"detail": ..}` text over the raw body
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "detail"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    body.chars().take(MAX_ERROR_BODY).collect()
}
