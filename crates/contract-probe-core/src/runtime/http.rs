// crates/contract-probe-core/src/runtime/http.rs
// ============================================================================
// Module: HTTP Client Adapter
// Description: reqwest-backed transport plus a recording decorator.
// Purpose: Issue bounded, single-attempt requests and keep redacted transcripts.
// Dependencies: reqwest, tokio, tracing, url
// ============================================================================

//! ## Overview
//! [`HttpTransport`] resolves requests against the API or auth base URL, sends
//! exactly one attempt with the configured timeout and reads at most
//! [`MAX_RESPONSE_BYTES`] of body. Redirects are not followed so auth-gated
//! redirects surface as their raw status.
//!
//! [`RecordingTransport`] wraps any transport and appends a
//! [`TranscriptEntry`] per exchange with auth values reduced to their scheme.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use contract_probe_config::HttpMethod;
use contract_probe_config::TargetConfig;
use reqwest::Client;
use reqwest::Method;
use reqwest::header::SET_COOKIE;
use reqwest::redirect::Policy;
use serde_json::Value;
use tokio::sync::Mutex;
use url::Url;

use crate::core::report::TranscriptEntry;
use crate::interfaces::ApiRequest;
use crate::interfaces::ApiResponse;
use crate::interfaces::ApiTransport;
use crate::interfaces::Origin;
use crate::interfaces::TransportError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum response body size accepted from the system under test.
pub const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// reqwest-backed transport.
///
/// # Invariants
/// - Base URLs are stored without a trailing slash.
/// - No retries and no redirect following.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Resource API base URL.
    api_base: String,
    /// Login/logout base URL.
    auth_base: String,
    /// Per-request timeout.
    timeout: Duration,
    /// HTTP client configured with the timeout and redirect policy.
    client: Client,
}

impl HttpTransport {
    /// Builds a transport from target settings.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when a base URL is invalid or the client
    /// cannot be built.
    pub fn new(target: &TargetConfig) -> Result<Self, TransportError> {
        Self::with_bases(&target.base_url, target.auth_base_url(), target.timeout())
    }

    /// Builds a transport from explicit base URLs and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when a base URL is invalid or the client
    /// cannot be built.
    pub fn with_bases(
        api_base: &str,
        auth_base: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let api_base = normalize_base(api_base)?;
        let auth_base = normalize_base(auth_base)?;
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| TransportError::Request {
                url: api_base.clone(),
                message: err.to_string(),
            })?;
        Ok(Self {
            api_base,
            auth_base,
            timeout,
            client,
        })
    }

    /// Returns the resource API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Resolves a request path against its origin.
    fn resolve(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let base = match request.origin {
            Origin::Api => &self.api_base,
            Origin::Auth => &self.auth_base,
        };
        let raw = format!("{base}{}", request.path);
        Url::parse(&raw).map_err(|err| TransportError::InvalidUrl(format!("{raw}: {err}")))
    }

    /// Maps a reqwest failure to a transport error.
    fn map_error(&self, url: &Url, err: &reqwest::Error) -> TransportError {
        let url = url.to_string();
        if err.is_timeout() {
            TransportError::Timeout {
                url,
                timeout_secs: self.timeout.as_secs(),
            }
        } else if err.is_connect() {
            TransportError::Connect {
                url,
                message: err.to_string(),
            }
        } else {
            TransportError::Request {
                url,
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.resolve(request)?;
        let started = Instant::now();
        let mut builder = self.client.request(reqwest_method(request.method), url.clone());
        if let Some(auth) = &request.auth {
            let (name, value) = auth.header();
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let mut response = builder.send().await.map_err(|err| self.map_error(&url, &err))?;
        let status = response.status().as_u16();
        let set_cookie = collect_cookies(response.headers());
        if let Some(length) = response.content_length()
            && !usize::try_from(length).is_ok_and(|length| length <= MAX_RESPONSE_BYTES)
        {
            return Err(TransportError::ResponseTooLarge {
                url: url.to_string(),
                limit: MAX_RESPONSE_BYTES,
            });
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|err| self.map_error(&url, &err))? {
            if bytes.len() + chunk.len() > MAX_RESPONSE_BYTES {
                return Err(TransportError::ResponseTooLarge {
                    url: url.to_string(),
                    limit: MAX_RESPONSE_BYTES,
                });
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(ApiResponse {
            status,
            body: parse_body(&bytes),
            set_cookie,
            elapsed: started.elapsed(),
        })
    }
}

// ============================================================================
// SECTION: Recording Transport
// ============================================================================

/// Transport decorator that records a redacted transcript.
pub struct RecordingTransport {
    /// Wrapped transport.
    inner: Arc<dyn ApiTransport>,
    /// Recorded exchanges in send order.
    entries: Mutex<Vec<TranscriptEntry>>,
}

impl RecordingTransport {
    /// Wraps a transport.
    #[must_use]
    pub fn new(inner: Arc<dyn ApiTransport>) -> Self {
        Self {
            inner,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Removes and returns the recorded transcript.
    pub async fn take_transcript(&self) -> Vec<TranscriptEntry> {
        std::mem::take(&mut *self.entries.lock().await)
    }
}

#[async_trait]
impl ApiTransport for RecordingTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let started = Instant::now();
        let result = self.inner.send(request).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let entry = TranscriptEntry {
            origin: request.origin,
            method: request.method,
            path: request.path.clone(),
            auth: request.auth.as_ref().map(|auth| auth.redacted().to_string()),
            status: result.as_ref().ok().map(|response| response.status),
            elapsed_ms,
            error: result.as_ref().err().map(ToString::to_string),
        };
        tracing::debug!(
            method = %entry.method,
            path = %entry.path,
            status = entry.status,
            elapsed_ms,
            "request completed"
        );
        self.entries.lock().await.push(entry);
        result
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates and trims a base URL.
fn normalize_base(raw: &str) -> Result<String, TransportError> {
    Url::parse(raw).map_err(|err| TransportError::InvalidUrl(format!("{raw}: {err}")))?;
    Ok(raw.trim_end_matches('/').to_string())
}

/// Converts a config method into a reqwest method.
fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Joins the `name=value` pairs of all `Set-Cookie` headers.
fn collect_cookies(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();
    if pairs.is_empty() { None } else { Some(pairs.join("; ")) }
}

/// Parses a response body as JSON, falling back to text.
fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
