// crates/contract-probe-core/src/interfaces/mod.rs
// ============================================================================
// Module: Contract Probe Interfaces
// Description: Transport seam between the harness and the system under test.
// Purpose: Let the runtime issue requests without depending on an HTTP client.
// Dependencies: async-trait, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The runtime talks to the system under test exclusively through
//! [`ApiTransport`]. The production implementation is
//! [`crate::runtime::HttpTransport`]; tests substitute scripted transports.
//!
//! # Invariants
//! - One call to [`ApiTransport::send`] is exactly one attempt; transports
//!   never retry.
//! - Every call is bounded by the transport's timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use contract_probe_config::HttpMethod;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::credential::SessionAuth;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Base URL a request is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Resource API base URL.
    Api,
    /// Login/logout base URL.
    Auth,
}

/// A single request to the system under test.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Target origin.
    pub origin: Origin,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path relative to the origin, including any query string.
    pub path: String,
    /// Auth material to attach.
    pub auth: Option<SessionAuth>,
    /// JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Creates an unauthenticated API request.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            origin: Origin::Api,
            method,
            path: path.into(),
            auth: None,
            body: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Creates a POST request with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path).with_body(body)
    }

    /// Creates a PUT request with a JSON body.
    #[must_use]
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Put, path).with_body(body)
    }

    /// Creates a DELETE request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Attaches auth material.
    #[must_use]
    pub fn with_auth(mut self, auth: Option<SessionAuth>) -> Self {
        self.auth = auth;
        self
    }

    /// Attaches a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Routes the request to the auth origin.
    #[must_use]
    pub const fn on_auth_origin(mut self) -> Self {
        self.origin = Origin::Auth;
        self
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Response from the system under test.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Status code.
    pub status: u16,
    /// Parsed JSON body; non-JSON bodies are kept as a string, empty as null.
    pub body: Value,
    /// Cookie pairs from `Set-Cookie` headers, joined with `; `.
    pub set_cookie: Option<String>,
    /// Time between send and full body receipt.
    pub elapsed: Duration,
}

impl ApiResponse {
    /// Creates a response with a JSON body.
    #[must_use]
    pub const fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            set_cookie: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns true for 401 and 403.
    #[must_use]
    pub const fn is_denied(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    /// Returns the entity carried by the body.
    ///
    /// Bodies shaped `{"data": {...}}` yield the inner object; any other body
    /// is returned as-is.
    #[must_use]
    pub fn entity(&self) -> &Value {
        match self.body.get("data") {
            Some(inner) if inner.is_object() => inner,
            _ => &self.body,
        }
    }

    /// Returns the body rendered as text for substring checks.
    #[must_use]
    pub fn body_text(&self) -> String {
        match &self.body {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Transport failures, distinct from assertion failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Request exceeded the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// Connection could not be established.
    #[error("connection to {url} failed: {message}")]
    Connect {
        /// Request URL.
        url: String,
        /// Failure description.
        message: String,
    },
    /// Request or response failed after connecting.
    #[error("request to {url} failed: {message}")]
    Request {
        /// Request URL.
        url: String,
        /// Failure description.
        message: String,
    },
    /// URL could not be built from base URL and path.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// Response body exceeded the size limit.
    #[error("response from {url} exceeds {limit} bytes")]
    ResponseTooLarge {
        /// Request URL.
        url: String,
        /// Size limit in bytes.
        limit: usize,
    },
}

/// Issues single-attempt requests to the system under test.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Sends one request and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no complete response was received.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}
