// crates/contract-probe-core/src/core/access.rs
// ============================================================================
// Module: Access Expectations
// Description: Protected operations, expected access and observed outcomes.
// Purpose: Describe one cell of the role x operation matrix.
// Dependencies: contract-probe-config, serde, serde_json
// ============================================================================

//! ## Overview
//! An [`AccessExpectation`] is static input to the matrix runner. A
//! [`MatrixCell`] pairs it with what the system under test actually did.
//!
//! # Invariants
//! - Expectations are never mutated after the matrix is built.

// ============================================================================
// SECTION: Imports
// ============================================================================

use contract_probe_config::HttpMethod;
use contract_probe_config::OperationConfig;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::RoleName;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Expected or observed access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// The operation must succeed (2xx).
    Allow,
    /// The operation must be refused (401/403).
    Deny,
}

impl Access {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

/// A protected operation probed by the matrix runner.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Stable operation label.
    pub name: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path relative to the API base URL.
    pub path: String,
    /// True when the endpoint may not exist at all.
    pub speculative: bool,
    /// Optional JSON body for POST/PUT probes.
    pub body: Option<Value>,
}

impl Operation {
    /// Creates a non-speculative operation without a body.
    #[must_use]
    pub fn new(name: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            speculative: false,
            body: None,
        }
    }

    /// Marks the operation as speculative.
    #[must_use]
    pub const fn mark_speculative(mut self) -> Self {
        self.speculative = true;
        self
    }
}

impl From<&OperationConfig> for Operation {
    fn from(config: &OperationConfig) -> Self {
        Self {
            name: config.name.clone(),
            method: config.method,
            path: config.path.clone(),
            speculative: config.speculative,
            body: config.body.as_ref().and_then(|body| serde_json::to_value(body).ok()),
        }
    }
}

/// Expected access of one role (or the anonymous caller) to one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessExpectation {
    /// Role name, or `None` for the unauthenticated caller.
    pub role: Option<RoleName>,
    /// Operation label.
    pub operation: String,
    /// Expected decision.
    pub expected: Access,
}

/// Classification of an observed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observed {
    /// 2xx response.
    Allowed,
    /// 401 or 403 response.
    Denied,
    /// 404 on a speculative endpoint.
    NotImplemented,
    /// Any other status.
    Unexpected,
}

impl Observed {
    /// Returns the snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::NotImplemented => "not_implemented",
            Self::Unexpected => "unexpected",
        }
    }
}

/// Verdict of a single matrix cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellVerdict {
    /// Observed classification matches the expectation.
    Pass,
    /// Observed classification differs from the expectation.
    Fail,
    /// Speculative endpoint does not exist.
    NotImplemented,
    /// The probe could not be performed.
    Error,
}

impl CellVerdict {
    /// Returns the snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::NotImplemented => "not_implemented",
            Self::Error => "error",
        }
    }
}

/// One evaluated (role, operation) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixCell {
    /// Role label (`anonymous` for the unauthenticated row).
    pub role: String,
    /// Operation label.
    pub operation: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path.
    pub path: String,
    /// Expected decision.
    pub expected: Access,
    /// Observed classification, absent when the probe failed to run.
    pub observed: Option<Observed>,
    /// Observed status code.
    pub status: Option<u16>,
    /// Cell verdict.
    pub verdict: CellVerdict,
    /// Failure detail.
    pub detail: Option<String>,
}
