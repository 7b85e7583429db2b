// crates/contract-probe-core/src/core/error.rs
// ============================================================================
// Module: Probe Errors
// Description: Error taxonomy for scenario execution.
// Purpose: Separate a broken subject from a harness that could not clean up.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Four error families drive scenario control flow:
//! - [`TransportError`] and [`AuthenticationError`] abort a scenario and force
//!   cleanup.
//! - [`AssertionFailure`] is recorded as a failed step.
//! - [`CleanupError`] is logged and reported, never escalated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::ResourceId;
use crate::core::identifiers::RoleName;
use crate::core::resource::ResourceKind;
use crate::interfaces::TransportError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Login failures.
///
/// # Invariants
/// - Produced only when the login endpoint answered; network failures are
///   [`TransportError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    /// Login returned a non-success status.
    #[error("login rejected for {identifier}: status {status}")]
    Rejected {
        /// Login identifier.
        identifier: String,
        /// Response status.
        status: u16,
    },
    /// Login succeeded but carried no token or session cookie.
    #[error("login response for {identifier} carried no token or session cookie")]
    MissingToken {
        /// Login identifier.
        identifier: String,
    },
}

/// A contract check that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{check}: expected {expected}, observed {observed}")]
pub struct AssertionFailure {
    /// Check label.
    pub check: String,
    /// Expected value.
    pub expected: String,
    /// Observed value.
    pub observed: String,
}

impl AssertionFailure {
    /// Creates an assertion failure.
    #[must_use]
    pub fn new(
        check: impl Into<String>,
        expected: impl Into<String>,
        observed: impl Into<String>,
    ) -> Self {
        Self {
            check: check.into(),
            expected: expected.into(),
            observed: observed.into(),
        }
    }
}

/// Teardown failures.
///
/// # Invariants
/// - Never propagated out of cleanup; surfaced only in reports and logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleanupError {
    /// Deletion returned a status other than 200, 202, 204 or 404.
    #[error("delete of {kind} {id} returned status {status}")]
    DeleteRejected {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource identifier.
        id: ResourceId,
        /// Response status.
        status: u16,
    },
    /// Deletion could not be sent.
    #[error("delete of {kind} {id} failed: {source}")]
    DeleteTransport {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource identifier.
        id: ResourceId,
        /// Transport failure.
        source: TransportError,
    },
    /// Logout did not succeed.
    #[error("logout for role {role} failed: {message}")]
    Logout {
        /// Session role.
        role: RoleName,
        /// Failure description.
        message: String,
    },
}

/// Errors that abort a scenario step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Request could not be completed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Login failed.
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),
    /// A check that later steps depend on did not hold.
    #[error(transparent)]
    Assertion(#[from] AssertionFailure),
    /// Scenario prerequisites are missing (role, fixture, operation).
    #[error("scenario setup error: {0}")]
    Setup(String),
}
