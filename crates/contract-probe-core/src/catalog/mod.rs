// crates/contract-probe-core/src/catalog/mod.rs
// ============================================================================
// Module: Scenario Catalog
// Description: Built-in scenarios for the reference agency application.
// Purpose: Provide independently invocable contract scenarios by name.
// Dependencies: serde_json, time
// ============================================================================

//! ## Overview
//! Built-in scenarios, in catalog order:
//! - `login-logout`: authorized read, logout, stale-token replay is refused.
//! - `invalid-login`: wrong credentials yield an authentication error.
//! - `employee-roundtrip` / `client-roundtrip`: create, read, update, re-read.
//! - `payment-proof`: one-time payments require a proof URL.
//! - `project-cascade`: deleting a project with a payment is rejected or
//!   cascades.
//! - `access-matrix`: every role x protected operation, plus anonymous.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use time::OffsetDateTime;

use crate::core::error::AssertionFailure;
use crate::core::resource::ResourceKind;
use crate::interfaces::ApiResponse;
use crate::runtime::scenario::Scenario;
use crate::runtime::suite::FixtureSpec;

mod access;
mod auth;
mod lifecycle;
mod payments;

pub use access::AccessMatrixScenario;
pub use auth::InvalidLogin;
pub use auth::LoginLogout;
pub use lifecycle::CrudRoundtrip;
pub use payments::PaymentProof;
pub use payments::ProjectCascade;

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Returns every built-in scenario in catalog order.
#[must_use]
pub fn builtin() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(LoginLogout),
        Arc::new(InvalidLogin),
        Arc::new(CrudRoundtrip::employee()),
        Arc::new(CrudRoundtrip::client()),
        Arc::new(PaymentProof),
        Arc::new(ProjectCascade),
        Arc::new(AccessMatrixScenario),
    ]
}

/// Returns the built-in scenario with the given name.
#[must_use]
pub fn find(name: &str) -> Option<Arc<dyn Scenario>> {
    builtin().into_iter().find(|scenario| scenario.name() == name)
}

/// Returns the client fixture shared by `payment-proof` and `project-cascade`
/// when a suite runs with a fixture scope.
#[must_use]
pub fn shared_client_fixture() -> FixtureSpec {
    FixtureSpec::new(ResourceKind::Client, lifecycle::client_body(&format!("shared-{}", unique_suffix())))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Per-process counter disambiguating suffixes created in the same instant.
static SUFFIX_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Returns a suffix unique to this process run, for emails and names.
pub(crate) fn unique_suffix() -> String {
    let stamp = OffsetDateTime::now_utc().unix_timestamp_nanos();
    let sequence = SUFFIX_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{stamp}-{sequence}")
}

/// Checks that a response status is 2xx.
pub(crate) fn success(step: &str, response: &ApiResponse) -> Result<(), AssertionFailure> {
    if response.is_success() {
        Ok(())
    } else {
        Err(AssertionFailure::new(step, "2xx", response.status.to_string()))
    }
}
