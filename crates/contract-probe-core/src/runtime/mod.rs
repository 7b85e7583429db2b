// crates/contract-probe-core/src/runtime/mod.rs
// ============================================================================
// Module: Contract Probe Runtime
// Description: Harness components that talk to the system under test.
// Purpose: Group the transport, session, tracker, matrix, scenario and suite runtimes.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Components, leaves first: [`HttpTransport`], [`SessionManager`],
//! [`ResourceTracker`], [`RoleMatrixRunner`], [`ScenarioExecutor`] and
//! [`SuiteRunner`].

pub mod http;
pub mod matrix;
pub mod scenario;
pub mod session;
pub mod suite;
pub mod tracker;

pub use http::HttpTransport;
pub use http::MAX_RESPONSE_BYTES;
pub use http::RecordingTransport;
pub use matrix::AccessMatrix;
pub use matrix::MatrixRun;
pub use matrix::RoleMatrixRunner;
pub use matrix::classify;
pub use matrix::judge;
pub use scenario::Authentication;
pub use scenario::Scenario;
pub use scenario::ScenarioContext;
pub use scenario::ScenarioExecutor;
pub use scenario::Verification;
pub use scenario::fields_match;
pub use scenario::response_id;
pub use session::SessionManager;
pub use session::TOKEN_FIELDS;
pub use suite::FixtureScope;
pub use suite::FixtureSet;
pub use suite::FixtureSpec;
pub use suite::SuiteRunner;
pub use tracker::ResourceTracker;
