// crates/contract-probe-core/src/core/mod.rs
// ============================================================================
// Module: Contract Probe Core Model
// Description: Data model shared by every harness component.
// Purpose: Group identifiers, credentials, resources, access and report types.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! Core types are plain data. Runtime components in [`crate::runtime`] own the
//! behavior; the types here only carry state and enforce redaction.

pub mod access;
pub mod credential;
pub mod error;
pub mod identifiers;
pub mod report;
pub mod resource;

pub use access::Access;
pub use access::AccessExpectation;
pub use access::CellVerdict;
pub use access::MatrixCell;
pub use access::Observed;
pub use access::Operation;
pub use credential::Credential;
pub use credential::Session;
pub use credential::SessionAuth;
pub use error::AssertionFailure;
pub use error::AuthenticationError;
pub use error::CleanupError;
pub use error::ProbeError;
pub use identifiers::ResourceId;
pub use identifiers::RoleName;
pub use report::CloseOutcome;
pub use report::FixtureReport;
pub use report::ReleaseOutcome;
pub use report::ReleaseRecord;
pub use report::ScenarioOutcome;
pub use report::ScenarioPhase;
pub use report::ScenarioReport;
pub use report::SessionCleanup;
pub use report::StepResult;
pub use report::StepStatus;
pub use report::SuiteReport;
pub use report::TranscriptEntry;
pub use resource::ResourceKind;
pub use resource::TrackedResource;
