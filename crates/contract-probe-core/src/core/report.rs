// crates/contract-probe-core/src/core/report.rs
// ============================================================================
// Module: Probe Reports
// Description: Step, scenario and suite report records.
// Purpose: Provide serializable, append-only records of every probe outcome.
// Dependencies: serde, contract-probe-config
// ============================================================================

//! ## Overview
//! Reports separate the subject's behavior (steps) from the harness' own
//! teardown (releases and session cleanup). A scenario passes when none of its
//! steps failed or errored; teardown problems are listed but never change the
//! outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use contract_probe_config::HttpMethod;
use serde::Deserialize;
use serde::Serialize;

use crate::core::access::MatrixCell;
use crate::core::identifiers::ResourceId;
use crate::core::identifiers::RoleName;
use crate::core::resource::ResourceKind;
use crate::interfaces::Origin;

// ============================================================================
// SECTION: Steps
// ============================================================================

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Check held.
    Pass,
    /// Check did not hold.
    Fail,
    /// Step could not be performed (transport or authentication).
    Error,
    /// Step was not applicable (speculative endpoint not implemented).
    Skipped,
}

impl StepStatus {
    /// Returns the snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }

    /// Returns true when the status makes a scenario fail.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Fail | Self::Error)
    }
}

/// Immutable record of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step name.
    pub name: String,
    /// Step status.
    pub status: StepStatus,
    /// Detail (expected vs observed, error text).
    pub detail: Option<String>,
}

impl StepResult {
    /// Creates a passing step.
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self::new(name, StepStatus::Pass, None)
    }

    /// Creates a step with the given status and detail.
    #[must_use]
    pub fn new(name: impl Into<String>, status: StepStatus, detail: Option<String>) -> Self {
        Self {
            name: name.into(),
            status,
            detail,
        }
    }
}

// ============================================================================
// SECTION: Scenario Lifecycle
// ============================================================================

/// Scenario state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioPhase {
    /// Scenario created, no session yet.
    Init,
    /// Session established.
    Authenticated,
    /// Create/read/update calls in progress.
    Acting,
    /// Pure assertions over captured responses.
    Verifying,
    /// Tracker and sessions being released.
    Cleanup,
    /// Scenario finished.
    Done,
}

/// Final scenario outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioOutcome {
    /// Every step passed or was skipped.
    Pass,
    /// At least one step failed or errored.
    Fail,
}

impl ScenarioOutcome {
    /// Returns the snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

// ============================================================================
// SECTION: Cleanup Records
// ============================================================================

/// Result of one tracked-resource deletion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseOutcome {
    /// Deletion returned 200, 202 or 204.
    Deleted,
    /// Deletion returned 404; the resource was already gone.
    AlreadyGone,
    /// Deletion failed.
    Failed,
}

impl ReleaseOutcome {
    /// Returns the snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deleted => "deleted",
            Self::AlreadyGone => "already_gone",
            Self::Failed => "failed",
        }
    }
}

/// Record of one deletion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource identifier.
    pub id: ResourceId,
    /// Role of the owning session.
    pub owner: RoleName,
    /// Deletion outcome.
    pub outcome: ReleaseOutcome,
    /// Failure detail.
    pub error: Option<String>,
}

/// Result of closing a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum CloseOutcome {
    /// Logout returned a success status.
    LoggedOut,
    /// Session had already been closed.
    AlreadyClosed,
    /// Logout failed; the failure was logged and swallowed.
    Failed(String),
}

impl CloseOutcome {
    /// Returns the snake-case label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LoggedOut => "logged_out",
            Self::AlreadyClosed => "already_closed",
            Self::Failed(_) => "failed",
        }
    }
}

/// Record of one session close performed during cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCleanup {
    /// Session role.
    pub role: RoleName,
    /// Close outcome.
    pub outcome: CloseOutcome,
}

// ============================================================================
// SECTION: Transcript
// ============================================================================

/// One recorded HTTP exchange.
///
/// # Invariants
/// - Auth material is reduced to its scheme; token values are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Origin the request was sent to.
    pub origin: Origin,
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path.
    pub path: String,
    /// Redacted auth label.
    pub auth: Option<String>,
    /// Response status, when a response arrived.
    pub status: Option<u16>,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: u64,
    /// Transport error text.
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Scenario and Suite Reports
// ============================================================================

/// Report for one scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: String,
    /// Scenario description.
    pub description: String,
    /// Role of the primary session.
    pub role: Option<RoleName>,
    /// Final outcome.
    pub outcome: ScenarioOutcome,
    /// Phases visited, in order.
    pub phases: Vec<ScenarioPhase>,
    /// Acting and verifying steps.
    pub steps: Vec<StepResult>,
    /// Tracked-resource deletion attempts.
    pub releases: Vec<ReleaseRecord>,
    /// Session close results.
    pub sessions: Vec<SessionCleanup>,
    /// Role matrix cells, for matrix scenarios.
    pub matrix: Vec<MatrixCell>,
    /// Redacted request transcript.
    pub transcript: Vec<TranscriptEntry>,
    /// Start time (RFC 3339).
    pub started_at: String,
    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl ScenarioReport {
    /// Returns true when the scenario passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == ScenarioOutcome::Pass
    }

    /// Returns the number of teardown problems (failed deletes and logouts).
    #[must_use]
    pub fn cleanup_failures(&self) -> usize {
        let releases =
            self.releases.iter().filter(|record| record.outcome == ReleaseOutcome::Failed).count();
        let sessions = self
            .sessions
            .iter()
            .filter(|session| matches!(session.outcome, CloseOutcome::Failed(_)))
            .count();
        releases + sessions
    }

    /// Computes the outcome from recorded steps.
    #[must_use]
    pub fn outcome_of(steps: &[StepResult]) -> ScenarioOutcome {
        if steps.iter().any(|step| step.status.is_failure()) {
            ScenarioOutcome::Fail
        } else {
            ScenarioOutcome::Pass
        }
    }
}

/// Teardown results of the shared fixture scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureReport {
    /// Fixture creation error, when setup failed.
    pub setup_error: Option<String>,
    /// Fixture deletion attempts.
    pub releases: Vec<ReleaseRecord>,
    /// Fixture session close results.
    pub sessions: Vec<SessionCleanup>,
}

/// Aggregate report for a suite run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// API base URL the suite ran against.
    pub base_url: String,
    /// Scenario reports in request order.
    pub scenarios: Vec<ScenarioReport>,
    /// Shared fixture results, when a fixture scope was used.
    pub fixtures: Option<FixtureReport>,
}

impl SuiteReport {
    /// Returns true when every scenario passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    /// Returns the number of failed scenarios.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.scenarios.iter().filter(|report| !report.passed()).count()
    }
}
