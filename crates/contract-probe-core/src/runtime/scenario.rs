// crates/contract-probe-core/src/runtime/scenario.rs
// ============================================================================
// Module: Scenario Executor
// Description: Drives one scenario through its lifecycle state machine.
// Purpose: Record every step and always clean up, whatever happened before.
// Dependencies: async-trait, futures, serde_json, time, tracing
// ============================================================================

//! ## Overview
//! A [`Scenario`] supplies two hooks: an async `act` phase that talks to the
//! system under test through a [`ScenarioContext`], and a synchronous
//! `verify` phase that only sees values captured during `act`. The
//! [`ScenarioExecutor`] sequences them:
//!
//! `Init -> Authenticated -> Acting -> Verifying -> Cleanup -> Done`
//!
//! Transport, authentication and setup errors jump straight to `Cleanup`, and
//! so does a panic inside either hook.
//! Assertion failures recorded through [`ScenarioContext::check`] do not stop
//! the scenario; only `require_*` checks, whose failure makes later steps
//! meaningless, abort it.
//!
//! # Invariants
//! - Cleanup runs on every path: tracked resources first, then sessions.
//! - A scenario passes iff no acting or verifying step failed or errored.
//! - Cleanup problems are reported separately and never change the outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use contract_probe_config::HttpMethod;
use contract_probe_config::ProbeConfig;
use futures::FutureExt;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::access::CellVerdict;
use crate::core::access::MatrixCell;
use crate::core::credential::Credential;
use crate::core::credential::Session;
use crate::core::credential::SessionAuth;
use crate::core::error::AssertionFailure;
use crate::core::error::ProbeError;
use crate::core::identifiers::ResourceId;
use crate::core::identifiers::RoleName;
use crate::core::report::CloseOutcome;
use crate::core::report::ScenarioPhase;
use crate::core::report::ScenarioReport;
use crate::core::report::SessionCleanup;
use crate::core::report::StepResult;
use crate::core::report::StepStatus;
use crate::core::resource::ResourceKind;
use crate::core::resource::TrackedResource;
use crate::interfaces::ApiRequest;
use crate::interfaces::ApiResponse;
use crate::interfaces::ApiTransport;
use crate::runtime::http::RecordingTransport;
use crate::runtime::matrix::AccessMatrix;
use crate::runtime::matrix::RoleMatrixRunner;
use crate::runtime::session::SessionManager;
use crate::runtime::suite::FixtureSet;
use crate::runtime::tracker::ResourceTracker;

// ============================================================================
// SECTION: Scenario Trait
// ============================================================================

/// Session a scenario starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// Log in as the configured default role.
    DefaultRole,
    /// Log in as the named role.
    Role(String),
    /// Start without a session.
    Anonymous,
}

/// An end-to-end contract scenario.
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Stable scenario name.
    fn name(&self) -> &str;

    /// One-line description.
    fn description(&self) -> &str;

    /// Session the scenario starts with.
    fn authentication(&self) -> Authentication {
        Authentication::DefaultRole
    }

    /// Performs create/read/update calls.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] to abort the scenario and jump to cleanup.
    async fn act(&self, ctx: &mut ScenarioContext) -> Result<(), ProbeError>;

    /// Runs pure assertions over values captured during `act`.
    fn verify(&self, _verification: &mut Verification<'_>) {}
}

// ============================================================================
// SECTION: Scenario Context
// ============================================================================

/// Per-scenario state handed to [`Scenario::act`].
///
/// # Invariants
/// - Owned by exactly one scenario run; nothing in it is shared mutably.
pub struct ScenarioContext {
    /// Read-only configuration.
    config: Arc<ProbeConfig>,
    /// Expected-access table.
    matrix: Arc<AccessMatrix>,
    /// Recording transport for this scenario.
    transport: Arc<dyn ApiTransport>,
    /// Login/logout calls.
    sessions: SessionManager,
    /// Resources created by this scenario.
    tracker: ResourceTracker,
    /// Session opened during authentication.
    primary: Option<Session>,
    /// Sessions opened during `act`.
    extra_sessions: Vec<Session>,
    /// Role of the primary session.
    role: Option<RoleName>,
    /// Recorded steps.
    steps: Vec<StepResult>,
    /// Values captured for verification.
    captures: BTreeMap<String, Value>,
    /// Shared fixtures, read-only.
    fixtures: Option<Arc<FixtureSet>>,
    /// Matrix cells produced by [`ScenarioContext::run_matrix`].
    matrix_cells: Vec<MatrixCell>,
    /// Session cleanup of matrix rows.
    matrix_sessions: Vec<SessionCleanup>,
    /// Last error already recorded as a step before being returned.
    recorded_error: Option<ProbeError>,
}

impl ScenarioContext {
    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Returns the primary session, when one is open or was opened.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.primary.as_ref()
    }

    /// Returns the auth material of the primary session.
    #[must_use]
    pub fn auth(&self) -> Option<SessionAuth> {
        self.primary.as_ref().map(|session| session.auth().clone())
    }

    /// Returns a shared fixture identifier.
    #[must_use]
    pub fn fixture(&self, kind: ResourceKind) -> Option<ResourceId> {
        self.fixtures.as_ref().and_then(|fixtures| fixtures.get(kind)).cloned()
    }

    /// Returns the credential of a declared role.
    #[must_use]
    pub fn credential(&self, role: &str) -> Option<Credential> {
        self.config.role(role).map(Credential::from)
    }

    /// Returns the default role's credential.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Setup`] when no roles are declared.
    pub fn default_credential(&self) -> Result<Credential, ProbeError> {
        self.config
            .default_role()
            .map(Credential::from)
            .ok_or_else(|| ProbeError::Setup("no roles declared".to_string()))
    }

    /// Builds a request carrying the primary session's auth.
    #[must_use]
    pub fn request(&self, method: HttpMethod, path: impl Into<String>) -> ApiRequest {
        ApiRequest::new(method, path).with_auth(self.auth())
    }

    /// Sends a request; a transport failure is recorded as an error step.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Transport`] when no response was received.
    pub async fn send(&mut self, step: &str, request: ApiRequest) -> Result<ApiResponse, ProbeError> {
        match self.transport.send(&request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                let err = ProbeError::from(err);
                self.record(StepResult::new(step, StepStatus::Error, Some(err.to_string())));
                self.recorded_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Records a step.
    pub fn record(&mut self, step: StepResult) {
        if step.status.is_failure() {
            tracing::warn!(
                step = %step.name,
                detail = step.detail.as_deref().unwrap_or(""),
                "step did not pass"
            );
        }
        self.steps.push(step);
    }

    /// Records an independent check and returns whether it held.
    pub fn check(&mut self, step: &str, result: Result<(), AssertionFailure>) -> bool {
        match result {
            Ok(()) => {
                self.record(StepResult::pass(step));
                true
            }
            Err(failure) => {
                self.record(StepResult::new(step, StepStatus::Fail, Some(failure.to_string())));
                false
            }
        }
    }

    /// Records a status check and returns whether it held.
    pub fn expect_status(&mut self, step: &str, response: &ApiResponse, accepted: &[u16]) -> bool {
        self.check(step, status_in(step, response, accepted))
    }

    /// Records a status check that later steps depend on.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Assertion`] when the status is not accepted.
    pub fn require_status(
        &mut self,
        step: &str,
        response: &ApiResponse,
        accepted: &[u16],
    ) -> Result<(), ProbeError> {
        self.require(step, status_in(step, response, accepted))
    }

    /// Records a check that later steps depend on.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Assertion`] when the check does not hold.
    pub fn require(
        &mut self,
        step: &str,
        result: Result<(), AssertionFailure>,
    ) -> Result<(), ProbeError> {
        match result {
            Ok(()) => {
                self.record(StepResult::pass(step));
                Ok(())
            }
            Err(failure) => Err(self.fail(step, failure)),
        }
    }

    /// Creates a resource and registers it for teardown.
    ///
    /// `path` may be a parent-scoped collection; the resource is always
    /// deleted through `/api/{kind}/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the create could not be sent, was not
    /// accepted, or returned no identifier.
    pub async fn create(
        &mut self,
        step: &str,
        kind: ResourceKind,
        path: &str,
        body: Value,
    ) -> Result<(ResourceId, ApiResponse), ProbeError> {
        let request = self.request(HttpMethod::Post, path).with_body(body);
        let response = self.send(step, request).await?;
        self.require_status(step, &response, &[200, 201])?;
        let Some(id) = response_id(&response) else {
            let failure =
                AssertionFailure::new(step, "path-safe id field in body", response.body_text());
            return Err(self.fail(&format!("{step}: response carries id"), failure));
        };
        self.track(kind, id.clone());
        Ok((id, response))
    }

    /// Records a failed dependent check and returns the aborting error.
    fn fail(&mut self, step: &str, failure: AssertionFailure) -> ProbeError {
        self.record(StepResult::new(step, StepStatus::Fail, Some(failure.to_string())));
        let err = ProbeError::from(failure);
        self.recorded_error = Some(err.clone());
        err
    }

    /// Registers a resource created outside [`ScenarioContext::create`].
    pub fn track(&mut self, kind: ResourceKind, id: ResourceId) {
        let owner = self.role.clone().unwrap_or_else(|| RoleName::new(RoleName::ANONYMOUS));
        let auth = self.auth();
        self.tracker.track(TrackedResource {
            kind,
            id,
            owner,
            auth,
        });
    }

    /// Stores a value for the verify phase.
    pub fn capture(&mut self, key: &str, value: Value) {
        self.captures.insert(key.to_string(), value);
    }

    /// Logs out the primary session and returns its stale auth material.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Setup`] without a primary session and
    /// [`ProbeError::Assertion`] when logout did not succeed.
    pub async fn logout_primary(&mut self, step: &str) -> Result<SessionAuth, ProbeError> {
        let Some(session) = self.primary.as_mut() else {
            return Err(ProbeError::Setup("no primary session to log out".to_string()));
        };
        let auth = session.auth().clone();
        let outcome = self.sessions.close_session(session).await;
        let result = match outcome {
            CloseOutcome::LoggedOut => Ok(()),
            CloseOutcome::AlreadyClosed => {
                Err(AssertionFailure::new(step, "open session", "session already closed"))
            }
            CloseOutcome::Failed(detail) => Err(AssertionFailure::new(step, "2xx", detail)),
        };
        self.require(step, result)?;
        Ok(auth)
    }

    /// Opens an additional session; it is closed during cleanup.
    ///
    /// # Errors
    ///
    /// Returns the login error unchanged; the caller decides whether it is
    /// the expected outcome.
    pub async fn attempt_login(&mut self, credential: &Credential) -> Result<SessionAuth, ProbeError> {
        let session = self.sessions.open_session(credential).await?;
        let auth = session.auth().clone();
        self.extra_sessions.push(session);
        Ok(auth)
    }

    /// Runs the role matrix and records one step per cell.
    pub async fn run_matrix(&mut self) {
        let credentials = self.config.roles.iter().map(Credential::from).collect();
        let runner = RoleMatrixRunner::new(
            Arc::clone(&self.transport),
            self.sessions.clone(),
            Arc::clone(&self.matrix),
            credentials,
        );
        let run = runner.run().await;
        for cell in &run.cells {
            let status = match cell.verdict {
                CellVerdict::Pass => StepStatus::Pass,
                CellVerdict::Fail => StepStatus::Fail,
                CellVerdict::NotImplemented => StepStatus::Skipped,
                CellVerdict::Error => StepStatus::Error,
            };
            let detail = match cell.verdict {
                CellVerdict::NotImplemented => Some("endpoint not implemented".to_string()),
                _ => cell.detail.clone(),
            };
            let name = format!("{} {} {}", cell.role, cell.method, cell.path);
            self.record(StepResult::new(name, status, detail));
        }
        self.matrix_cells = run.cells;
        self.matrix_sessions = run.sessions;
    }

    /// Opens the primary session for the scenario's authentication mode.
    async fn authenticate(&mut self, mode: Authentication) -> Result<(), ProbeError> {
        let credential = match mode {
            Authentication::Anonymous => return Ok(()),
            Authentication::DefaultRole => self.default_credential()?,
            Authentication::Role(name) => self
                .credential(&name)
                .ok_or_else(|| ProbeError::Setup(format!("undeclared role: {name}")))?,
        };
        let session = self.sessions.open_session(&credential).await?;
        self.record(StepResult::pass(format!("authenticate as {}", credential.role())));
        self.role = Some(credential.role().clone());
        self.primary = Some(session);
        Ok(())
    }

    /// Records an aborting error unless it was already recorded.
    fn record_abort(&mut self, phase: &str, err: &ProbeError) {
        if self.recorded_error.as_ref() == Some(err) {
            return;
        }
        let status = match err {
            ProbeError::Assertion(_) => StepStatus::Fail,
            _ => StepStatus::Error,
        };
        self.record(StepResult::new(phase, status, Some(err.to_string())));
    }

    /// Records a panicking hook as an error step.
    fn record_panic(&mut self, phase: &str, payload: &(dyn Any + Send)) {
        let message = panic_message(payload);
        tracing::error!(phase, panic = %message, "scenario hook panicked");
        self.record(StepResult::new(phase, StepStatus::Error, Some(format!("panicked: {message}"))));
    }

    /// Closes the primary and extra sessions.
    async fn close_sessions(&mut self) -> Vec<SessionCleanup> {
        let mut cleanup = std::mem::take(&mut self.matrix_sessions);
        if let Some(session) = self.primary.as_mut() {
            let outcome = self.sessions.close_session(session).await;
            cleanup.push(SessionCleanup {
                role: session.role().clone(),
                outcome,
            });
        }
        for session in &mut self.extra_sessions {
            let outcome = self.sessions.close_session(session).await;
            cleanup.push(SessionCleanup {
                role: session.role().clone(),
                outcome,
            });
        }
        cleanup
    }
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Read-only view of captured values for the verify phase.
pub struct Verification<'a> {
    /// Captured values.
    captures: &'a BTreeMap<String, Value>,
    /// Recorded verification steps.
    steps: Vec<StepResult>,
}

impl<'a> Verification<'a> {
    /// Creates a verification view.
    #[must_use]
    pub const fn new(captures: &'a BTreeMap<String, Value>) -> Self {
        Self {
            captures,
            steps: Vec::new(),
        }
    }

    /// Returns a captured value, recording a failed step when it is missing.
    pub fn require(&mut self, step: &str, key: &str) -> Option<&'a Value> {
        let value = self.captures.get(key);
        if value.is_none() {
            self.steps.push(StepResult::new(
                step,
                StepStatus::Fail,
                Some(format!("capture {key} missing")),
            ));
        }
        value
    }

    /// Records a check.
    pub fn check(&mut self, step: &str, result: Result<(), AssertionFailure>) {
        let step = match result {
            Ok(()) => StepResult::pass(step),
            Err(failure) => StepResult::new(step, StepStatus::Fail, Some(failure.to_string())),
        };
        self.steps.push(step);
    }

    /// Returns the recorded steps.
    #[must_use]
    pub fn into_steps(self) -> Vec<StepResult> {
        self.steps
    }
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Runs scenarios against one system under test.
///
/// # Invariants
/// - Holds only read-only shared state; each run builds its own context.
#[derive(Clone)]
pub struct ScenarioExecutor {
    /// Read-only configuration.
    config: Arc<ProbeConfig>,
    /// Shared transport.
    transport: Arc<dyn ApiTransport>,
    /// Expected-access table.
    matrix: Arc<AccessMatrix>,
}

impl ScenarioExecutor {
    /// Creates an executor; the access matrix is built from the config.
    #[must_use]
    pub fn new(config: Arc<ProbeConfig>, transport: Arc<dyn ApiTransport>) -> Self {
        let matrix = Arc::new(AccessMatrix::from_config(&config));
        Self {
            config,
            transport,
            matrix,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &Arc<ProbeConfig> {
        &self.config
    }

    /// Returns the shared transport.
    #[must_use]
    pub const fn transport(&self) -> &Arc<dyn ApiTransport> {
        &self.transport
    }

    /// Runs one scenario to completion.
    pub async fn run(
        &self,
        scenario: &dyn Scenario,
        fixtures: Option<Arc<FixtureSet>>,
    ) -> ScenarioReport {
        let started_at = OffsetDateTime::now_utc();
        let clock = Instant::now();
        let recorder = Arc::new(RecordingTransport::new(Arc::clone(&self.transport)));
        let transport: Arc<dyn ApiTransport> = recorder.clone();
        let mut ctx = ScenarioContext {
            config: Arc::clone(&self.config),
            matrix: Arc::clone(&self.matrix),
            sessions: SessionManager::new(Arc::clone(&transport), &self.config.target),
            tracker: ResourceTracker::new(Arc::clone(&transport)),
            transport,
            primary: None,
            extra_sessions: Vec::new(),
            role: None,
            steps: Vec::new(),
            captures: BTreeMap::new(),
            fixtures,
            matrix_cells: Vec::new(),
            matrix_sessions: Vec::new(),
            recorded_error: None,
        };
        tracing::info!(scenario = scenario.name(), "scenario started");

        let mut phases = vec![ScenarioPhase::Init];
        let mut aborted = false;
        match ctx.authenticate(scenario.authentication()).await {
            Ok(()) => phases.push(ScenarioPhase::Authenticated),
            Err(err) => {
                ctx.record_abort("authenticate", &err);
                aborted = true;
            }
        }
        if !aborted {
            phases.push(ScenarioPhase::Acting);
            match AssertUnwindSafe(scenario.act(&mut ctx)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    ctx.record_abort("act", &err);
                    aborted = true;
                }
                Err(payload) => {
                    ctx.record_panic("act", payload.as_ref());
                    aborted = true;
                }
            }
        }
        if !aborted {
            phases.push(ScenarioPhase::Verifying);
            let verified = std::panic::catch_unwind(AssertUnwindSafe(|| {
                let mut verification = Verification::new(&ctx.captures);
                scenario.verify(&mut verification);
                verification.into_steps()
            }));
            match verified {
                Ok(steps) => {
                    for step in steps {
                        ctx.record(step);
                    }
                }
                Err(payload) => ctx.record_panic("verify", payload.as_ref()),
            }
        }

        phases.push(ScenarioPhase::Cleanup);
        let releases = ctx.tracker.release_all().await;
        let sessions = ctx.close_sessions().await;
        phases.push(ScenarioPhase::Done);

        let report = ScenarioReport {
            scenario: scenario.name().to_string(),
            description: scenario.description().to_string(),
            role: ctx.role.take(),
            outcome: ScenarioReport::outcome_of(&ctx.steps),
            phases,
            steps: std::mem::take(&mut ctx.steps),
            releases,
            sessions,
            matrix: std::mem::take(&mut ctx.matrix_cells),
            transcript: recorder.take_transcript().await,
            started_at: started_at.format(&Rfc3339).unwrap_or_default(),
            duration_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        tracing::info!(
            scenario = %report.scenario,
            passed = report.passed(),
            steps = report.steps.len(),
            cleanup_failures = report.cleanup_failures(),
            "scenario finished"
        );
        report
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Checks that a response status is one of `accepted`.
fn status_in(step: &str, response: &ApiResponse, accepted: &[u16]) -> Result<(), AssertionFailure> {
    if accepted.contains(&response.status) {
        Ok(())
    } else {
        Err(AssertionFailure::new(
            step,
            format!("status in {}", StatusList(accepted)),
            response.status.to_string(),
        ))
    }
}

/// Identifier fields probed on a create response, in order.
const ID_FIELDS: [&str; 3] = ["id", "_id", "employee_id"];

/// Extracts the created resource identifier from a response.
#[must_use]
pub fn response_id(response: &ApiResponse) -> Option<ResourceId> {
    let entity = response.entity();
    ID_FIELDS.iter().find_map(|field| entity.get(field).and_then(ResourceId::from_json))
}

/// Checks that `observed` echoes every key of the `submitted` object.
///
/// Numbers compare numerically, so `5000` matches `5000.0` and `"5000.00"`.
///
/// # Errors
///
/// Returns [`AssertionFailure`] naming the first mismatching key.
pub fn fields_match(submitted: &Value, observed: &Value) -> Result<(), AssertionFailure> {
    let Some(submitted) = submitted.as_object() else {
        return Err(AssertionFailure::new("submitted body", "object", submitted.to_string()));
    };
    for (key, expected) in submitted {
        let actual = observed.get(key).unwrap_or(&Value::Null);
        if !values_match(expected, actual) {
            return Err(AssertionFailure::new(
                format!("field {key}"),
                expected.to_string(),
                actual.to_string(),
            ));
        }
    }
    Ok(())
}

/// Compares two JSON values, treating numeric strings as numbers.
fn values_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(left), Value::Number(right)) => numbers_equal(left.as_f64(), right.as_f64()),
        (Value::Number(left), Value::String(right)) => {
            numbers_equal(left.as_f64(), right.trim().parse::<f64>().ok())
        }
        (Value::Object(left), Value::Object(_)) => {
            left.iter().all(|(key, value)| values_match(value, actual.get(key).unwrap_or(&Value::Null)))
        }
        _ => expected == actual,
    }
}

/// Compares two optional floats within machine epsilon.
fn numbers_equal(left: Option<f64>, right: Option<f64>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => (left - right).abs() <= f64::EPSILON * left.abs().max(1.0),
        _ => false,
    }
}

/// Renders a status list as `201|200`.
struct StatusList<'a>(&'a [u16]);

impl fmt::Display for StatusList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, status) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("|")?;
            }
            write!(f, "{status}")?;
        }
        Ok(())
    }
}
