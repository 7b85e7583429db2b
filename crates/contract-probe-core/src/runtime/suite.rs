// crates/contract-probe-core/src/runtime/suite.rs
// ============================================================================
// Module: Suite Runner
// Description: Runs scenarios concurrently with an optional fixture scope.
// Purpose: Share expensive fixtures read-only while keeping scenarios isolated.
// Dependencies: tokio, tracing
// ============================================================================

//! ## Overview
//! Every scenario runs in its own tokio task with its own session and
//! tracker. Shared fixtures live in a [`FixtureScope`] wider than any single
//! scenario:
//! 1. the suite creates fixtures before any scenario starts (single writer);
//! 2. the scope is sealed and scenarios receive a read-only [`FixtureSet`];
//! 3. after every scenario has finished, the scope releases its fixtures and
//!    closes its own session.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::task::JoinSet;

use crate::core::credential::Credential;
use crate::core::credential::Session;
use crate::core::error::ProbeError;
use crate::core::identifiers::ResourceId;
use crate::core::report::FixtureReport;
use crate::core::report::ScenarioOutcome;
use crate::core::report::ScenarioPhase;
use crate::core::report::ScenarioReport;
use crate::core::report::SessionCleanup;
use crate::core::report::StepResult;
use crate::core::report::StepStatus;
use crate::core::report::SuiteReport;
use crate::core::resource::ResourceKind;
use crate::core::resource::TrackedResource;
use crate::interfaces::ApiRequest;
use crate::interfaces::ApiTransport;
use crate::runtime::scenario::Scenario;
use crate::runtime::scenario::ScenarioExecutor;
use crate::runtime::scenario::response_id;
use crate::runtime::session::SessionManager;
use crate::runtime::tracker::ResourceTracker;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// A shared fixture to create before scenarios start.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureSpec {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Create path.
    pub path: String,
    /// Create body.
    pub body: Value,
}

impl FixtureSpec {
    /// Creates a spec posting to the kind's collection path.
    #[must_use]
    pub fn new(kind: ResourceKind, body: Value) -> Self {
        Self {
            kind,
            path: kind.collection_path(),
            body,
        }
    }
}

/// Read-only view of created fixtures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureSet {
    /// Fixture identifiers by kind.
    resources: BTreeMap<ResourceKind, ResourceId>,
}

impl FixtureSet {
    /// Returns the fixture of the given kind.
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> Option<&ResourceId> {
        self.resources.get(&kind)
    }

    /// Returns the number of fixtures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true when no fixture was created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Owner of shared fixtures for the lifetime of a suite.
///
/// # Invariants
/// - Only the scope writes fixtures, and only before [`FixtureScope::seal`].
pub struct FixtureScope {
    /// Transport for fixture creates.
    transport: Arc<dyn ApiTransport>,
    /// Login/logout calls.
    sessions: SessionManager,
    /// Fixtures awaiting release.
    tracker: ResourceTracker,
    /// Credential the fixtures are created with.
    credential: Option<Credential>,
    /// Session opened on first create.
    session: Option<Session>,
    /// Fixtures created so far.
    fixtures: FixtureSet,
    /// Set once scenarios may read the fixtures.
    sealed: bool,
}

impl FixtureScope {
    /// Creates an empty scope using the executor's transport and default role.
    #[must_use]
    pub fn new(executor: &ScenarioExecutor) -> Self {
        let transport = Arc::clone(executor.transport());
        Self {
            sessions: SessionManager::new(Arc::clone(&transport), &executor.config().target),
            tracker: ResourceTracker::new(Arc::clone(&transport)),
            transport,
            credential: executor.config().default_role().map(Credential::from),
            session: None,
            fixtures: FixtureSet::default(),
            sealed: false,
        }
    }

    /// Creates one fixture.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the scope is sealed, login fails, or the
    /// create is not accepted.
    pub async fn create(&mut self, spec: &FixtureSpec) -> Result<ResourceId, ProbeError> {
        if self.sealed {
            return Err(ProbeError::Setup("fixture scope is sealed".to_string()));
        }
        let Some(credential) = &self.credential else {
            return Err(ProbeError::Setup("no roles declared".to_string()));
        };
        if self.session.is_none() {
            self.session = Some(self.sessions.open_session(credential).await?);
        }
        let auth = self.session.as_ref().map(|session| session.auth().clone());
        let request = ApiRequest::post(spec.path.clone(), spec.body.clone()).with_auth(auth.clone());
        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(ProbeError::Setup(format!(
                "fixture {} create returned status {}",
                spec.kind, response.status
            )));
        }
        let id = response_id(&response)
            .ok_or_else(|| ProbeError::Setup(format!("fixture {} has no id", spec.kind)))?;
        self.tracker.track(TrackedResource {
            kind: spec.kind,
            id: id.clone(),
            owner: credential.role().clone(),
            auth,
        });
        self.fixtures.resources.insert(spec.kind, id.clone());
        tracing::info!(kind = %spec.kind, id = %id, "fixture created");
        Ok(id)
    }

    /// Ends the write phase and returns the read-only fixture view.
    pub fn seal(&mut self) -> Arc<FixtureSet> {
        self.sealed = true;
        Arc::new(self.fixtures.clone())
    }

    /// Releases fixtures, then closes the scope's session.
    pub async fn close(mut self) -> FixtureReport {
        let releases = self.tracker.release_all().await;
        let mut sessions = Vec::new();
        if let Some(session) = self.session.as_mut() {
            sessions.push(SessionCleanup {
                role: session.role().clone(),
                outcome: self.sessions.close_session(session).await,
            });
        }
        FixtureReport {
            setup_error: None,
            releases,
            sessions,
        }
    }
}

// ============================================================================
// SECTION: Suite Runner
// ============================================================================

/// Runs a set of scenarios concurrently.
#[derive(Clone)]
pub struct SuiteRunner {
    /// Shared executor.
    executor: ScenarioExecutor,
    /// Fixtures created before scenarios start.
    fixtures: Vec<FixtureSpec>,
}

impl SuiteRunner {
    /// Creates a runner without shared fixtures.
    #[must_use]
    pub const fn new(executor: ScenarioExecutor) -> Self {
        Self {
            executor,
            fixtures: Vec::new(),
        }
    }

    /// Adds shared fixtures.
    #[must_use]
    pub fn with_fixtures(mut self, fixtures: Vec<FixtureSpec>) -> Self {
        self.fixtures = fixtures;
        self
    }

    /// Runs every scenario and aggregates their reports in request order.
    pub async fn run(&self, scenarios: &[Arc<dyn Scenario>]) -> SuiteReport {
        let (scope, fixtures, setup_error) = self.open_fixtures().await;

        let mut tasks = JoinSet::new();
        for (index, scenario) in scenarios.iter().enumerate() {
            let executor = self.executor.clone();
            let scenario = Arc::clone(scenario);
            let fixtures = fixtures.clone();
            tasks.spawn(async move { (index, executor.run(scenario.as_ref(), fixtures).await) });
        }
        let mut reports: Vec<Option<ScenarioReport>> = scenarios.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => {
                    if let Some(slot) = reports.get_mut(index) {
                        *slot = Some(report);
                    }
                }
                Err(err) => tracing::error!(error = %err, "scenario task failed"),
            }
        }
        let scenarios = reports
            .into_iter()
            .zip(scenarios)
            .map(|(report, scenario)| report.unwrap_or_else(|| failed_task_report(scenario.as_ref())))
            .collect();

        let fixtures = match scope {
            Some(scope) => {
                let mut report = scope.close().await;
                report.setup_error = setup_error;
                Some(report)
            }
            None => None,
        };
        SuiteReport {
            base_url: self.executor.config().target.base_url.clone(),
            scenarios,
            fixtures,
        }
    }

    /// Creates and seals the fixture scope, when fixtures were requested.
    async fn open_fixtures(
        &self,
    ) -> (Option<FixtureScope>, Option<Arc<FixtureSet>>, Option<String>) {
        if self.fixtures.is_empty() {
            return (None, None, None);
        }
        let mut scope = FixtureScope::new(&self.executor);
        let mut setup_error = None;
        for spec in &self.fixtures {
            if let Err(err) = scope.create(spec).await {
                tracing::warn!(kind = %spec.kind, error = %err, "fixture setup failed");
                setup_error = Some(err.to_string());
                break;
            }
        }
        let fixtures = scope.seal();
        (Some(scope), Some(fixtures), setup_error)
    }
}

/// Builds the report of a scenario whose task did not complete.
fn failed_task_report(scenario: &dyn Scenario) -> ScenarioReport {
    ScenarioReport {
        scenario: scenario.name().to_string(),
        description: scenario.description().to_string(),
        role: None,
        outcome: ScenarioOutcome::Fail,
        phases: vec![ScenarioPhase::Init],
        steps: vec![StepResult::new(
            "run",
            StepStatus::Error,
            Some("scenario task did not complete".to_string()),
        )],
        releases: Vec::new(),
        sessions: Vec::new(),
        matrix: Vec::new(),
        transcript: Vec::new(),
        started_at: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        duration_ms: 0,
    }
}
