// crates/contract-probe-core/src/runtime/matrix.rs
// ============================================================================
// Module: Role Matrix Runner
// Description: Probes every (role, protected operation) pair.
// Purpose: Compare observed access decisions against a default-deny table.
// Dependencies: tokio, tracing
// ============================================================================

//! ## Overview
//! [`AccessMatrix`] is the static expected-access table. Granting access
//! requires an explicit entry; every role absent from an operation's
//! allow-list, and the unauthenticated caller, is expected to be denied.
//!
//! [`RoleMatrixRunner`] opens one session per role, reuses it for every
//! operation, and runs the role rows concurrently. Each row owns its session
//! and closes it when the row finishes.
//!
//! Classification:
//! - 2xx is `allowed`, 401/403 is `denied`.
//! - 404 on a speculative endpoint is `not implemented`, never an access
//!   failure.
//! - Anything else is `unexpected` and fails the cell.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use contract_probe_config::ProbeConfig;
use tokio::task::JoinSet;

use crate::core::access::Access;
use crate::core::access::AccessExpectation;
use crate::core::access::CellVerdict;
use crate::core::access::MatrixCell;
use crate::core::access::Observed;
use crate::core::access::Operation;
use crate::core::credential::Credential;
use crate::core::identifiers::RoleName;
use crate::core::report::SessionCleanup;
use crate::interfaces::ApiRequest;
use crate::interfaces::ApiTransport;
use crate::runtime::session::SessionManager;

// ============================================================================
// SECTION: Access Matrix
// ============================================================================

/// Expected-access table for roles x protected operations.
///
/// # Invariants
/// - Access is granted only by an explicit (operation, role) entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessMatrix {
    /// Declared roles in table order.
    roles: Vec<RoleName>,
    /// Protected operations in table order.
    operations: Vec<Operation>,
    /// Explicit grants keyed by operation name.
    grants: BTreeMap<String, BTreeSet<RoleName>>,
}

impl AccessMatrix {
    /// Creates a matrix with no grants.
    #[must_use]
    pub fn new(roles: Vec<RoleName>, operations: Vec<Operation>) -> Self {
        Self {
            roles,
            operations,
            grants: BTreeMap::new(),
        }
    }

    /// Builds the matrix from the role and operation tables.
    #[must_use]
    pub fn from_config(config: &ProbeConfig) -> Self {
        let roles = config.roles.iter().map(|role| RoleName::new(role.name.clone())).collect();
        let operations = config.operations.iter().map(Operation::from).collect();
        let mut matrix = Self::new(roles, operations);
        for operation in &config.operations {
            for role in &operation.allow {
                matrix.grant(&operation.name, RoleName::new(role.clone()));
            }
        }
        matrix
    }

    /// Grants a role access to an operation.
    pub fn grant(&mut self, operation: &str, role: RoleName) {
        self.grants.entry(operation.to_string()).or_default().insert(role);
    }

    /// Returns declared roles.
    #[must_use]
    pub fn roles(&self) -> &[RoleName] {
        &self.roles
    }

    /// Returns protected operations.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Returns the expected access of `role` (or the anonymous caller when
    /// `None`) to the named operation.
    #[must_use]
    pub fn expected(&self, role: Option<&RoleName>, operation: &str) -> Access {
        match (role, self.grants.get(operation)) {
            (Some(role), Some(allowed)) if allowed.contains(role) => Access::Allow,
            // Unlisted roles, unknown operations and anonymous callers.
            _ => Access::Deny,
        }
    }

    /// Expands the table into one expectation per (role, operation) pair,
    /// followed by the anonymous row.
    #[must_use]
    pub fn expectations(&self) -> Vec<AccessExpectation> {
        let rows = self.roles.iter().map(Some).chain(std::iter::once(None));
        rows.flat_map(|role| {
            self.operations.iter().map(move |operation| AccessExpectation {
                role: role.cloned(),
                operation: operation.name.clone(),
                expected: self.expected(role, &operation.name),
            })
        })
        .collect()
    }
}

/// Classifies a response status.
#[must_use]
pub const fn classify(status: u16, speculative: bool) -> Observed {
    match status {
        200..=299 => Observed::Allowed,
        401 | 403 => Observed::Denied,
        404 if speculative => Observed::NotImplemented,
        _ => Observed::Unexpected,
    }
}

/// Compares an observation with its expectation.
#[must_use]
pub const fn judge(expected: Access, observed: Observed) -> CellVerdict {
    match (expected, observed) {
        (_, Observed::NotImplemented) => CellVerdict::NotImplemented,
        (Access::Allow, Observed::Allowed) | (Access::Deny, Observed::Denied) => CellVerdict::Pass,
        _ => CellVerdict::Fail,
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Cells and session cleanup produced by one matrix run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixRun {
    /// Cells ordered by role row, then operation.
    pub cells: Vec<MatrixCell>,
    /// Close results of the per-role sessions.
    pub sessions: Vec<SessionCleanup>,
}

/// Shared inputs of every matrix row.
#[derive(Clone)]
struct RowContext {
    /// Transport for probe requests.
    transport: Arc<dyn ApiTransport>,
    /// Session manager for per-role logins.
    sessions: SessionManager,
    /// Expected-access table.
    matrix: Arc<AccessMatrix>,
}

/// Result of one role row.
struct RowResult {
    /// Cells for every operation.
    cells: Vec<MatrixCell>,
    /// Session close result, when a session was opened.
    session: Option<SessionCleanup>,
}

/// Runs the role matrix.
pub struct RoleMatrixRunner {
    /// Shared row inputs.
    context: RowContext,
    /// Credentials, one per probed role.
    credentials: Vec<Credential>,
    /// Whether to probe the unauthenticated row.
    include_anonymous: bool,
}

impl RoleMatrixRunner {
    /// Creates a runner probing every credential plus the anonymous row.
    #[must_use]
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        sessions: SessionManager,
        matrix: Arc<AccessMatrix>,
        credentials: Vec<Credential>,
    ) -> Self {
        Self {
            context: RowContext {
                transport,
                sessions,
                matrix,
            },
            credentials,
            include_anonymous: true,
        }
    }

    /// Skips the unauthenticated row.
    #[must_use]
    pub const fn without_anonymous(mut self) -> Self {
        self.include_anonymous = false;
        self
    }

    /// Probes every row concurrently and returns cells in row order.
    pub async fn run(&self) -> MatrixRun {
        let mut rows: Vec<Option<Credential>> =
            self.credentials.iter().cloned().map(Some).collect();
        if self.include_anonymous {
            rows.push(None);
        }
        let mut tasks = JoinSet::new();
        for (index, credential) in rows.iter().enumerate() {
            let context = self.context.clone();
            let credential = credential.clone();
            tasks.spawn(async move { (index, probe_row(&context, credential.as_ref()).await) });
        }
        let mut results: Vec<Option<RowResult>> = rows.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, row)) => {
                    if let Some(slot) = results.get_mut(index) {
                        *slot = Some(row);
                    }
                }
                Err(err) => tracing::error!(error = %err, "matrix row task failed"),
            }
        }
        let mut run = MatrixRun::default();
        for (row, credential) in results.into_iter().zip(&rows) {
            let row = row.unwrap_or_else(|| RowResult {
                cells: error_cells(
                    &self.context.matrix,
                    credential.as_ref().map(Credential::role),
                    "matrix row task failed",
                ),
                session: None,
            });
            run.cells.extend(row.cells);
            run.sessions.extend(row.session);
        }
        run
    }
}

/// Probes every operation for one row.
async fn probe_row(context: &RowContext, credential: Option<&Credential>) -> RowResult {
    let role = credential.map(Credential::role);
    let mut session = match credential {
        Some(credential) => match context.sessions.open_session(credential).await {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::warn!(role = %credential.role(), error = %err, "matrix login failed");
                return RowResult {
                    cells: error_cells(&context.matrix, role, &format!("login failed: {err}")),
                    session: None,
                };
            }
        },
        None => None,
    };
    let auth = session.as_ref().map(|session| session.auth().clone());
    let mut cells = Vec::with_capacity(context.matrix.operations().len());
    for operation in context.matrix.operations() {
        let expected = context.matrix.expected(role, &operation.name);
        let mut request =
            ApiRequest::new(operation.method, operation.path.clone()).with_auth(auth.clone());
        if let Some(body) = &operation.body {
            request = request.with_body(body.clone());
        }
        let mut cell = base_cell(role, operation, expected);
        match context.transport.send(&request).await {
            Ok(response) => {
                let observed = classify(response.status, operation.speculative);
                cell.observed = Some(observed);
                cell.status = Some(response.status);
                cell.verdict = judge(expected, observed);
                if cell.verdict == CellVerdict::Fail {
                    cell.detail = Some(format!(
                        "expected {}, observed {} (status {})",
                        expected.as_str(),
                        observed.as_str(),
                        response.status
                    ));
                }
            }
            Err(err) => {
                cell.verdict = CellVerdict::Error;
                cell.detail = Some(err.to_string());
            }
        }
        cells.push(cell);
    }
    let session = match session.as_mut() {
        Some(session) => Some(SessionCleanup {
            role: session.role().clone(),
            outcome: context.sessions.close_session(session).await,
        }),
        None => None,
    };
    RowResult {
        cells,
        session,
    }
}

/// Builds an unevaluated cell.
fn base_cell(role: Option<&RoleName>, operation: &Operation, expected: Access) -> MatrixCell {
    MatrixCell {
        role: role.map_or_else(|| RoleName::ANONYMOUS.to_string(), ToString::to_string),
        operation: operation.name.clone(),
        method: operation.method,
        path: operation.path.clone(),
        expected,
        observed: None,
        status: None,
        verdict: CellVerdict::Error,
        detail: None,
    }
}

/// Builds error cells for a row that could not be probed.
fn error_cells(matrix: &AccessMatrix, role: Option<&RoleName>, detail: &str) -> Vec<MatrixCell> {
    matrix
        .operations()
        .iter()
        .map(|operation| {
            let mut cell = base_cell(role, operation, matrix.expected(role, &operation.name));
            cell.detail = Some(detail.to_string());
            cell
        })
        .collect()
}
