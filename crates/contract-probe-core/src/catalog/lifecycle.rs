// crates/contract-probe-core/src/catalog/lifecycle.rs
// ============================================================================
// Module: CRUD Roundtrip Scenarios
// Description: Create, read, update and re-read a resource.
// Purpose: Verify that reads echo every submitted field.
// Dependencies: async-trait, serde_json
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use contract_probe_config::HttpMethod;
use serde_json::Value;
use serde_json::json;

use crate::catalog::unique_suffix;
use crate::core::error::ProbeError;
use crate::core::resource::ResourceKind;
use crate::runtime::scenario::Scenario;
use crate::runtime::scenario::ScenarioContext;
use crate::runtime::scenario::Verification;
use crate::runtime::scenario::fields_match;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Capture key of the create body.
const SUBMITTED: &str = "submitted";
/// Capture key of the first read.
const READ: &str = "read";
/// Capture key of the update body.
const UPDATE_SUBMITTED: &str = "update-submitted";
/// Capture key of the read after update.
const REREAD: &str = "reread";

// ============================================================================
// SECTION: Scenario
// ============================================================================

/// Builds a JSON body from a unique suffix.
type BodyFn = fn(&str) -> Value;

/// Create, read, update, re-read for one resource kind.
#[derive(Debug, Clone)]
pub struct CrudRoundtrip {
    /// Scenario name.
    name: &'static str,
    /// One-line description.
    description: &'static str,
    /// Resource kind.
    kind: ResourceKind,
    /// Create body builder.
    create_body: BodyFn,
    /// Update body builder.
    update_body: BodyFn,
}

impl CrudRoundtrip {
    /// Employee roundtrip.
    #[must_use]
    pub fn employee() -> Self {
        Self {
            name: "employee-roundtrip",
            description: "employee create/read/update echoes every submitted field",
            kind: ResourceKind::Employee,
            create_body: |suffix| {
                json!({
                    "first_name": "Probe",
                    "last_name": format!("Employee {suffix}"),
                    "email": format!("probe.employee.{suffix}@example.com"),
                    "role": "Intern",
                })
            },
            update_body: |_| json!({ "role": "Senior Intern" }),
        }
    }

    /// Client roundtrip.
    #[must_use]
    pub fn client() -> Self {
        Self {
            name: "client-roundtrip",
            description: "client create/read/update echoes every submitted field",
            kind: ResourceKind::Client,
            create_body: client_body,
            update_body: |_| json!({ "company": "Probe Company Updated" }),
        }
    }
}

/// Client create body shared with payment scenarios.
pub(crate) fn client_body(suffix: &str) -> Value {
    json!({
        "name": format!("Probe Client {suffix}"),
        "email": format!("probe.client.{suffix}@example.com"),
        "company": "Probe Company",
    })
}

#[async_trait]
impl Scenario for CrudRoundtrip {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    async fn act(&self, ctx: &mut ScenarioContext) -> Result<(), ProbeError> {
        let suffix = unique_suffix();
        let kind = self.kind;
        let body = (self.create_body)(&suffix);
        let (id, _) =
            ctx.create(&format!("create {kind}"), kind, &kind.collection_path(), body.clone()).await?;
        ctx.capture(SUBMITTED, body);
        let path = kind.item_path(&id);

        let request = ctx.request(HttpMethod::Get, path.clone());
        let read = ctx.send(&format!("read {kind}"), request).await?;
        ctx.require_status(&format!("read {kind}"), &read, &[200])?;
        ctx.capture(READ, read.entity().clone());

        let update = (self.update_body)(&suffix);
        let request = ctx.request(HttpMethod::Put, path.clone()).with_body(update.clone());
        let updated = ctx.send(&format!("update {kind}"), request).await?;
        ctx.require_status(&format!("update {kind}"), &updated, &[200])?;
        ctx.capture(UPDATE_SUBMITTED, update);

        let request = ctx.request(HttpMethod::Get, path);
        let reread = ctx.send(&format!("re-read {kind}"), request).await?;
        ctx.require_status(&format!("re-read {kind}"), &reread, &[200])?;
        ctx.capture(REREAD, reread.entity().clone());
        Ok(())
    }

    fn verify(&self, verification: &mut Verification<'_>) {
        echo_check(verification, "read echoes created fields", SUBMITTED, READ);
        echo_check(verification, "re-read echoes updated fields", UPDATE_SUBMITTED, REREAD);
    }
}

/// Checks that the `observed` capture echoes every key of `submitted`.
fn echo_check(verification: &mut Verification<'_>, step: &str, submitted: &str, observed: &str) {
    let submitted = verification.require(step, submitted);
    let observed = verification.require(step, observed);
    if let (Some(submitted), Some(observed)) = (submitted, observed) {
        verification.check(step, fields_match(submitted, observed));
    }
}
