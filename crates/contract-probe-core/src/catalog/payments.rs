// crates/contract-probe-core/src/catalog/payments.rs
// ============================================================================
// Module: Payment Scenarios
// Description: Proof-of-payment and project-deletion contracts.
// Purpose: Exercise nested client -> project -> payment resources.
// Dependencies: async-trait, serde_json
// ============================================================================

//! ## Overview
//! Both scenarios need a client. When the suite provides a client fixture it
//! is reused read-only; otherwise the scenario creates and tracks its own.
//! Projects and payments are always created per scenario, so every child the
//! scenario adds is deleted before the fixture itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use contract_probe_config::HttpMethod;
use serde_json::Value;
use serde_json::json;

use crate::catalog::lifecycle::client_body;
use crate::catalog::unique_suffix;
use crate::core::error::AssertionFailure;
use crate::core::error::ProbeError;
use crate::core::identifiers::ResourceId;
use crate::core::report::StepResult;
use crate::core::report::StepStatus;
use crate::core::resource::ResourceKind;
use crate::runtime::scenario::Scenario;
use crate::runtime::scenario::ScenarioContext;
use crate::runtime::scenario::Verification;
use crate::runtime::scenario::response_id;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Capture key of the rejection body text.
const REJECTION: &str = "rejection";
/// Capture key of the submitted proof URL.
const PROOF_SUBMITTED: &str = "proof-submitted";
/// Capture key of the created payment entity.
const CREATED: &str = "created";

// ============================================================================
// SECTION: Payment Proof
// ============================================================================

/// One-time payments require a proof URL, and created payments echo it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentProof;

#[async_trait]
impl Scenario for PaymentProof {
    fn name(&self) -> &str {
        "payment-proof"
    }

    fn description(&self) -> &str {
        "one-time payment without proof_url is rejected; with proof_url it is created and echoed"
    }

    async fn act(&self, ctx: &mut ScenarioContext) -> Result<(), ProbeError> {
        let suffix = unique_suffix();
        let client = client_for(ctx, &suffix).await?;
        let project = create_project(ctx, &client, &suffix).await?;
        let payments = payments_path(&project);

        let request = ctx
            .request(HttpMethod::Post, payments.clone())
            .with_body(payment_body(&suffix, None));
        let rejected = ctx.send("payment without proof", request).await?;
        if rejected.is_success()
            && let Some(id) = response_id(&rejected)
        {
            ctx.track(ResourceKind::Payment, id);
        }
        ctx.expect_status("payment without proof rejected", &rejected, &[400, 422]);
        ctx.capture(REJECTION, Value::String(rejected.body_text()));

        let proof = format!("https://drive.google.com/file/d/probe-{suffix}/view");
        let (_, created) = ctx
            .create(
                "payment with proof",
                ResourceKind::Payment,
                &payments,
                payment_body(&suffix, Some(&proof)),
            )
            .await?;
        ctx.expect_status("payment with proof created", &created, &[201]);
        ctx.capture(PROOF_SUBMITTED, Value::String(proof));
        ctx.capture(CREATED, created.entity().clone());
        Ok(())
    }

    fn verify(&self, verification: &mut Verification<'_>) {
        let step = "rejection mentions proof";
        if let Some(rejection) = verification.require(step, REJECTION) {
            let text = rejection.as_str().unwrap_or_default().to_ascii_lowercase();
            let result = if text.contains("proof") {
                Ok(())
            } else {
                Err(AssertionFailure::new(step, "body mentions proof", text))
            };
            verification.check(step, result);
        }

        let step = "created payment echoes proof_url";
        let submitted = verification.require(step, PROOF_SUBMITTED);
        let created = verification.require(step, CREATED);
        if let (Some(submitted), Some(created)) = (submitted, created) {
            let observed = created.get("proof_url").unwrap_or(&Value::Null);
            let result = if observed == submitted {
                Ok(())
            } else {
                Err(AssertionFailure::new(step, submitted.to_string(), observed.to_string()))
            };
            verification.check(step, result);
        }
    }
}

// ============================================================================
// SECTION: Project Cascade
// ============================================================================

/// Deleting a project that has a payment is rejected or cascades.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectCascade;

#[async_trait]
impl Scenario for ProjectCascade {
    fn name(&self) -> &str {
        "project-cascade"
    }

    fn description(&self) -> &str {
        "deleting a project with a payment is rejected, or removes the payment too"
    }

    async fn act(&self, ctx: &mut ScenarioContext) -> Result<(), ProbeError> {
        let suffix = unique_suffix();
        let client = client_for(ctx, &suffix).await?;
        let project = create_project(ctx, &client, &suffix).await?;
        let proof = format!("https://drive.google.com/file/d/cascade-{suffix}/view");
        let (payment, _) = ctx
            .create(
                "create payment",
                ResourceKind::Payment,
                &payments_path(&project),
                payment_body(&suffix, Some(&proof)),
            )
            .await?;

        let step = "delete project with payment";
        let request = ctx.request(HttpMethod::Delete, ResourceKind::Project.item_path(&project));
        let deleted = ctx.send(step, request).await?;
        match deleted.status {
            400 | 409 | 422 => ctx.record(StepResult::new(
                step,
                StepStatus::Pass,
                Some(format!("rejected with status {}", deleted.status)),
            )),
            200 | 202 | 204 => {
                ctx.record(StepResult::new(
                    step,
                    StepStatus::Pass,
                    Some(format!("deleted with status {}", deleted.status)),
                ));
                let request =
                    ctx.request(HttpMethod::Get, ResourceKind::Payment.item_path(&payment));
                let follow = ctx.send("read payment after delete", request).await?;
                ctx.expect_status("payment removed with project", &follow, &[404]);
            }
            other => {
                ctx.check(
                    step,
                    Err(AssertionFailure::new(
                        step,
                        "rejection (400|409|422) or cascade (200|202|204)",
                        other.to_string(),
                    )),
                );
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the client fixture, or creates a tracked client.
async fn client_for(ctx: &mut ScenarioContext, suffix: &str) -> Result<ResourceId, ProbeError> {
    if let Some(client) = ctx.fixture(ResourceKind::Client) {
        return Ok(client);
    }
    let path = ResourceKind::Client.collection_path();
    let (id, _) = ctx
        .create("create client", ResourceKind::Client, &path, client_body(suffix))
        .await?;
    Ok(id)
}

/// Creates a tracked project under a client.
async fn create_project(
    ctx: &mut ScenarioContext,
    client: &ResourceId,
    suffix: &str,
) -> Result<ResourceId, ProbeError> {
    let path = format!("{}/projects", ResourceKind::Client.item_path(client));
    let body = json!({
        "name": format!("Probe Project {suffix}"),
        "description": "contract probe project",
        "status": "active",
        "budget": 5000,
    });
    let (id, _) = ctx.create("create project", ResourceKind::Project, &path, body).await?;
    Ok(id)
}

/// Returns the payments collection of a project.
fn payments_path(project: &ResourceId) -> String {
    format!("{}/payments", ResourceKind::Project.item_path(project))
}

/// Builds a one-time payment body.
fn payment_body(suffix: &str, proof_url: Option<&str>) -> Value {
    let mut body = json!({
        "type": "one-time",
        "amount": 300.0,
        "currency": "USD",
        "due_date": "2030-10-15",
        "status": "pending",
        "description": format!("Probe payment {suffix}"),
    });
    if let (Some(proof_url), Some(fields)) = (proof_url, body.as_object_mut()) {
        fields.insert("proof_url".to_string(), Value::String(proof_url.to_string()));
    }
    body
}
