// crates/contract-probe-core/src/catalog/auth.rs
// ============================================================================
// Module: Authentication Scenarios
// Description: Login, logout and invalid-credential scenarios.
// Purpose: Verify that sessions authorize requests only while they are open.
// Dependencies: async-trait
// ============================================================================

//! ## Overview
//! `login-logout` picks the first non-speculative GET operation that the
//! session's role is granted, so the authorized read is known to be allowed
//! before logout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use contract_probe_config::HttpMethod;
use contract_probe_config::IdentifierKind;

use crate::catalog::success;
use crate::catalog::unique_suffix;
use crate::core::credential::Credential;
use crate::core::error::AssertionFailure;
use crate::core::error::ProbeError;
use crate::core::report::StepResult;
use crate::core::report::StepStatus;
use crate::interfaces::ApiRequest;
use crate::runtime::scenario::Authentication;
use crate::runtime::scenario::Scenario;
use crate::runtime::scenario::ScenarioContext;

// ============================================================================
// SECTION: Login / Logout
// ============================================================================

/// Authorized read, logout, then the stale token must be refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginLogout;

#[async_trait]
impl Scenario for LoginLogout {
    fn name(&self) -> &str {
        "login-logout"
    }

    fn description(&self) -> &str {
        "authorized read succeeds; after logout the same token is refused"
    }

    async fn act(&self, ctx: &mut ScenarioContext) -> Result<(), ProbeError> {
        let path = authorized_read_path(ctx)?;
        let request = ctx.request(HttpMethod::Get, path.clone());
        let response = ctx.send("authorized read", request).await?;
        ctx.require("authorized read", success("authorized read", &response))?;

        let stale = ctx.logout_primary("logout").await?;

        let replay = ApiRequest::get(path).with_auth(Some(stale));
        let response = ctx.send("stale token replay", replay).await?;
        ctx.expect_status("stale token refused", &response, &[401, 403]);
        Ok(())
    }
}

/// Returns the path of a GET operation granted to the session's role.
fn authorized_read_path(ctx: &ScenarioContext) -> Result<String, ProbeError> {
    let role = ctx
        .session()
        .map(|session| session.role().as_str().to_string())
        .ok_or_else(|| ProbeError::Setup("no session".to_string()))?;
    ctx.config()
        .operations
        .iter()
        .find(|operation| {
            operation.method == HttpMethod::Get
                && !operation.speculative
                && operation.allow.iter().any(|allowed| *allowed == role)
        })
        .map(|operation| operation.path.clone())
        .ok_or_else(|| ProbeError::Setup(format!("no GET operation is granted to role {role}")))
}

// ============================================================================
// SECTION: Invalid Login
// ============================================================================

/// Wrong credentials must yield an authentication error.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidLogin;

#[async_trait]
impl Scenario for InvalidLogin {
    fn name(&self) -> &str {
        "invalid-login"
    }

    fn description(&self) -> &str {
        "wrong secret and unknown identifier are refused with an authentication error"
    }

    fn authentication(&self) -> Authentication {
        Authentication::Anonymous
    }

    async fn act(&self, ctx: &mut ScenarioContext) -> Result<(), ProbeError> {
        let suffix = unique_suffix();
        let known = ctx.default_credential()?;
        let wrong_secret = known.with_secret(format!("not-the-secret-{suffix}"));
        expect_refused(ctx, "wrong secret refused", &wrong_secret).await?;

        let unknown = Credential::new(
            known.role().clone(),
            format!("nobody.{suffix}@invalid.example"),
            "not-a-password",
            IdentifierKind::Email,
        );
        expect_refused(ctx, "unknown identifier refused", &unknown).await
    }
}

/// Attempts a login that must fail with an authentication error.
async fn expect_refused(
    ctx: &mut ScenarioContext,
    step: &str,
    credential: &Credential,
) -> Result<(), ProbeError> {
    match ctx.attempt_login(credential).await {
        Err(ProbeError::Authentication(err)) => {
            ctx.record(StepResult::new(step, StepStatus::Pass, Some(err.to_string())));
            Ok(())
        }
        Err(err) => Err(err),
        Ok(_) => {
            ctx.check(
                step,
                Err(AssertionFailure::new(step, "authentication error", "session opened")),
            );
            Ok(())
        }
    }
}
