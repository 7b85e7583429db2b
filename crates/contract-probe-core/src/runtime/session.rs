// crates/contract-probe-core/src/runtime/session.rs
// ============================================================================
// Module: Session Manager
// Description: Login and logout against the system under test.
// Purpose: Turn credentials into sessions and close them idempotently.
// Dependencies: serde_json, tracing
// ============================================================================

//! ## Overview
//! The session manager owns no session state; every [`Session`] it returns is
//! owned by its caller, so sessions for different credentials never share
//! mutable state.
//!
//! Login accepts any 2xx response that carries a token under `token`,
//! `accessToken` or `access_token`, or failing that a `Set-Cookie` header.
//! A success response with neither is an [`AuthenticationError`].
//!
//! # Invariants
//! - [`SessionManager::close_session`] never returns an error and never sends
//!   a second logout for the same session.
//! - Secrets and tokens are never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use contract_probe_config::HttpMethod;
use contract_probe_config::TargetConfig;
use serde_json::Value;

use crate::core::credential::Credential;
use crate::core::credential::Session;
use crate::core::credential::SessionAuth;
use crate::core::error::AuthenticationError;
use crate::core::error::CleanupError;
use crate::core::error::ProbeError;
use crate::core::report::CloseOutcome;
use crate::interfaces::ApiRequest;
use crate::interfaces::ApiTransport;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Login response fields that may carry the bearer token, in lookup order.
pub const TOKEN_FIELDS: [&str; 3] = ["token", "accessToken", "access_token"];

// ============================================================================
// SECTION: Session Manager
// ============================================================================

/// Performs login and logout calls.
#[derive(Clone)]
pub struct SessionManager {
    /// Transport used for auth calls.
    transport: Arc<dyn ApiTransport>,
    /// Login path on the auth origin.
    login_path: String,
    /// Logout path on the auth origin.
    logout_path: String,
}

impl SessionManager {
    /// Creates a session manager using the target's login and logout paths.
    #[must_use]
    pub fn new(transport: Arc<dyn ApiTransport>, target: &TargetConfig) -> Self {
        Self {
            transport,
            login_path: target.login_path.clone(),
            logout_path: target.logout_path.clone(),
        }
    }

    /// Logs in with a credential.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Transport`] when the login call could not be
    /// completed and [`ProbeError::Authentication`] when the system under test
    /// refused the credential or returned no token or cookie.
    pub async fn open_session(&self, credential: &Credential) -> Result<Session, ProbeError> {
        let request =
            ApiRequest::post(self.login_path.clone(), credential.login_body()).on_auth_origin();
        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            tracing::info!(
                role = %credential.role(),
                status = response.status,
                "login rejected"
            );
            return Err(AuthenticationError::Rejected {
                identifier: credential.identifier().to_string(),
                status: response.status,
            }
            .into());
        }
        let entity = response.entity();
        let auth = extract_token(entity)
            .or_else(|| extract_token(&response.body))
            .map(SessionAuth::Bearer)
            .or_else(|| response.set_cookie.clone().map(SessionAuth::Cookie))
            .ok_or_else(|| AuthenticationError::MissingToken {
                identifier: credential.identifier().to_string(),
            })?;
        let user = entity.get("user").filter(|user| user.is_object()).cloned();
        let session = Session::new(credential, auth, user);
        tracing::info!(
            role = %session.role(),
            reported_role = session.reported_role().unwrap_or("unknown"),
            "session opened"
        );
        Ok(session)
    }

    /// Logs a session out.
    ///
    /// Calling this on a closed session returns [`CloseOutcome::AlreadyClosed`]
    /// without contacting the system under test. Failures are logged and
    /// returned as [`CloseOutcome::Failed`]; they are never propagated.
    pub async fn close_session(&self, session: &mut Session) -> CloseOutcome {
        if !session.mark_closed() {
            return CloseOutcome::AlreadyClosed;
        }
        let request = ApiRequest::new(HttpMethod::Post, self.logout_path.clone())
            .with_auth(Some(session.auth().clone()))
            .on_auth_origin();
        let failure = match self.transport.send(&request).await {
            Ok(response) if response.is_success() => {
                tracing::info!(role = %session.role(), "session closed");
                return CloseOutcome::LoggedOut;
            }
            Ok(response) => format!("status {}", response.status),
            Err(err) => err.to_string(),
        };
        let error = CleanupError::Logout {
            role: session.role().clone(),
            message: failure,
        };
        tracing::warn!(error = %error, "logout failed");
        CloseOutcome::Failed(error.to_string())
    }

    /// Closes an optional session; `None` counts as already closed.
    pub async fn close_optional(&self, session: Option<&mut Session>) -> CloseOutcome {
        match session {
            Some(session) => self.close_session(session).await,
            None => CloseOutcome::AlreadyClosed,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the first non-empty token field of a login body.
fn extract_token(body: &Value) -> Option<String> {
    TOKEN_FIELDS
        .iter()
        .filter_map(|field| body.get(field).and_then(Value::as_str))
        .map(str::trim)
        .find(|token| !token.is_empty())
        .map(str::to_string)
}
