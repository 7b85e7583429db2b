// crates/contract-probe-core/src/core/credential.rs
// ============================================================================
// Module: Credentials and Sessions
// Description: Login credentials and the authenticated sessions they yield.
// Purpose: Carry secrets and tokens without ever exposing them through Debug.
// Dependencies: contract-probe-config, serde_json, time
// ============================================================================

//! ## Overview
//! A [`Credential`] is immutable input from the role table. A [`Session`] is
//! the result of a successful login and is owned by exactly one scenario (or
//! one fixture scope). Secrets and session tokens are redacted from `Debug`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use contract_probe_config::IdentifierKind;
use contract_probe_config::RoleConfig;
use serde_json::Map;
use serde_json::Value;
use time::OffsetDateTime;

use crate::core::identifiers::RoleName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Placeholder rendered instead of secret material.
const REDACTED: &str = "<redacted>";

// ============================================================================
// SECTION: Credential
// ============================================================================

/// Login credential for a single role.
///
/// # Invariants
/// - The secret never appears in `Debug` output or log events.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Role the credential logs in as.
    role: RoleName,
    /// Login identifier.
    identifier: String,
    /// Login secret.
    secret: String,
    /// Login body field for the identifier.
    identifier_kind: IdentifierKind,
}

impl Credential {
    /// Creates a credential.
    #[must_use]
    pub fn new(
        role: RoleName,
        identifier: impl Into<String>,
        secret: impl Into<String>,
        identifier_kind: IdentifierKind,
    ) -> Self {
        Self {
            role,
            identifier: identifier.into(),
            secret: secret.into(),
            identifier_kind,
        }
    }

    /// Returns the role this credential logs in as.
    #[must_use]
    pub const fn role(&self) -> &RoleName {
        &self.role
    }

    /// Returns the login identifier (email or username).
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns a copy of this credential with a different secret.
    #[must_use]
    pub fn with_secret(&self, secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..self.clone()
        }
    }

    /// Builds the JSON login body `{email|username, password}`.
    #[must_use]
    pub fn login_body(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            self.identifier_kind.field_name().to_string(),
            Value::String(self.identifier.clone()),
        );
        body.insert("password".to_string(), Value::String(self.secret.clone()));
        Value::Object(body)
    }
}

impl From<&RoleConfig> for Credential {
    fn from(role: &RoleConfig) -> Self {
        Self::new(
            RoleName::new(role.name.clone()),
            role.identifier.clone(),
            role.secret.clone(),
            role.identifier_kind,
        )
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("role", &self.role)
            .field("identifier", &self.identifier)
            .field("secret", &REDACTED)
            .field("identifier_kind", &self.identifier_kind)
            .finish()
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Authentication material attached to requests.
#[derive(Clone, PartialEq, Eq)]
pub enum SessionAuth {
    /// Bearer token sent in the `Authorization` header.
    Bearer(String),
    /// Cookie pairs sent in the `Cookie` header.
    Cookie(String),
}

impl SessionAuth {
    /// Returns the request header name and value for this auth material.
    #[must_use]
    pub fn header(&self) -> (&'static str, String) {
        match self {
            Self::Bearer(token) => ("authorization", format!("Bearer {token}")),
            Self::Cookie(cookie) => ("cookie", cookie.clone()),
        }
    }

    /// Returns a redacted label safe for transcripts and logs.
    #[must_use]
    pub const fn redacted(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "Bearer <redacted>",
            Self::Cookie(_) => "Cookie <redacted>",
        }
    }
}

impl fmt::Debug for SessionAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.redacted())
    }
}

/// An authenticated session obtained by logging in with a [`Credential`].
///
/// # Invariants
/// - A session is closed at most once; later close calls are no-ops.
/// - The auth material is never rendered by `Debug`.
#[derive(Debug, Clone)]
pub struct Session {
    /// Role of the owning credential.
    role: RoleName,
    /// Login identifier of the owning credential.
    identifier: String,
    /// Token or cookie attached to requests.
    auth: SessionAuth,
    /// Role claimed by the login response.
    reported_role: Option<String>,
    /// User object from the login response.
    user: Option<Value>,
    /// Login time.
    created_at: OffsetDateTime,
    /// Set once logout has been attempted.
    closed: bool,
}

impl Session {
    /// Creates an open session.
    #[must_use]
    pub fn new(credential: &Credential, auth: SessionAuth, user: Option<Value>) -> Self {
        let reported_role = user
            .as_ref()
            .and_then(|user| user.get("role"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            role: credential.role().clone(),
            identifier: credential.identifier().to_string(),
            auth,
            reported_role,
            user,
            created_at: OffsetDateTime::now_utc(),
            closed: false,
        }
    }

    /// Returns the role whose credential opened this session.
    #[must_use]
    pub const fn role(&self) -> &RoleName {
        &self.role
    }

    /// Returns the login identifier of the owning credential.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the auth material attached to requests.
    #[must_use]
    pub const fn auth(&self) -> &SessionAuth {
        &self.auth
    }

    /// Returns the role reported by the login response, when present.
    #[must_use]
    pub fn reported_role(&self) -> Option<&str> {
        self.reported_role.as_deref()
    }

    /// Returns the user object from the login response, when present.
    #[must_use]
    pub const fn user(&self) -> Option<&Value> {
        self.user.as_ref()
    }

    /// Returns the time the session was opened.
    #[must_use]
    pub const fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Returns true once the session has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Marks the session closed and reports whether it was open before.
    pub(crate) const fn mark_closed(&mut self) -> bool {
        let was_open = !self.closed;
        self.closed = true;
        was_open
    }
}
