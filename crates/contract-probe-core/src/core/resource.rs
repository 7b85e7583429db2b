// crates/contract-probe-core/src/core/resource.rs
// ============================================================================
// Module: Tracked Resources
// Description: Kinds of remote resources and their tracking records.
// Purpose: Map resource kinds to canonical collection paths for teardown.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every resource a scenario creates is recorded as a [`TrackedResource`]. The
//! record keeps the auth material of the session that created it so teardown
//! deletes with the same privileges, even when the create went through a
//! parent-scoped path such as `/api/clients/{id}/projects`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::credential::SessionAuth;
use crate::core::identifiers::ResourceId;
use crate::core::identifiers::RoleName;

// ============================================================================
// SECTION: Resource Kind
// ============================================================================

/// Kind of resource managed by the system under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Employee record.
    Employee,
    /// Client record.
    Client,
    /// Project owned by a client.
    Project,
    /// Payment recorded against a project.
    Payment,
    /// Generated report.
    Report,
    /// Notification.
    Notification,
    /// Shared workspace.
    Workspace,
}

impl ResourceKind {
    /// Returns the collection segment used in `/api/{collection}`.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Employee => "employees",
            Self::Client => "clients",
            Self::Project => "projects",
            Self::Payment => "payments",
            Self::Report => "reports",
            Self::Notification => "notifications",
            Self::Workspace => "workspaces",
        }
    }

    /// Returns the collection path `/api/{collection}`.
    #[must_use]
    pub fn collection_path(self) -> String {
        format!("/api/{}", self.collection())
    }

    /// Returns the canonical item path `/api/{collection}/{id}`.
    ///
    /// [`ResourceId`] only holds single path segments, so the id never adds
    /// segments, a query or a fragment.
    #[must_use]
    pub fn item_path(self, id: &ResourceId) -> String {
        format!("/api/{}/{id}", self.collection())
    }

    /// Returns the snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Client => "client",
            Self::Project => "project",
            Self::Payment => "payment",
            Self::Report => "report",
            Self::Notification => "notification",
            Self::Workspace => "workspace",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Tracked Resource
// ============================================================================

/// A resource created during a scenario and scheduled for deletion.
///
/// # Invariants
/// - `auth` belongs to the session that performed the create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedResource {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Identifier assigned by the system under test.
    pub id: ResourceId,
    /// Role of the owning session.
    pub owner: RoleName,
    /// Auth material of the owning session.
    pub auth: Option<SessionAuth>,
}

impl TrackedResource {
    /// Returns the canonical deletion path.
    #[must_use]
    pub fn delete_path(&self) -> String {
        self.kind.item_path(&self.id)
    }
}
