// crates/contract-probe-core/src/runtime/tracker.rs
// ============================================================================
// Module: Resource Lifecycle Tracker
// Description: Records created resources and deletes them at teardown.
// Purpose: Guarantee a deletion attempt for every resource a scenario created.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! A tracker is owned by one scenario (or one fixture scope). Resources are
//! released in reverse creation order so children go before their parents.
//!
//! # Invariants
//! - [`ResourceTracker::release_all`] returns exactly one record per
//!   [`ResourceTracker::track`] call made since the previous release.
//! - Release never fails; a failed deletion is recorded and the next one is
//!   still attempted.
//! - 404 on deletion counts as success.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::error::CleanupError;
use crate::core::report::ReleaseOutcome;
use crate::core::report::ReleaseRecord;
use crate::core::resource::TrackedResource;
use crate::interfaces::ApiRequest;
use crate::interfaces::ApiTransport;

// ============================================================================
// SECTION: Tracker
// ============================================================================

/// Tracks created resources for best-effort teardown.
pub struct ResourceTracker {
    /// Transport used for deletions.
    transport: Arc<dyn ApiTransport>,
    /// Tracked resources in creation order.
    entries: Vec<TrackedResource>,
}

impl ResourceTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport,
            entries: Vec::new(),
        }
    }

    /// Registers a created resource.
    pub fn track(&mut self, resource: TrackedResource) {
        tracing::debug!(kind = %resource.kind, id = %resource.id, "resource tracked");
        self.entries.push(resource);
    }

    /// Returns tracked resources in creation order.
    #[must_use]
    pub fn tracked(&self) -> &[TrackedResource] {
        &self.entries
    }

    /// Returns the number of resources awaiting release.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing awaits release.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deletes every tracked resource in reverse creation order.
    pub async fn release_all(&mut self) -> Vec<ReleaseRecord> {
        let mut records = Vec::with_capacity(self.entries.len());
        while let Some(resource) = self.entries.pop() {
            records.push(self.release(resource).await);
        }
        records
    }

    /// Deletes one resource and classifies the result.
    async fn release(&self, resource: TrackedResource) -> ReleaseRecord {
        let request = ApiRequest::delete(resource.delete_path()).with_auth(resource.auth.clone());
        let (outcome, error) = match self.transport.send(&request).await {
            Ok(response) => match response.status {
                200 | 202 | 204 => (ReleaseOutcome::Deleted, None),
                404 => (ReleaseOutcome::AlreadyGone, None),
                status => (
                    ReleaseOutcome::Failed,
                    Some(CleanupError::DeleteRejected {
                        kind: resource.kind,
                        id: resource.id.clone(),
                        status,
                    }),
                ),
            },
            Err(source) => (
                ReleaseOutcome::Failed,
                Some(CleanupError::DeleteTransport {
                    kind: resource.kind,
                    id: resource.id.clone(),
                    source,
                }),
            ),
        };
        match &error {
            Some(error) => tracing::warn!(error = %error, "resource cleanup failed"),
            None => tracing::debug!(
                kind = %resource.kind,
                id = %resource.id,
                already_gone = outcome == ReleaseOutcome::AlreadyGone,
                "resource released"
            ),
        }
        ReleaseRecord {
            kind: resource.kind,
            id: resource.id,
            owner: resource.owner,
            outcome,
            error: error.map(|error| error.to_string()),
        }
    }
}
