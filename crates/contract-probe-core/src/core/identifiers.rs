// crates/contract-probe-core/src/core/identifiers.rs
// ============================================================================
// Module: Contract Probe Identifiers
// Description: Opaque identifiers for roles and remote resources.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Identifiers are opaque strings. Resource identifiers returned by the system
//! under test may arrive as JSON numbers or strings; both normalize to the same
//! textual form so they can be interpolated into request paths.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Role name as declared in the role table.
///
/// # Invariants
/// - Opaque UTF-8 string; comparison is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(String);

impl RoleName {
    /// Label used for the unauthenticated matrix row.
    pub const ANONYMOUS: &'static str = "anonymous";

    /// Creates a new role name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the role name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Longest accepted resource identifier.
pub const MAX_RESOURCE_ID_LEN: usize = 256;

/// Identifier assigned to a created resource by the system under test.
///
/// # Invariants
/// - Non-empty, at most [`MAX_RESOURCE_ID_LEN`] bytes.
/// - Only ASCII alphanumerics and `- _ . ~ : @`, and never `.` or `..`, so
///   the identifier is always exactly one path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Creates a resource identifier, rejecting anything that is not a
    /// single plain path segment.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        is_path_segment(&id).then_some(Self(id))
    }

    /// Extracts an identifier from a JSON value (string or integer).
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Self::new(text.clone()),
            Value::Number(number) if number.is_i64() || number.is_u64() => {
                Self::new(number.to_string())
            }
            _ => None,
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = String;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id.clone()).ok_or_else(|| format!("invalid resource id: {id:?}"))
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

/// Returns whether `id` can be interpolated as one path segment unescaped.
fn is_path_segment(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_RESOURCE_ID_LEN
        && id != "."
        && id != ".."
        && id.bytes().all(|byte| {
            byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~' | b':' | b'@')
        })
}
