// crates/contract-probe-config/src/lib.rs
// ============================================================================
// Module: Contract Probe Config Library
// Description: Canonical config model and validation for the probe harness.
// Purpose: Single source of truth for contract-probe.toml semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `contract-probe-config` defines the configuration model for the contract
//! probe harness: the target under test, the role table with credentials, the
//! protected operation table, logging and report settings. Loading is strict
//! and fail-closed; environment overrides are applied after the file is read.
//!
//! Security posture: config inputs are untrusted and carry credentials; secrets
//! are redacted from debug output.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::EnvOverrides;
pub use env::ProbeEnv;
pub use env::read_env_strict;
