// system-tests/src/config/mod.rs
// ============================================================================
// Module: System Test Configuration
// Description: Environment-backed settings for contract-probe system tests.
// Purpose: Provide typed access to run roots, live targets and timeouts.
// Dependencies: std
// ============================================================================

//! ## Overview
//! System-test configuration is read from environment variables and mapped into
//! a small typed structure for reuse across test helpers.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::SystemTestConfig;
pub use env::SystemTestEnv;
pub use env::read_env_strict;
