// system-tests/src/lib.rs
// ============================================================================
// Module: Contract Probe System Tests Library
// Description: Shared configuration for end-to-end contract-probe tests.
// Purpose: Give every system-test binary the same environment handling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Hosts configuration shared by the binaries in `system-tests/tests`. Those
//! binaries drive the real HTTP transport against an in-process stub of the
//! agency API.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
