// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for contract-probe system-tests.
// Purpose: Provide the agency stub, probe harness and artifact utilities.
// Dependencies: system-tests, contract-probe-core, axum
// ============================================================================

//! ## Overview
//! Shared helpers for contract-probe system-tests. Every suite drives the
//! real HTTP transport against an in-process agency stub on loopback.

#![allow(
    dead_code,
    clippy::missing_docs_in_private_items,
    reason = "Shared helpers are reused across multiple test suites."
)]

pub mod agency_stub;
