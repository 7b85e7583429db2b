// crates/contract-probe-core/src/lib.rs
// ============================================================================
// Module: Contract Probe Core
// Description: Contract-testing harness for role-based REST APIs.
// Purpose: Drive authenticate, act, verify and cleanup scenarios across roles.
// Dependencies: contract-probe-config, reqwest, tokio, tracing
// ============================================================================

//! ## Overview
//! `contract-probe-core` drives a role-based REST API through end-to-end
//! scenarios. Each scenario owns its session and its resource tracker, so
//! scenarios run in parallel without sharing mutable state.
//!
//! Layout:
//! - [`core`]: data model (credentials, sessions, resources, access
//!   expectations, reports) and the error taxonomy.
//! - [`interfaces`]: the transport seam between the harness and HTTP.
//! - [`runtime`]: session manager, resource tracker, role matrix runner,
//!   scenario executor and suite runner.
//! - [`catalog`]: built-in scenarios for the reference agency application.
//! - [`artifacts`]: `summary.json` and `summary.md` report writer.

pub mod artifacts;
pub mod catalog;
pub mod core;
pub mod interfaces;
pub mod runtime;

pub use crate::core::*;
pub use crate::interfaces::ApiRequest;
pub use crate::interfaces::ApiResponse;
pub use crate::interfaces::ApiTransport;
pub use crate::interfaces::Origin;
pub use crate::interfaces::TransportError;
