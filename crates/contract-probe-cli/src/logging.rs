// crates/contract-probe-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Global tracing subscriber setup for the contract-probe binary.
// Purpose: Route library events to stderr in pretty or JSON form.
// Dependencies: contract-probe-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! `RUST_LOG` wins over `[logging].level`. Events go to stderr so stdout
//! stays reserved for command output.

use contract_probe_config::LogFormat;
use contract_probe_config::LoggingConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Builds the event filter for a logging section.
pub(crate) fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Installs the global subscriber. Call at most once per process.
///
/// # Errors
///
/// Returns a message when a global subscriber is already installed.
pub(crate) fn init_tracing(config: &LoggingConfig) -> Result<(), String> {
    let registry = tracing_subscriber::registry().with(filter(config));
    let result = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|err| format!("failed to initialize tracing subscriber: {err}"))
}
