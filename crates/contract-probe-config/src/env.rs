// crates/contract-probe-config/src/env.rs
// ============================================================================
// Module: Probe Environment Overrides
// Description: Environment-backed overrides for probe configuration.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8, empty values and non-positive timeouts fail
//! closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigError;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys recognized by the probe harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEnv {
    /// Config file path override.
    ConfigPath,
    /// Base URL override for the system under test.
    BaseUrl,
    /// Base URL override for login/logout.
    AuthBaseUrl,
    /// Timeout override in seconds (positive integer).
    TimeoutSeconds,
    /// Report output directory override.
    ReportDir,
}

impl ProbeEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigPath => "CONTRACT_PROBE_CONFIG",
            Self::BaseUrl => "CONTRACT_PROBE_BASE_URL",
            Self::AuthBaseUrl => "CONTRACT_PROBE_AUTH_BASE_URL",
            Self::TimeoutSeconds => "CONTRACT_PROBE_TIMEOUT_SEC",
            Self::ReportDir => "CONTRACT_PROBE_REPORT_DIR",
        }
    }
}

// ============================================================================
// SECTION: Override Types
// ============================================================================

/// Typed overrides derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvOverrides {
    /// Optional base URL override.
    pub base_url: Option<String>,
    /// Optional auth base URL override.
    pub auth_base_url: Option<String>,
    /// Optional timeout override.
    pub timeout: Option<Duration>,
    /// Optional report directory override.
    pub report_dir: Option<PathBuf>,
}

impl EnvOverrides {
    /// Loads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] when a value is not valid UTF-8, is empty,
    /// or fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Loads overrides through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] when a value is not valid UTF-8, is empty,
    /// or fails validation.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let read = |key: ProbeEnv| read_nonempty(key.as_str(), lookup(key.as_str()));
        let base_url = read(ProbeEnv::BaseUrl)?;
        let auth_base_url = read(ProbeEnv::AuthBaseUrl)?;
        let timeout = read(ProbeEnv::TimeoutSeconds)?
            .map(|value| parse_timeout_seconds(ProbeEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let report_dir = read(ProbeEnv::ReportDir)?.map(PathBuf::from);
        Ok(Self {
            base_url,
            auth_base_url,
            timeout,
            report_dir,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    decode_strict(name, std::env::var_os(name))
}

/// Decodes a raw value as UTF-8.
fn decode_strict(name: &str, raw: Option<OsString>) -> Result<Option<String>, String> {
    raw.map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Decodes a raw value and rejects empty values.
fn read_nonempty(name: &str, raw: Option<OsString>) -> Result<Option<String>, ConfigError> {
    match decode_strict(name, raw).map_err(ConfigError::Env)? {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::Env(format!("{name} must not be empty")))
        }
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}

/// Parses a positive timeout value from an environment variable string.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|_| {
        ConfigError::Env(format!("{name} must be a positive integer number of seconds"))
    })?;
    if secs == 0 {
        return Err(ConfigError::Env(format!("{name} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}
