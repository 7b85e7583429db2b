// crates/contract-probe-config/src/config.rs
// ============================================================================
// Module: Contract Probe Configuration
// Description: Configuration loading and validation for the probe harness.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits,
//! then merged with environment overrides and validated as a whole. A missing
//! file at the default location yields the built-in defaults; a missing file at
//! an explicit location is an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::env::EnvOverrides;
use crate::env::ProbeEnv;
use crate::env::read_env_strict;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "contract-probe.toml";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default base URL of the system under test.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5173";
/// Default login path.
pub const DEFAULT_LOGIN_PATH: &str = "/api/auth/login";
/// Default logout path.
pub const DEFAULT_LOGOUT_PATH: &str = "/api/auth/logout";
/// Maximum number of declared roles.
pub const MAX_ROLES: usize = 256;
/// Maximum number of declared protected operations.
pub const MAX_OPERATIONS: usize = 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Contract probe configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeConfig {
    /// System-under-test connection settings.
    #[serde(default)]
    pub target: TargetConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Role table with per-role credentials.
    #[serde(default)]
    pub roles: Vec<RoleConfig>,
    /// Protected operation table for the role matrix.
    #[serde(default)]
    pub operations: Vec<OperationConfig>,
    /// Report output configuration.
    #[serde(default)]
    pub report: ReportConfig,
}

impl ProbeConfig {
    /// Loads configuration from disk, applies environment overrides and
    /// validates the result.
    ///
    /// Resolution order: explicit `path`, then `CONTRACT_PROBE_CONFIG`, then
    /// `contract-probe.toml` in the working directory. Only the last one may be
    /// absent, in which case built-in defaults are used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, overriding or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_overrides(path, &EnvOverrides::default())
    }

    /// Like [`ProbeConfig::load`], with command-line `flags` applied after the
    /// environment. Validation runs once, on the fully layered result, so a
    /// flag can replace an invalid file or environment value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, overriding or validation fails.
    pub fn load_with_overrides(
        path: Option<&Path>,
        flags: &EnvOverrides,
    ) -> Result<Self, ConfigError> {
        let overrides = EnvOverrides::load()?;
        let mut config = match resolve_path(path)? {
            ResolvedPath::Explicit(resolved) => Self::read_file(&resolved)?,
            ResolvedPath::Default(resolved) => {
                if resolved.exists() {
                    Self::read_file(&resolved)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(&overrides);
        config.apply_overrides(flags);
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file without applying overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path, size, encoding or TOML is invalid.
    pub fn read_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses a config document from TOML text without validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the TOML is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides on top of file values.
    pub fn apply_overrides(&mut self, overrides: &EnvOverrides) {
        if let Some(base_url) = &overrides.base_url {
            self.target.base_url.clone_from(base_url);
        }
        if let Some(auth_base_url) = &overrides.auth_base_url {
            self.target.auth_base_url = Some(auth_base_url.clone());
        }
        if let Some(timeout) = overrides.timeout {
            self.target.timeout_secs = timeout.as_secs();
        }
        if let Some(report_dir) = &overrides.report_dir {
            self.report.output_dir = Some(report_dir.clone());
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target.validate()?;
        self.logging.validate()?;
        if self.roles.len() > MAX_ROLES {
            return Err(ConfigError::Invalid("too many roles".to_string()));
        }
        if self.operations.len() > MAX_OPERATIONS {
            return Err(ConfigError::Invalid("too many operations".to_string()));
        }
        let mut role_names = BTreeSet::new();
        for role in &self.roles {
            role.validate()?;
            if !role_names.insert(role.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate role: {}", role.name)));
            }
        }
        let mut operation_names = BTreeSet::new();
        for operation in &self.operations {
            operation.validate(&role_names)?;
            if !operation_names.insert(operation.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate operation: {}",
                    operation.name
                )));
            }
        }
        if let Some(default_role) = &self.target.default_role
            && !role_names.contains(default_role.as_str())
        {
            return Err(ConfigError::Invalid(format!(
                "target.default_role references undeclared role: {default_role}"
            )));
        }
        Ok(())
    }

    /// Returns the role with the given name.
    #[must_use]
    pub fn role(&self, name: &str) -> Option<&RoleConfig> {
        self.roles.iter().find(|role| role.name == name)
    }

    /// Returns the role used by single-session scenarios.
    ///
    /// This is `target.default_role` when set, otherwise the first declared role.
    #[must_use]
    pub fn default_role(&self) -> Option<&RoleConfig> {
        self.target.default_role.as_deref().map_or_else(|| self.roles.first(), |name| self.role(name))
    }
}

/// System-under-test connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Base URL for resource API calls.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Optional base URL for login/logout when auth is served separately.
    #[serde(default)]
    pub auth_base_url: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Login path relative to the auth base URL.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Logout path relative to the auth base URL.
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    /// Role used by single-session scenarios.
    #[serde(default)]
    pub default_role: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            login_path: default_login_path(),
            logout_path: default_logout_path(),
            default_role: None,
        }
    }
}

impl TargetConfig {
    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the base URL used for login/logout calls.
    #[must_use]
    pub fn auth_base_url(&self) -> &str {
        self.auth_base_url.as_deref().unwrap_or(&self.base_url)
    }

    /// Validates target settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url("target.base_url", &self.base_url)?;
        if let Some(auth_base_url) = &self.auth_base_url {
            validate_base_url("target.auth_base_url", auth_base_url)?;
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "target.timeout_secs must be greater than zero".to_string(),
            ));
        }
        validate_api_path("target.login_path", &self.login_path)?;
        validate_api_path("target.logout_path", &self.logout_path)?;
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// JSON lines.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig {
    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.level must not be empty".to_string()));
        }
        Ok(())
    }
}

/// How a credential identifier is presented to the login endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    /// Sent as the `email` field.
    #[default]
    Email,
    /// Sent as the `username` field.
    Username,
}

impl IdentifierKind {
    /// Returns the login body field name.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Username => "username",
        }
    }
}

/// A declared role and the credential that yields a session scoped to it.
#[derive(Clone, Deserialize)]
pub struct RoleConfig {
    /// Role name as used by the access matrix.
    pub name: String,
    /// Login identifier (email or username).
    pub identifier: String,
    /// Login secret.
    pub secret: String,
    /// Login field for the identifier.
    #[serde(default)]
    pub identifier_kind: IdentifierKind,
}

impl fmt::Debug for RoleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleConfig")
            .field("name", &self.name)
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .field("identifier_kind", &self.identifier_kind)
            .finish()
    }
}

impl RoleConfig {
    /// Validates a role entry.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("roles.name must not be empty".to_string()));
        }
        if self.identifier.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "roles.identifier must not be empty for role {}",
                self.name
            )));
        }
        if self.identifier_kind == IdentifierKind::Email && !self.identifier.contains('@') {
            return Err(ConfigError::Invalid(format!(
                "roles.identifier must be an email address for role {}",
                self.name
            )));
        }
        Ok(())
    }
}

/// HTTP method for a protected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Returns the canonical method label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protected operation and the roles explicitly allowed to invoke it.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationConfig {
    /// Stable operation label.
    pub name: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path relative to the base URL, including any query string.
    pub path: String,
    /// Roles allowed to invoke the operation; every other role is denied.
    #[serde(default)]
    pub allow: Vec<String>,
    /// Marks endpoints whose existence is unconfirmed.
    #[serde(default)]
    pub speculative: bool,
    /// Optional JSON body sent with POST/PUT probes. Only plain values are
    /// accepted; TOML datetimes have no JSON form and are rejected.
    #[serde(default)]
    pub body: Option<toml::Value>,
}

impl OperationConfig {
    /// Validates an operation entry against the declared role names.
    fn validate(&self, roles: &BTreeSet<&str>) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("operations.name must not be empty".to_string()));
        }
        validate_api_path("operations.path", &self.path)?;
        for role in &self.allow {
            if !roles.contains(role.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "operation {} allows undeclared role: {role}",
                    self.name
                )));
            }
        }
        if self.body.as_ref().is_some_and(contains_datetime) {
            return Err(ConfigError::Invalid(format!(
                "operation {} body must not contain TOML datetimes; quote them as strings",
                self.name
            )));
        }
        Ok(())
    }
}

/// Returns whether a TOML value holds a datetime at any depth.
fn contains_datetime(value: &toml::Value) -> bool {
    match value {
        toml::Value::Datetime(_) => true,
        toml::Value::Array(items) => items.iter().any(contains_datetime),
        toml::Value::Table(table) => table.values().any(contains_datetime),
        toml::Value::String(_)
        | toml::Value::Integer(_)
        | toml::Value::Float(_)
        | toml::Value::Boolean(_) => false,
    }
}

/// Report output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportConfig {
    /// Directory receiving `summary.json` and `summary.md`.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Invalid environment override.
    #[error("invalid environment: {0}")]
    Env(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Config path plus whether the caller chose it.
enum ResolvedPath {
    /// Path came from the caller or the environment; it must exist.
    Explicit(PathBuf),
    /// Fallback path in the working directory; it may be absent.
    Default(PathBuf),
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<ResolvedPath, ConfigError> {
    if let Some(path) = path {
        return Ok(ResolvedPath::Explicit(path.to_path_buf()));
    }
    let env_path = read_env_strict(ProbeEnv::ConfigPath.as_str()).map_err(ConfigError::Env)?;
    if let Some(env_path) = env_path {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(ResolvedPath::Explicit(PathBuf::from(env_path)));
    }
    Ok(ResolvedPath::Default(PathBuf::from(DEFAULT_CONFIG_NAME)))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates that a base URL parses and uses http or https.
fn validate_base_url(field: &str, raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|err| ConfigError::Invalid(format!("{field}: {err}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::Invalid(format!("{field} has unsupported scheme: {other}")));
        }
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ConfigError::Invalid(format!("{field} must not embed credentials")));
    }
    Ok(())
}

/// Validates that an API path is absolute.
fn validate_api_path(field: &str, path: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') {
        return Err(ConfigError::Invalid(format!("{field} must start with '/': {path}")));
    }
    Ok(())
}

/// Default base URL.
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Default request timeout in seconds.
const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Default login path.
fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

/// Default logout path.
fn default_logout_path() -> String {
    DEFAULT_LOGOUT_PATH.to_string()
}

/// Default log filter.
fn default_log_level() -> String {
    "info".to_string()
}
