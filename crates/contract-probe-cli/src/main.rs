// crates/contract-probe-cli/src/main.rs
// ============================================================================
// Module: Contract Probe CLI Entry Point
// Description: Command dispatcher for listing, running and validating probes.
// Purpose: Run contract scenarios against a live API and report the outcome.
// Dependencies: clap, contract-probe-config, contract-probe-core, thiserror, tokio
// ============================================================================

//! ## Overview
//! `contract-probe list` prints the built-in catalog, `contract-probe run`
//! executes scenarios as one suite, and `contract-probe config validate`
//! checks a config file. Exit status is zero only when every selected
//! scenario passed. Target knobs resolve as flag, then environment, then
//! config file.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod logging;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use contract_probe_config::EnvOverrides;
use contract_probe_config::ProbeConfig;
use contract_probe_core::SuiteReport;
use contract_probe_core::artifacts::ReportWriter;
use contract_probe_core::catalog;
use contract_probe_core::runtime::HttpTransport;
use contract_probe_core::runtime::Scenario;
use contract_probe_core::runtime::ScenarioExecutor;
use contract_probe_core::runtime::SuiteRunner;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level command line.
#[derive(Parser, Debug)]
#[command(
    name = "contract-probe",
    version,
    about = "Contract tests for role-based REST APIs",
    disable_help_subcommand = true
)]
struct Cli {
    /// Selected command.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List built-in scenarios.
    List,
    /// Run scenarios against the configured target.
    Run(RunCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a config file, including environment overrides.
    Validate(TargetArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Scenario names; all built-in scenarios when omitted.
    #[arg(value_name = "SCENARIO")]
    scenarios: Vec<String>,
    /// Target selection.
    #[command(flatten)]
    target: TargetArgs,
    /// Directory receiving summary.json and summary.md.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Create one client up front and share it with every scenario.
    #[arg(long)]
    shared_client: bool,
}

/// Config path and target overrides.
#[derive(Args, Debug, Default)]
struct TargetArgs {
    /// Config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Resource API base URL.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
    /// Auth endpoint base URL, when it differs from the API.
    #[arg(long, value_name = "URL")]
    auth_base_url: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
}

impl TargetArgs {
    /// Converts flags into the override shape shared with the environment.
    fn overrides(&self) -> EnvOverrides {
        EnvOverrides {
            base_url: self.base_url.clone(),
            auth_base_url: self.auth_base_url.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
            report_dir: None,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// User-facing CLI failure.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Message printed to stderr.
    message: String,
}

impl CliError {
    /// Wraps a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments and dispatches the selected command.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::List => command_list(),
        Commands::Run(command) => command_run(command).await,
        Commands::Config {
            command: ConfigCommand::Validate(target),
        } => command_config_validate(&target),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Prints every built-in scenario with its description.
fn command_list() -> CliResult<ExitCode> {
    for scenario in catalog::builtin() {
        write_stdout_line(&format!("{:<20} {}", scenario.name(), scenario.description()))
            .map_err(output_error)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Validates configuration and prints a one-line digest.
fn command_config_validate(target: &TargetArgs) -> CliResult<ExitCode> {
    let config = load_config(target)?;
    write_stdout_line(&format!(
        "config ok: target {}, {} roles, {} operations",
        config.target.base_url,
        config.roles.len(),
        config.operations.len()
    ))
    .map_err(output_error)?;
    Ok(ExitCode::SUCCESS)
}

/// Runs the selected scenarios as one suite.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.target)?;
    logging::init_tracing(&config.logging).map_err(CliError::new)?;
    let scenarios = select_scenarios(&command.scenarios)?;
    let transport = HttpTransport::new(&config.target)
        .map_err(|err| CliError::new(format!("transport setup failed: {err}")))?;
    let output_dir = command.output_dir.or_else(|| config.report.output_dir.clone());

    let executor = ScenarioExecutor::new(Arc::new(config), Arc::new(transport));
    let mut runner = SuiteRunner::new(executor);
    if command.shared_client {
        runner = runner.with_fixtures(vec![catalog::shared_client_fixture()]);
    }
    let report = runner.run(&scenarios).await;

    for line in summary_lines(&report) {
        write_stdout_line(&line).map_err(output_error)?;
    }
    if let Some(dir) = output_dir {
        let paths = ReportWriter::new(dir)
            .write(&report)
            .map_err(|err| CliError::new(format!("failed to write report: {err}")))?;
        write_stdout_line(&format!(
            "report: {} {}",
            paths.json.display(),
            paths.markdown.display()
        ))
        .map_err(output_error)?;
    }
    Ok(if report.passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads config with flag overrides layered on top of environment ones.
fn load_config(target: &TargetArgs) -> CliResult<ProbeConfig> {
    ProbeConfig::load_with_overrides(target.config.as_deref(), &target.overrides())
        .map_err(|err| CliError::new(err.to_string()))
}

/// Resolves scenario names against the catalog, keeping request order.
fn select_scenarios(names: &[String]) -> CliResult<Vec<Arc<dyn Scenario>>> {
    if names.is_empty() {
        return Ok(catalog::builtin());
    }
    let mut selected: Vec<Arc<dyn Scenario>> = Vec::with_capacity(names.len());
    for name in names {
        if selected.iter().any(|scenario| scenario.name() == name) {
            continue;
        }
        let scenario = catalog::find(name).ok_or_else(|| {
            CliError::new(format!("unknown scenario: {name} (see `contract-probe list`)"))
        })?;
        selected.push(scenario);
    }
    Ok(selected)
}

/// Renders the stdout summary for a suite report.
fn summary_lines(report: &SuiteReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .scenarios
        .iter()
        .map(|scenario| {
            let failed = scenario.steps.iter().filter(|step| step.status.is_failure()).count();
            format!(
                "{:<5} {} ({} steps, {} failed, {} cleanup failures, {} ms)",
                scenario.outcome.as_str(),
                scenario.scenario,
                scenario.steps.len(),
                failed,
                scenario.cleanup_failures(),
                scenario.duration_ms
            )
        })
        .collect();
    if let Some(fixtures) = &report.fixtures {
        if let Some(error) = &fixtures.setup_error {
            lines.push(format!("fixture setup failed: {error}"));
        }
        let failed = fixtures.releases.iter().filter(|release| release.error.is_some()).count();
        if failed > 0 {
            lines.push(format!("fixture cleanup failures: {failed}"));
        }
    }
    lines.push(format!(
        "{} of {} scenarios passed against {}",
        report.scenarios.len().saturating_sub(report.failed_count()),
        report.scenarios.len(),
        report.base_url
    ));
    lines
}

/// Maps stdout write failures.
fn output_error(err: std::io::Error) -> CliError {
    CliError::new(format!("failed to write output: {err}"))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Prints an error and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
