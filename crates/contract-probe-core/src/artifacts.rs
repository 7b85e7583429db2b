// crates/contract-probe-core/src/artifacts.rs
// ============================================================================
// Module: Report Artifacts
// Description: Writes suite reports as canonical JSON and Markdown.
// Purpose: Leave a deterministic, reviewable record of every probe run.
// Dependencies: serde_jcs, thiserror
// ============================================================================

//! ## Overview
//! [`ReportWriter`] writes two files into its output directory:
//! - `summary.json`: the full [`SuiteReport`] in RFC 8785 canonical JSON;
//! - `summary.md`: a human-readable digest with per-scenario steps, matrix
//!   failures and teardown problems.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::access::CellVerdict;
use crate::core::access::Observed;
use crate::core::report::CloseOutcome;
use crate::core::report::ReleaseOutcome;
use crate::core::report::ReleaseRecord;
use crate::core::report::ScenarioReport;
use crate::core::report::SessionCleanup;
use crate::core::report::SuiteReport;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the canonical JSON report.
pub const SUMMARY_JSON: &str = "summary.json";
/// File name of the Markdown digest.
pub const SUMMARY_MARKDOWN: &str = "summary.md";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Report writing errors.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Filesystem error.
    #[error("artifact io error at {path}: {source}")]
    Io {
        /// Path being written.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Canonical JSON serialization failed.
    #[error("artifact serialization error: {0}")]
    Serialize(String),
    /// Markdown rendering failed.
    #[error("artifact render error")]
    Render(#[from] fmt::Error),
}

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Paths of the written artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// Canonical JSON report.
    pub json: PathBuf,
    /// Markdown digest.
    pub markdown: PathBuf,
}

/// Writes suite reports into one output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    /// Output directory.
    root: PathBuf,
}

impl ReportWriter {
    /// Creates a writer for the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the output directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `summary.json` and `summary.md`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when serialization or a write fails.
    pub fn write(&self, report: &SuiteReport) -> Result<ReportPaths, ArtifactError> {
        fs::create_dir_all(&self.root).map_err(|source| io_error(&self.root, source))?;
        let json = self.root.join(SUMMARY_JSON);
        let bytes =
            serde_jcs::to_vec(report).map_err(|err| ArtifactError::Serialize(err.to_string()))?;
        fs::write(&json, bytes).map_err(|source| io_error(&json, source))?;
        let markdown = self.root.join(SUMMARY_MARKDOWN);
        let text = summary_markdown(report)?;
        fs::write(&markdown, text.as_bytes()).map_err(|source| io_error(&markdown, source))?;
        tracing::info!(
            json = %json.display(),
            markdown = %markdown.display(),
            "report written"
        );
        Ok(ReportPaths {
            json,
            markdown,
        })
    }
}

/// Wraps an IO error with its path.
fn io_error(path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.display().to_string(),
        source,
    }
}

// ============================================================================
// SECTION: Markdown
// ============================================================================

/// Renders the Markdown digest of a suite report.
///
/// # Errors
///
/// Returns [`ArtifactError::Render`] when formatting fails.
pub fn summary_markdown(report: &SuiteReport) -> Result<String, ArtifactError> {
    let mut out = String::new();
    writeln!(out, "# Contract Probe Summary\n")?;
    writeln!(out, "## Status\n")?;
    writeln!(out, "- Target: {}", report.base_url)?;
    writeln!(out, "- Scenarios: {}", report.scenarios.len())?;
    writeln!(out, "- Failed: {}", report.failed_count())?;
    writeln!(out, "- Result: {}", if report.passed() { "pass" } else { "fail" })?;

    for scenario in &report.scenarios {
        scenario_markdown(&mut out, scenario)?;
    }

    if let Some(fixtures) = &report.fixtures {
        writeln!(out, "\n## Fixtures\n")?;
        if let Some(error) = &fixtures.setup_error {
            writeln!(out, "- Setup error: {error}")?;
        }
        teardown_markdown(&mut out, &fixtures.releases, &fixtures.sessions)?;
    }
    Ok(out)
}

/// Renders one scenario section.
fn scenario_markdown(out: &mut String, scenario: &ScenarioReport) -> fmt::Result {
    writeln!(out, "\n## {} ({})\n", scenario.scenario, scenario.outcome.as_str())?;
    writeln!(out, "{}\n", scenario.description)?;
    if let Some(role) = &scenario.role {
        writeln!(out, "- Role: {role}")?;
    }
    writeln!(out, "- Duration (ms): {}", scenario.duration_ms)?;
    writeln!(out, "- Requests: {}", scenario.transcript.len())?;

    writeln!(out, "\n### Steps\n")?;
    if scenario.steps.is_empty() {
        writeln!(out, "- None")?;
    }
    for step in &scenario.steps {
        match &step.detail {
            Some(detail) => writeln!(out, "- [{}] {}: {detail}", step.status.as_str(), step.name)?,
            None => writeln!(out, "- [{}] {}", step.status.as_str(), step.name)?,
        }
    }

    if !scenario.matrix.is_empty() {
        let mismatches: Vec<_> = scenario
            .matrix
            .iter()
            .filter(|cell| matches!(cell.verdict, CellVerdict::Fail | CellVerdict::Error))
            .collect();
        writeln!(out, "\n### Access Matrix\n")?;
        writeln!(out, "- Cells: {}", scenario.matrix.len())?;
        writeln!(out, "- Mismatches: {}", mismatches.len())?;
        if !mismatches.is_empty() {
            writeln!(out, "\n| Role | Operation | Expected | Observed | Status | Verdict |")?;
            writeln!(out, "| --- | --- | --- | --- | --- | --- |")?;
            for cell in mismatches {
                writeln!(
                    out,
                    "| {} | {} {} | {} | {} | {} | {} |",
                    cell.role,
                    cell.method,
                    cell.path,
                    cell.expected.as_str(),
                    cell.observed.map_or("-", Observed::as_str),
                    cell.status.map_or_else(|| "-".to_string(), |status| status.to_string()),
                    cell.verdict.as_str(),
                )?;
            }
        }
    }

    writeln!(out, "\n### Cleanup\n")?;
    teardown_markdown(out, &scenario.releases, &scenario.sessions)
}

/// Renders teardown records.
fn teardown_markdown(
    out: &mut String,
    releases: &[ReleaseRecord],
    sessions: &[SessionCleanup],
) -> fmt::Result {
    if releases.is_empty() && sessions.is_empty() {
        return writeln!(out, "- None");
    }
    for record in releases {
        match (&record.error, record.outcome) {
            (Some(error), ReleaseOutcome::Failed) => writeln!(
                out,
                "- delete {} {}: failed: {error}",
                record.kind, record.id
            )?,
            _ => writeln!(out, "- delete {} {}: {}", record.kind, record.id, record.outcome.as_str())?,
        }
    }
    for session in sessions {
        match &session.outcome {
            CloseOutcome::Failed(detail) => {
                writeln!(out, "- logout {}: failed: {detail}", session.role)?;
            }
            outcome => writeln!(out, "- logout {}: {}", session.role, outcome.as_str())?,
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
