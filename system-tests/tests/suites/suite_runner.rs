// system-tests/tests/suites/suite_runner.rs
// ============================================================================
// Module: Suite Runner Tests
// Description: Concurrent scenarios, shared fixtures and written reports.
// Purpose: Ensure suites isolate scenarios and persist readable artifacts.
// Dependencies: system-tests helpers, contract-probe-core, tempfile
// ============================================================================

//! Suite coverage: fixture scope over HTTP and report artifacts.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use contract_probe_core::ReleaseOutcome;
use contract_probe_core::ResourceKind;
use contract_probe_core::SuiteReport;
use contract_probe_core::artifacts::ReportWriter;
use contract_probe_core::artifacts::SUMMARY_JSON;
use contract_probe_core::catalog;
use contract_probe_core::runtime::Scenario;
use contract_probe_core::runtime::SuiteRunner;
use helpers::agency_stub::StubBehavior;
use helpers::agency_stub::spawn_agency_stub;
use helpers::agency_stub::spawn_agency_stub_with;
use helpers::artifacts::TestReporter;
use helpers::harness::Target;
use helpers::harness::executor;
use helpers::harness::probe_config;
use helpers::timeouts::within;

use crate::helpers;

fn scenarios(names: &[&str]) -> Vec<Arc<dyn Scenario>> {
    names.iter().map(|name| catalog::find(name).unwrap()).collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn shared_fixture_outlives_every_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("shared_fixture_outlives_every_scenario")?;
    let stub = spawn_agency_stub().await?;
    let runner = SuiteRunner::new(executor(probe_config(&Target::new(stub.base_url()))?)?)
        .with_fixtures(vec![catalog::shared_client_fixture()]);
    let selected = scenarios(&["payment-proof", "project-cascade", "login-logout"]);
    let report = within(Duration::from_secs(90), runner.run(&selected)).await?;
    let paths = reporter.artifacts().write_suite(&report)?;

    assert!(report.passed(), "{:?}", report.scenarios);
    for scenario in &report.scenarios {
        assert!(scenario.releases.iter().all(|release| release.kind != ResourceKind::Client));
    }
    let fixtures = report.fixtures.as_ref().unwrap();
    assert_eq!(fixtures.setup_error, None);
    assert_eq!(fixtures.releases.len(), 1);
    assert_eq!(fixtures.releases[0].outcome, ReleaseOutcome::Deleted);
    assert!(stub.is_clean());
    assert_eq!(stub.live_sessions(), 0);

    let parsed: SuiteReport = serde_json::from_slice(&fs::read(&paths.json)?)?;
    assert_eq!(parsed, report);
    reporter.finish("pass")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn one_failing_scenario_does_not_sink_the_others() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("one_failing_scenario_does_not_sink_the_others")?;
    let stub = spawn_agency_stub_with(StubBehavior {
        require_proof: false,
        ..StubBehavior::default()
    })
    .await?;
    let runner = SuiteRunner::new(executor(probe_config(&Target::new(stub.base_url()))?)?);
    let selected = scenarios(&["payment-proof", "client-roundtrip", "invalid-login"]);
    let report = within(Duration::from_secs(90), runner.run(&selected)).await?;
    reporter.artifacts().write_suite(&report)?;

    assert!(!report.passed());
    assert_eq!(report.failed_count(), 1);
    let names: Vec<&str> = report.scenarios.iter().map(|s| s.scenario.as_str()).collect();
    assert_eq!(names, ["payment-proof", "client-roundtrip", "invalid-login"]);
    assert!(!report.scenarios[0].passed());
    assert!(report.scenarios[1].passed());
    assert!(report.scenarios[2].passed());
    assert!(report.fixtures.is_none());
    assert!(stub.is_clean());
    reporter.finish("pass")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn report_writer_produces_json_and_markdown() -> Result<(), Box<dyn std::error::Error>> {
    let stub = spawn_agency_stub().await?;
    let runner = SuiteRunner::new(executor(probe_config(&Target::new(stub.base_url()))?)?);
    let report = within(Duration::from_secs(60), runner.run(&scenarios(&["access-matrix"]))).await?;

    let dir = tempfile::tempdir()?;
    let paths = ReportWriter::new(dir.path().join("nested")).write(&report)?;
    assert_eq!(paths.json, dir.path().join("nested").join(SUMMARY_JSON));
    let markdown = fs::read_to_string(&paths.markdown)?;
    assert!(markdown.starts_with("# Contract Probe Summary"));
    assert!(markdown.contains("## access-matrix (pass)"), "{markdown}");
    let json = fs::read_to_string(&paths.json)?;
    assert!(json.contains("\"verdict\":\"not_implemented\""), "{json}");
    Ok(())
}
