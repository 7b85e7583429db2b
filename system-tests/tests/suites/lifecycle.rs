// system-tests/tests/suites/lifecycle.rs
// ============================================================================
// Module: Resource Lifecycle Tests
// Description: CRUD roundtrips, payment proof and cascade rules over HTTP.
// Purpose: Ensure created resources are always released against a real server.
// Dependencies: system-tests helpers, contract-probe-core
// ============================================================================

//! Lifecycle coverage: what a scenario creates, teardown deletes.

use contract_probe_core::ReleaseOutcome;
use contract_probe_core::ResourceKind;
use contract_probe_core::ScenarioReport;
use contract_probe_core::StepStatus;
use helpers::agency_stub::StubBehavior;
use helpers::agency_stub::spawn_agency_stub;
use helpers::agency_stub::spawn_agency_stub_with;
use helpers::artifacts::TestReporter;
use helpers::harness::Target;
use helpers::harness::failures;
use helpers::harness::run_builtin;

use crate::helpers;

fn status_of(report: &ScenarioReport, step: &str) -> StepStatus {
    report
        .steps
        .iter()
        .find(|candidate| candidate.name == step)
        .map(|candidate| candidate.status)
        .unwrap_or_else(|| panic!("step {step} missing"))
}

#[tokio::test(flavor = "multi_thread")]
async fn roundtrips_release_what_they_create() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("roundtrips_release_what_they_create")?;
    let stub = spawn_agency_stub().await?;
    for (name, kind) in
        [("employee-roundtrip", ResourceKind::Employee), ("client-roundtrip", ResourceKind::Client)]
    {
        let report = run_builtin(name, &Target::new(stub.base_url())).await?;
        reporter.record_scenario(&report)?;
        assert!(report.passed(), "{name}: {}", failures(&report));
        assert_eq!(report.releases.len(), 1);
        assert_eq!(report.releases[0].kind, kind);
        assert_eq!(report.releases[0].outcome, ReleaseOutcome::Deleted);
    }
    let deletes = stub.requests().into_iter().filter(|request| request.method == "DELETE").count();
    assert_eq!(deletes, 2);
    assert!(stub.is_clean());
    reporter.finish("pass")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn payment_proof_is_enforced_and_cleaned_up() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("payment_proof_is_enforced_and_cleaned_up")?;
    let stub = spawn_agency_stub().await?;
    let report = run_builtin("payment-proof", &Target::new(stub.base_url())).await?;
    reporter.record_scenario(&report)?;

    assert!(report.passed(), "{}", failures(&report));
    assert_eq!(status_of(&report, "rejection mentions proof"), StepStatus::Pass);
    let kinds: Vec<ResourceKind> = report.releases.iter().map(|release| release.kind).collect();
    assert_eq!(kinds, [ResourceKind::Payment, ResourceKind::Project, ResourceKind::Client]);
    assert!(stub.is_clean());
    reporter.finish("pass")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_proof_validation_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("missing_proof_validation_is_reported")?;
    let stub = spawn_agency_stub_with(StubBehavior {
        require_proof: false,
        ..StubBehavior::default()
    })
    .await?;
    let report = run_builtin("payment-proof", &Target::new(stub.base_url())).await?;
    reporter.record_scenario(&report)?;

    assert!(!report.passed());
    assert_eq!(status_of(&report, "payment without proof rejected"), StepStatus::Fail);
    assert_eq!(report.cleanup_failures(), 0);
    assert!(stub.is_clean(), "the accepted proofless payment must be released too");
    reporter.finish("pass")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn project_cascade_accepts_rejection_or_cascade() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("project_cascade_accepts_rejection_or_cascade")?;
    for cascade in [false, true] {
        let stub = spawn_agency_stub_with(StubBehavior {
            cascade,
            ..StubBehavior::default()
        })
        .await?;
        let report = run_builtin("project-cascade", &Target::new(stub.base_url())).await?;
        reporter.record_scenario(&report)?;
        assert!(report.passed(), "cascade={cascade}: {}", failures(&report));
        assert_eq!(report.cleanup_failures(), 0);
        let gone = report
            .releases
            .iter()
            .filter(|release| release.outcome == ReleaseOutcome::AlreadyGone)
            .count();
        assert_eq!(gone, if cascade { 2 } else { 0 });
        assert!(stub.is_clean());
    }
    reporter.finish("pass")?;
    Ok(())
}
