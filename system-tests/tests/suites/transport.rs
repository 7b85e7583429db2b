// system-tests/tests/suites/transport.rs
// ============================================================================
// Module: Transport and Session Tests
// Description: Session styles, auth origins, timeouts and redaction over HTTP.
// Purpose: Ensure the real transport honors the session contract.
// Dependencies: system-tests helpers, contract-probe-core
// ============================================================================

//! Transport coverage: tokens, cookies, separate auth origins, timeouts.

use std::time::Duration;

use contract_probe_core::Origin;
use contract_probe_core::ScenarioOutcome;
use contract_probe_core::StepStatus;
use helpers::agency_stub::StubBehavior;
use helpers::agency_stub::spawn_agency_stub;
use helpers::agency_stub::spawn_agency_stub_with;
use helpers::agency_stub::spawn_agency_stub_with_auth_alias;
use helpers::artifacts::TestReporter;
use helpers::harness::Target;
use helpers::harness::failures;
use helpers::harness::run_builtin;

use crate::helpers;

#[tokio::test(flavor = "multi_thread")]
async fn cookie_sessions_authenticate_requests() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("cookie_sessions_authenticate_requests")?;
    let stub = spawn_agency_stub_with(StubBehavior {
        cookie_only: true,
        ..StubBehavior::default()
    })
    .await?;
    let report = run_builtin("login-logout", &Target::new(stub.base_url())).await?;
    reporter.record_scenario(&report)?;

    assert!(report.passed(), "{}", failures(&report));
    assert!(stub.requests().iter().all(|request| request.authorization.is_none()));
    assert_eq!(stub.live_sessions(), 0);
    reporter.finish("pass")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn alternate_token_field_is_accepted() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("alternate_token_field_is_accepted")?;
    let stub = spawn_agency_stub_with(StubBehavior {
        token_field: "accessToken",
        ..StubBehavior::default()
    })
    .await?;
    let report = run_builtin("login-logout", &Target::new(stub.base_url())).await?;
    reporter.record_scenario(&report)?;
    assert!(report.passed(), "{}", failures(&report));
    reporter.finish("pass")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn tokens_surviving_logout_are_caught() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("tokens_surviving_logout_are_caught")?;
    let stub = spawn_agency_stub_with(StubBehavior {
        revoke_on_logout: false,
        ..StubBehavior::default()
    })
    .await?;
    let report = run_builtin("login-logout", &Target::new(stub.base_url())).await?;
    reporter.record_scenario(&report)?;

    assert_eq!(report.outcome, ScenarioOutcome::Fail);
    let stale = report.steps.iter().find(|step| step.name == "stale token refused").unwrap();
    assert_eq!(stale.status, StepStatus::Fail);
    reporter.finish("pass")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn auth_calls_go_to_the_auth_origin() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("auth_calls_go_to_the_auth_origin")?;
    let stub = spawn_agency_stub_with_auth_alias().await?;
    let auth_base = stub.auth_base_url().ok_or("auth alias missing")?.to_string();
    let target = Target {
        auth_base_url: Some(&auth_base),
        ..Target::new(stub.base_url())
    };
    let report = run_builtin("login-logout", &target).await?;
    reporter.record_scenario(&report)?;
    assert!(report.passed(), "{}", failures(&report));

    let auth_host = auth_base.trim_start_matches("http://");
    let api_host = stub.base_url().trim_start_matches("http://");
    for request in stub.requests() {
        let expected = if request.path.starts_with("/api/auth/") { auth_host } else { api_host };
        assert_eq!(request.host.as_deref(), Some(expected), "{}", request.path);
    }
    let origins: Vec<Origin> = report.transcript.iter().map(|entry| entry.origin).collect();
    assert_eq!(origins.first(), Some(&Origin::Auth));
    assert!(origins.contains(&Origin::Api));
    reporter.finish("pass")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_login_times_out_as_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("slow_login_times_out_as_an_error")?;
    let stub = spawn_agency_stub_with(StubBehavior {
        login_delay: Duration::from_secs(3),
        ..StubBehavior::default()
    })
    .await?;
    let target = Target {
        timeout_secs: 1,
        ..Target::new(stub.base_url())
    };
    let report = run_builtin("login-logout", &target).await?;
    reporter.record_scenario(&report)?;

    assert_eq!(report.outcome, ScenarioOutcome::Fail);
    let step = &report.steps[0];
    assert_eq!(step.name, "authenticate");
    assert_eq!(step.status, StepStatus::Error);
    assert!(step.detail.as_deref().unwrap().contains("timed out"), "{:?}", step.detail);
    assert!(report.sessions.is_empty());
    assert_eq!(stub.requests().len(), 1);
    reporter.finish("pass")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn refused_connection_is_an_error_step() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("refused_connection_is_an_error_step")?;
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let closed = format!("http://{}", listener.local_addr()?);
    drop(listener);
    let report = run_builtin("login-logout", &Target::new(&closed)).await?;
    reporter.record_scenario(&report)?;

    assert_eq!(report.outcome, ScenarioOutcome::Fail);
    assert_eq!(report.steps[0].status, StepStatus::Error);
    assert_eq!(report.transcript.len(), 1);
    assert!(report.transcript[0].status.is_none());
    assert!(report.transcript[0].error.is_some());
    reporter.finish("pass")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn reports_never_carry_tokens() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("reports_never_carry_tokens")?;
    let stub = spawn_agency_stub().await?;
    let report = run_builtin("login-logout", &Target::new(stub.base_url())).await?;
    reporter.record_scenario(&report)?;

    let serialized = serde_json::to_string(&report)?;
    assert!(!serialized.contains("stub-token-"));
    assert!(!serialized.contains("AdminPass123"));
    assert!(
        report
            .transcript
            .iter()
            .filter_map(|entry| entry.auth.as_deref())
            .all(|auth| auth.ends_with("<redacted>"))
    );
    let presented = stub
        .requests()
        .into_iter()
        .filter_map(|request| request.authorization)
        .any(|auth| auth.starts_with("Bearer stub-token-"));
    assert!(presented, "the real token must still reach the server");
    reporter.finish("pass")?;
    Ok(())
}
