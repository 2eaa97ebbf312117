//! Acceptance tests, driven through the CLI's JSON output.

use assert_cmd::Command;
use serde_json::Value;

mod common;

use common::workflow_under_test;

fn prguard() -> Command {
    let mut cmd = Command::cargo_bin("prguard").expect("Cannot create executable command");
    // All tests need machine-readable output.
    cmd.args(["--no-config", "--format", "json"]);
    cmd
}

#[test]
fn audit_untrusted_checkout() -> anyhow::Result<()> {
    let auditable = workflow_under_test("untrusted-checkout.yml");

    let execution = prguard().arg(&auditable).output()?;

    // Highest severity is High.
    assert_eq!(execution.status.code(), Some(14));

    let findings: Value = serde_json::from_slice(&execution.stdout)?;
    let findings = findings.as_array().expect("expected a findings array");

    // Five of the nine jobs check out an attacker-controllable ref
    // without a gate; the rest are either harmless or gated.
    assert_eq!(findings.len(), 5);

    let flagged_jobs: Vec<&str> = findings
        .iter()
        .map(|finding| finding["locations"][0]["job"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        flagged_jobs,
        [
            "head-ref",
            "head-sha",
            "pr-number",
            "event-number",
            "head-ref-context"
        ]
    );

    assert_eq!(findings[0]["ident"], "untrusted-checkout");
    assert_eq!(findings[0]["determinations"]["severity"], "high");
    assert_eq!(findings[0]["determinations"]["confidence"], "medium");
    assert_eq!(
        findings[0]["locations"][0]["annotation"],
        "checks out an attacker-controllable ref"
    );

    Ok(())
}

#[test]
fn unprivileged_trigger_is_clean() -> anyhow::Result<()> {
    let auditable = workflow_under_test("unprivileged-trigger.yml");

    let execution = prguard().arg(&auditable).output()?;
    assert_eq!(execution.status.code(), Some(0));

    let findings = String::from_utf8(execution.stdout)?;
    assert_eq!(&findings, "[]");

    Ok(())
}

#[test]
fn labeled_only_activity_is_clean() -> anyhow::Result<()> {
    let auditable = workflow_under_test("labeled-gate.yml");

    let execution = prguard().arg(&auditable).output()?;
    assert_eq!(execution.status.code(), Some(0));

    let findings = String::from_utf8(execution.stdout)?;
    assert_eq!(&findings, "[]");

    Ok(())
}

#[test]
fn malformed_workflow_does_not_fail_the_run() -> anyhow::Result<()> {
    let malformed = workflow_under_test("malformed.yml");
    let auditable = workflow_under_test("unprivileged-trigger.yml");

    let execution = prguard().args([&malformed, &auditable]).output()?;

    // Structural errors never contribute to the exit code.
    assert_eq!(execution.status.code(), Some(0));

    let findings = String::from_utf8(execution.stdout)?;
    assert_eq!(&findings, "[]");

    Ok(())
}

#[test]
fn no_exit_codes_suppresses_severity_mapping() -> anyhow::Result<()> {
    let auditable = workflow_under_test("untrusted-checkout.yml");

    let execution = prguard()
        .args(["--no-exit-codes", auditable.as_str()])
        .output()?;
    assert_eq!(execution.status.code(), Some(0));

    Ok(())
}

#[test]
fn config_can_ignore_a_workflow() -> anyhow::Result<()> {
    let auditable = workflow_under_test("untrusted-checkout.yml");
    let config = workflow_under_test("ignore-untrusted-checkout.yml");

    // NOTE: not `prguard()`, since `--config` conflicts with `--no-config`.
    let execution = Command::cargo_bin("prguard")
        .expect("Cannot create executable command")
        .args(["--format", "json", "--config", config.as_str(), auditable.as_str()])
        .output()?;
    assert_eq!(execution.status.code(), Some(0));

    let findings = String::from_utf8(execution.stdout)?;
    assert_eq!(&findings, "[]");

    Ok(())
}

#[test]
fn config_can_retarget_the_checkout_action() -> anyhow::Result<()> {
    let auditable = workflow_under_test("custom-checkout.yml");
    let config = workflow_under_test("custom-checkout-config.yml");

    let execution = Command::cargo_bin("prguard")
        .expect("Cannot create executable command")
        .args(["--format", "json", "--config", config.as_str(), auditable.as_str()])
        .output()?;
    assert_eq!(execution.status.code(), Some(14));

    let findings: Value = serde_json::from_slice(&execution.stdout)?;
    assert_eq!(findings.as_array().map(Vec::len), Some(1));
    assert_eq!(findings[0]["locations"][0]["job"]["id"], "mirror");

    Ok(())
}

#[test]
fn min_severity_filters_everything_below() -> anyhow::Result<()> {
    let auditable = workflow_under_test("untrusted-checkout.yml");

    let execution = prguard()
        .args(["--min-severity", "high", auditable.as_str()])
        .output()?;
    // All findings are High, so nothing is filtered.
    assert_eq!(execution.status.code(), Some(14));

    let execution = prguard()
        .args(["--min-confidence", "high", auditable.as_str()])
        .output()?;
    // All findings are Medium confidence, so everything is filtered.
    assert_eq!(execution.status.code(), Some(0));

    let findings = String::from_utf8(execution.stdout)?;
    assert_eq!(&findings, "[]");

    Ok(())
}
