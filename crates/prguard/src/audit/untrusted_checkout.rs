use std::sync::LazyLock;

use anyhow::Context as _;
use github_workflow_models::common::Uses;
use regex::Regex;
use serde::Deserialize;

use super::{Audit, AuditLoadError, audit_meta};
use crate::finding::{Confidence, Finding, Severity};
use crate::models::Workflow;
use crate::state::AuditState;

/// The trigger that runs fork-derived content with write access to the
/// base repository and its secrets.
const DEFAULT_PRIVILEGED_TRIGGER: &str = "pull_request_target";

const DEFAULT_CHECKOUT_ACTION: &str = "actions/checkout";

/// The activity type treated as an implicit authorization gate: a label
/// can only be attached by someone with triage access or better.
const LABELED_ACTIVITY: &str = "labeled";

/// Accessors that resolve to the fork's branch name, the fork's commit
/// SHA, or the PR number. Refs like `merge_commit_sha`,
/// `repository.default_branch`, and `event.after` resolve to content
/// reviewed by the base repository and are excluded by omission.
const DEFAULT_UNTRUSTED_REFS: &[&str] = &[
    "github.event.pull_request.head.ref",
    "github.event.pull_request.head.sha",
    "github.event.pull_request.number",
    "github.event.number",
    "github.head_ref",
];

/// Condition patterns recognized as sufficient authorization guards:
/// a label containment check, a label-name equality, or an actor
/// equality. Whitespace- and case-robust, never semantically evaluated.
const DEFAULT_GUARD_PATTERNS: &[&str] = &[
    r"(?i)contains\s*\(\s*github\s*\.\s*event\s*\.\s*(issue|pull_request)\s*\.\s*labels",
    r"(?i)github\s*\.\s*event\s*\.\s*label\s*\.\s*name\s*==|==\s*github\s*\.\s*event\s*\.\s*label\s*\.\s*name",
    r"(?i)github\s*\.\s*actor\s*==|==\s*github\s*\.\s*actor",
];

static COMPILED_DEFAULT_GUARD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DEFAULT_GUARD_PATTERNS
        .iter()
        .map(|pat| Regex::new(pat).expect("invalid default guard pattern"))
        .collect()
});

pub(crate) struct UntrustedCheckout {
    privileged_trigger: String,
    checkout_action: String,
    untrusted_refs: Vec<String>,
    guard_patterns: Vec<Regex>,
}

audit_meta!(
    UntrustedCheckout,
    "untrusted-checkout",
    "Potential unsafe checkout of untrusted pull request on a privileged trigger."
);

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct UntrustedCheckoutConfig {
    privileged_trigger: Option<String>,
    checkout_action: Option<String>,
    untrusted_refs: Option<Vec<String>>,
    guard_patterns: Option<Vec<String>>,
}

impl UntrustedCheckout {
    fn with_config(config: UntrustedCheckoutConfig) -> anyhow::Result<Self> {
        let guard_patterns = match config.guard_patterns {
            Some(patterns) => patterns
                .iter()
                .map(|pat| Regex::new(pat).with_context(|| format!("invalid guard pattern: {pat}")))
                .collect::<anyhow::Result<Vec<_>>>()?,
            None => COMPILED_DEFAULT_GUARD_PATTERNS.clone(),
        };

        Ok(Self {
            privileged_trigger: config
                .privileged_trigger
                .unwrap_or_else(|| DEFAULT_PRIVILEGED_TRIGGER.into()),
            checkout_action: config
                .checkout_action
                .unwrap_or_else(|| DEFAULT_CHECKOUT_ACTION.into()),
            untrusted_refs: config.untrusted_refs.unwrap_or_else(|| {
                DEFAULT_UNTRUSTED_REFS.iter().map(|&r| r.into()).collect()
            }),
            guard_patterns,
        })
    }

    /// Whether the workflow's privileged-trigger configuration is
    /// exploitable, i.e. not restricted to the labeled activity alone.
    fn has_exploitable_trigger(&self, workflow: &Workflow) -> bool {
        if !workflow.has_trigger(&self.privileged_trigger) {
            return false;
        }

        match workflow.trigger_types(&self.privileged_trigger) {
            // Restricting activity to exactly {labeled} makes a maintainer's
            // label the gate; any other filter (including an empty one)
            // leaves the trigger exploitable.
            Some(types) => {
                types.is_empty() || types.iter().any(|ty| ty != LABELED_ACTIVITY)
            }
            None => true,
        }
    }

    /// Whether a condition constitutes a sufficient authorization guard.
    ///
    /// A condition containing `||` is never sufficient: the OR can weaken
    /// an otherwise-safe check, so it's conservatively treated as
    /// unguarded and left for manual review.
    fn is_guarded(&self, condition: Option<&str>) -> bool {
        let Some(condition) = condition else {
            return false;
        };

        if condition.contains("||") {
            return false;
        }

        self.guard_patterns.iter().any(|pat| pat.is_match(condition))
    }

    /// Whether a `ref` parameter value points at attacker-controlled data.
    fn references_untrusted_ref(&self, value: &str) -> bool {
        self.untrusted_refs
            .iter()
            .any(|untrusted| value.contains(untrusted.as_str()))
    }
}

impl Audit for UntrustedCheckout {
    fn new(state: &AuditState<'_>) -> Result<Self, AuditLoadError> {
        let config = state
            .config
            .rule_config(Self::ident())
            .context("invalid configuration")
            .map_err(AuditLoadError::Fail)?
            .unwrap_or_default();

        Self::with_config(config).map_err(AuditLoadError::Fail)
    }

    fn audit_workflow<'w>(&self, workflow: &'w Workflow) -> anyhow::Result<Vec<Finding<'w>>> {
        let mut findings = vec![];

        if !self.has_exploitable_trigger(workflow) {
            return Ok(findings);
        }

        for job in workflow.jobs() {
            // A guard on the job protects every step beneath it.
            let job_guarded = self.is_guarded(job.condition());

            for step in job.steps() {
                let Some(Uses::Repository(uses)) = step.uses() else {
                    continue;
                };

                if !uses.matches(&self.checkout_action) {
                    continue;
                }

                let Some(checkout_ref) = step.with.get("ref") else {
                    continue;
                };

                if !self.references_untrusted_ref(&checkout_ref.to_string()) {
                    continue;
                }

                if job_guarded || self.is_guarded(step.condition()) {
                    continue;
                }

                findings.push(
                    Self::finding()
                        .severity(Severity::High)
                        .confidence(Confidence::Medium)
                        .add_location(
                            step.location()
                                .annotated("checks out an attacker-controllable ref"),
                        )
                        .build(),
                );
            }
        }

        Ok(findings)
    }
}
