//! Workflow definition models.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::common::{Env, If, opt_bool_is_string, opt_scalar_or_vector};

/// A single GitHub Actions workflow document.
///
/// Only the fields that structural analysis consumes are modeled;
/// everything else in the document is tolerated and ignored.
#[derive(Deserialize, Debug)]
pub struct Workflow {
    pub name: Option<String>,
    pub on: Trigger,
    pub jobs: IndexMap<String, Job>,
}

/// The `on:` block of a workflow.
///
/// Trigger names are kept as raw strings rather than an exhaustive
/// event enum, so that callers can treat the privileged trigger as
/// a configuration knob.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum Trigger {
    /// `on: pull_request_target`
    Bare(String),
    /// `on: [push, pull_request_target]`
    Multiple(Vec<String>),
    /// The mapping form, with optional per-event configuration bodies.
    Events(IndexMap<String, Option<EventConfig>>),
}

impl Trigger {
    /// Whether this trigger set contains the named event.
    pub fn contains(&self, event: &str) -> bool {
        match self {
            Trigger::Bare(name) => name == event,
            Trigger::Multiple(names) => names.iter().any(|name| name == event),
            Trigger::Events(events) => events.contains_key(event),
        }
    }

    /// The `types:` activity filter for the named event, if the event is
    /// present in mapping form and carries one.
    pub fn types(&self, event: &str) -> Option<&[String]> {
        match self {
            Trigger::Bare(_) | Trigger::Multiple(_) => None,
            Trigger::Events(events) => events
                .get(event)?
                .as_ref()?
                .types
                .as_deref(),
        }
    }
}

/// Per-event trigger configuration, e.g. the body of
/// `on: { pull_request_target: { types: [labeled] } }`.
#[derive(Deserialize, Debug, Default)]
pub struct EventConfig {
    #[serde(default, deserialize_with = "opt_scalar_or_vector")]
    pub types: Option<Vec<String>>,
}

/// A single job within a workflow.
///
/// Reusable-workflow-call jobs deserialize with an empty `steps`
/// sequence and are naturally inert under step-wise analysis.
#[derive(Deserialize, Debug)]
pub struct Job {
    pub name: Option<String>,
    pub r#if: Option<If>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A single step within a job.
#[derive(Deserialize, Debug)]
pub struct Step {
    pub id: Option<String>,
    pub name: Option<String>,
    pub r#if: Option<If>,
    /// The step's raw `uses:` clause, if any. Kept unparsed here;
    /// resolution happens in the consuming layer.
    pub uses: Option<String>,
    #[serde(default, deserialize_with = "opt_bool_is_string")]
    pub run: Option<String>,
    #[serde(default)]
    pub with: Env,
}

#[cfg(test)]
mod tests {
    use super::{Trigger, Workflow};

    #[test]
    fn test_trigger_forms() {
        let bare: Trigger = serde_yaml::from_str("pull_request_target").unwrap();
        assert!(bare.contains("pull_request_target"));
        assert!(!bare.contains("push"));
        assert_eq!(bare.types("pull_request_target"), None);

        let multiple: Trigger = serde_yaml::from_str("[push, pull_request_target]").unwrap();
        assert!(multiple.contains("pull_request_target"));
        assert!(multiple.contains("push"));

        let events: Trigger = serde_yaml::from_str(
            r#"
            push:
            pull_request_target:
              types: [labeled, opened]
            "#,
        )
        .unwrap();
        assert!(events.contains("pull_request_target"));
        assert!(events.contains("push"));
        assert_eq!(events.types("push"), None);
        assert_eq!(
            events.types("pull_request_target"),
            Some(["labeled".to_string(), "opened".to_string()].as_slice())
        );

        // Scalar `types:` is tolerated.
        let scalar: Trigger = serde_yaml::from_str(
            r#"
            pull_request_target:
              types: labeled
            "#,
        )
        .unwrap();
        assert_eq!(
            scalar.types("pull_request_target"),
            Some(["labeled".to_string()].as_slice())
        );
    }

    #[test]
    fn test_workflow_roundtrip() {
        let workflow: Workflow = serde_yaml::from_str(
            r#"
            name: CI
            on:
              pull_request_target:
            jobs:
              build:
                runs-on: ubuntu-latest
                if: github.actor == 'torvalds'
                steps:
                  - uses: actions/checkout@v4
                    with:
                      ref: ${{ github.event.pull_request.head.ref }}
                  - run: make test
            "#,
        )
        .unwrap();

        assert_eq!(workflow.name.as_deref(), Some("CI"));
        let build = &workflow.jobs["build"];
        assert_eq!(build.steps.len(), 2);
        assert_eq!(build.steps[0].uses.as_deref(), Some("actions/checkout@v4"));
        assert_eq!(
            build.steps[0].with["ref"].to_string(),
            "${{ github.event.pull_request.head.ref }}"
        );
        assert_eq!(build.steps[1].run.as_deref(), Some("make test"));
    }

    #[test]
    fn test_jobs_preserve_document_order() {
        let workflow: Workflow = serde_yaml::from_str(
            r#"
            on: push
            jobs:
              zeta: { steps: [] }
              alpha: { steps: [] }
              mid: { steps: [] }
            "#,
        )
        .unwrap();

        let ids: Vec<_> = workflow.jobs.keys().map(String::as_str).collect();
        assert_eq!(ids, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_jobs_must_be_a_mapping() {
        assert!(
            serde_yaml::from_str::<Workflow>(
                r#"
                on: push
                jobs: [not, a, mapping]
                "#
            )
            .is_err()
        );
    }
}
