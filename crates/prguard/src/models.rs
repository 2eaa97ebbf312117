//! Enriching/context-bearing wrappers over the workflow models
//! from the `github-workflow-models` crate.

use std::fmt::Debug;
use std::iter::Enumerate;
use std::ops::Deref;

use anyhow::{Context as _, Result};
use camino::Utf8Path;
use github_workflow_models::common::Uses;
use github_workflow_models::workflow;

use crate::finding::WorkflowLocation;
use crate::registry::InputKey;

/// Represents an entire GitHub Actions workflow.
///
/// This type implements [`Deref`] for [`workflow::Workflow`],
/// providing access to the underlying data model.
pub(crate) struct Workflow {
    /// This workflow's unique key into the runtime input registry.
    pub(crate) key: InputKey,
    inner: workflow::Workflow,
}

impl Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{key}", key = self.key)
    }
}

impl Deref for Workflow {
    type Target = workflow::Workflow;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Workflow {
    /// Load a workflow from a buffer, with an assigned key.
    pub(crate) fn from_string(contents: &str, key: InputKey) -> Result<Self> {
        let inner = serde_yaml::from_str(contents)
            .with_context(|| format!("invalid GitHub Actions workflow: {key}"))?;

        Ok(Self { key, inner })
    }

    /// Load a workflow from the given file on disk.
    pub(crate) fn from_file<P: AsRef<Utf8Path>>(p: P) -> Result<Self> {
        let contents = std::fs::read_to_string(p.as_ref())
            .with_context(|| format!("couldn't read workflow file: {p}", p = p.as_ref()))?;
        let path = p.as_ref().canonicalize_utf8()?;

        Self::from_string(&contents, InputKey::local(path)?)
    }

    /// Returns the filename (i.e. base component) of the loaded workflow.
    pub(crate) fn filename(&self) -> &str {
        self.key.filename()
    }

    /// This workflow's [`WorkflowLocation`].
    pub(crate) fn location(&self) -> WorkflowLocation<'_> {
        WorkflowLocation {
            workflow: self.filename(),
            job: None,
            annotation: None,
        }
    }

    /// A [`Jobs`] iterator over this workflow's constituent [`Job`]s.
    pub(crate) fn jobs(&self) -> Jobs<'_> {
        Jobs::new(self)
    }

    /// Whether this workflow is triggered by the named event.
    pub(crate) fn has_trigger(&self, event: &str) -> bool {
        self.on.contains(event)
    }

    /// The `types:` activity filter on the named trigger, if any.
    pub(crate) fn trigger_types(&self, event: &str) -> Option<&[String]> {
        self.on.types(event)
    }
}

/// Represents a single GitHub Actions job.
///
/// This type implements [`Deref`] for [`workflow::Job`], providing
/// access to the underlying data model.
#[derive(Clone)]
pub(crate) struct Job<'w> {
    /// The job's unique ID (i.e., its key in the workflow's `jobs:` block).
    pub(crate) id: &'w str,
    /// The underlying job.
    inner: &'w workflow::Job,
    /// The job's parent [`Workflow`].
    parent: &'w Workflow,
}

impl<'w> Deref for Job<'w> {
    type Target = &'w workflow::Job;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<'w> Job<'w> {
    fn new(id: &'w str, inner: &'w workflow::Job, parent: &'w Workflow) -> Self {
        Self { id, inner, parent }
    }

    /// This job's parent [`Workflow`].
    pub(crate) fn parent(&self) -> &'w Workflow {
        self.parent
    }

    /// This job's [`WorkflowLocation`].
    pub(crate) fn location(&self) -> WorkflowLocation<'w> {
        self.parent().location().with_job(self)
    }

    /// An iterator of this job's constituent [`Step`]s.
    pub(crate) fn steps(&self) -> Steps<'w> {
        Steps::new(self)
    }

    /// The job's `if:` expression text, if it has an expression condition.
    pub(crate) fn condition(&self) -> Option<&'w str> {
        self.inner.r#if.as_ref().and_then(|cond| cond.as_expr())
    }
}

/// An iterable container for jobs within a [`Workflow`].
pub(crate) struct Jobs<'w> {
    parent: &'w Workflow,
    inner: indexmap::map::Iter<'w, String, workflow::Job>,
}

impl<'w> Jobs<'w> {
    fn new(workflow: &'w Workflow) -> Self {
        Self {
            parent: workflow,
            inner: workflow.jobs.iter(),
        }
    }
}

impl<'w> Iterator for Jobs<'w> {
    type Item = Job<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next() {
            Some((id, job)) => Some(Job::new(id, job, self.parent)),
            None => None,
        }
    }
}

/// Represents a single step within a job.
///
/// This type implements [`Deref`] for [`workflow::Step`], which
/// provides access to the step's actual fields.
#[derive(Clone)]
pub(crate) struct Step<'w> {
    /// The step's index within its parent job.
    pub(crate) index: usize,
    /// The inner step model.
    inner: &'w workflow::Step,
    /// The step's parent [`Job`].
    parent: Job<'w>,
}

impl<'w> Deref for Step<'w> {
    type Target = &'w workflow::Step;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<'w> Step<'w> {
    fn new(index: usize, inner: &'w workflow::Step, parent: Job<'w>) -> Self {
        Self {
            index,
            inner,
            parent,
        }
    }

    /// This step's [`WorkflowLocation`].
    pub(crate) fn location(&self) -> WorkflowLocation<'w> {
        self.parent.location().with_step(self)
    }

    /// The step's `if:` expression text, if it has an expression condition.
    pub(crate) fn condition(&self) -> Option<&'w str> {
        self.inner.r#if.as_ref().and_then(|cond| cond.as_expr())
    }

    /// The step's parsed `uses:` clause, if present and well-formed.
    ///
    /// A missing or malformed `uses:` yields `None`: such a step can't
    /// be resolved to an action, so it drops out of consideration.
    pub(crate) fn uses(&self) -> Option<Uses> {
        let raw = self.inner.uses.as_deref()?;

        match Uses::parse(raw) {
            Ok(uses) => Some(uses),
            Err(err) => {
                tracing::debug!("unresolvable `uses` clause: {err}");
                None
            }
        }
    }
}

/// An iterable container for steps within a [`Job`].
pub(crate) struct Steps<'w> {
    inner: Enumerate<std::slice::Iter<'w, workflow::Step>>,
    parent: Job<'w>,
}

impl<'w> Steps<'w> {
    fn new(job: &Job<'w>) -> Self {
        Self {
            inner: job.steps.iter().enumerate(),
            parent: job.clone(),
        }
    }
}

impl<'w> Iterator for Steps<'w> {
    type Item = Step<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next() {
            Some((idx, step)) => Some(Step::new(idx, step, self.parent.clone())),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Workflow;
    use crate::registry::InputKey;

    fn workflow(contents: &str) -> Workflow {
        Workflow::from_string(contents, InputKey::local("dummy.yml".into()).unwrap()).unwrap()
    }

    #[test]
    fn test_trigger_helpers() {
        let wf = workflow(
            r#"
            on:
              pull_request_target:
                types: [labeled]
            jobs: {}
            "#,
        );
        assert!(wf.has_trigger("pull_request_target"));
        assert!(!wf.has_trigger("pull_request"));
        assert_eq!(
            wf.trigger_types("pull_request_target"),
            Some(["labeled".to_string()].as_slice())
        );
    }

    #[test]
    fn test_step_uses_resolution() {
        let wf = workflow(
            r#"
            on: pull_request_target
            jobs:
              one:
                steps:
                  - uses: actions/checkout@v4
                  - run: make
                  - uses: "@not-a-slug"
            "#,
        );

        let job = wf.jobs().next().unwrap();
        let resolved: Vec<bool> = job.steps().map(|s| s.uses().is_some()).collect();
        assert_eq!(resolved, [true, false, false]);
    }

    #[test]
    fn test_conditions_are_verbatim() {
        let wf = workflow(
            r#"
            on: pull_request_target
            jobs:
              one:
                if: "  github.actor   ==   'octocat'  "
                steps:
                  - if: true
                    run: make
            "#,
        );

        let job = wf.jobs().next().unwrap();
        assert_eq!(job.condition(), Some("  github.actor   ==   'octocat'  "));
        // Boolean conditions carry no expression text.
        assert_eq!(job.steps().next().unwrap().condition(), None);
    }
}
