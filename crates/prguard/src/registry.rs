//! Functionality for registering and managing the lifecycles of
//! inputs, audits, and findings.

use std::fmt::Display;
use std::process::ExitCode;

use anyhow::{Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::Serialize;

use crate::App;
use crate::audit::Audit;
use crate::config::Config;
use crate::finding::{Confidence, Finding, Severity};
use crate::models::Workflow;

/// A unique identifying "key" for a workflow file in a given run.
///
/// Keys are canonical paths to files on disk.
#[derive(Debug, Clone, Eq, Hash, PartialEq, Serialize)]
pub(crate) struct InputKey {
    path: Utf8PathBuf,
}

impl Display for InputKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "file://{path}", path = self.path)
    }
}

impl InputKey {
    pub(crate) fn local(path: Utf8PathBuf) -> Result<Self> {
        // All keys must have a filename component.
        if path.file_name().is_none() {
            return Err(anyhow!("invalid input: no filename component"));
        }

        Ok(Self { path })
    }

    /// Returns the filename component of this [`InputKey`].
    pub(crate) fn filename(&self) -> &str {
        // NOTE: Safe unwrap, since the presence of a filename component
        // is a construction invariant.
        #[allow(clippy::unwrap_used)]
        self.path.file_name().unwrap()
    }
}

/// A registry of workflow inputs, plus any per-file structural errors
/// encountered while loading them.
pub(crate) struct InputRegistry {
    workflows: IndexMap<InputKey, Workflow>,
    errors: Vec<(Utf8PathBuf, anyhow::Error)>,
}

impl InputRegistry {
    pub(crate) fn new() -> Self {
        Self {
            workflows: Default::default(),
            errors: Default::default(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.workflows.len()
    }

    /// Registers an already-loaded workflow.
    pub(crate) fn register_workflow(&mut self, workflow: Workflow) -> Result<()> {
        if self.workflows.contains_key(&workflow.key) {
            return Err(anyhow!(
                "can't register {key} more than once",
                key = workflow.key
            ));
        }

        self.workflows.insert(workflow.key.clone(), workflow);

        Ok(())
    }

    /// Registers a workflow from its path on disk.
    ///
    /// A file that fails to load structurally is recorded as a per-file
    /// error rather than aborting the whole run.
    pub(crate) fn register_by_path(&mut self, path: &Utf8Path) {
        match Workflow::from_file(path) {
            Ok(workflow) => {
                // NOTE: Loading the same canonical path twice is the only
                // way this fails, so it folds into the error list too.
                if let Err(err) = self.register_workflow(workflow) {
                    self.errors.push((path.to_path_buf(), err));
                }
            }
            Err(err) => {
                tracing::warn!("couldn't load {path}: {err:#}");
                self.errors.push((path.to_path_buf(), err));
            }
        }
    }

    pub(crate) fn iter_workflows(&self) -> indexmap::map::Iter<'_, InputKey, Workflow> {
        self.workflows.iter()
    }

    /// Per-file structural errors encountered during registration.
    pub(crate) fn errors(&self) -> &[(Utf8PathBuf, anyhow::Error)] {
        &self.errors
    }
}

/// A registry of instantiated audits.
pub(crate) struct AuditRegistry {
    audits: IndexMap<&'static str, Box<dyn Audit>>,
}

impl AuditRegistry {
    pub(crate) fn new() -> Self {
        Self {
            audits: Default::default(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.audits.len()
    }

    pub(crate) fn register_audit(&mut self, ident: &'static str, audit: Box<dyn Audit>) {
        self.audits.insert(ident, audit);
    }

    pub(crate) fn iter_audits(&self) -> indexmap::map::Iter<'_, &'static str, Box<dyn Audit>> {
        self.audits.iter()
    }
}

/// A registry of all findings discovered during a run.
pub(crate) struct FindingRegistry<'a> {
    config: &'a Config,
    minimum_severity: Option<Severity>,
    minimum_confidence: Option<Confidence>,
    ignored: Vec<Finding<'a>>,
    findings: Vec<Finding<'a>>,
    highest_seen_severity: Option<Severity>,
}

impl<'a> FindingRegistry<'a> {
    pub(crate) fn new(app: &App, config: &'a Config) -> Self {
        Self {
            config,
            minimum_severity: app.min_severity,
            minimum_confidence: app.min_confidence,
            ignored: Default::default(),
            findings: Default::default(),
            highest_seen_severity: None,
        }
    }

    /// Adds one or more findings to the current findings set, filtering
    /// with the configuration in the process.
    pub(crate) fn extend(&mut self, results: Vec<Finding<'a>>) {
        for finding in results {
            if self
                .minimum_severity
                .is_some_and(|min| min > finding.determinations.severity)
                || self
                    .minimum_confidence
                    .is_some_and(|min| min > finding.determinations.confidence)
                || self.config.ignores(&finding)
            {
                self.ignored.push(finding);
            } else {
                if self
                    .highest_seen_severity
                    .is_none_or(|sev| finding.determinations.severity > sev)
                {
                    self.highest_seen_severity = Some(finding.determinations.severity);
                }

                self.findings.push(finding);
            }
        }
    }

    /// The total count of all findings, regardless of status.
    pub(crate) fn count(&self) -> usize {
        self.findings.len() + self.ignored.len()
    }

    /// All non-ignored findings.
    pub(crate) fn findings(&self) -> &[Finding<'a>] {
        &self.findings
    }

    /// All ignored findings.
    pub(crate) fn ignored(&self) -> &[Finding<'a>] {
        &self.ignored
    }
}

impl From<FindingRegistry<'_>> for ExitCode {
    fn from(value: FindingRegistry<'_>) -> Self {
        match value.highest_seen_severity {
            Some(sev) => match sev {
                Severity::Unknown => ExitCode::from(10),
                Severity::Informational => ExitCode::from(11),
                Severity::Low => ExitCode::from(12),
                Severity::Medium => ExitCode::from(13),
                Severity::High => ExitCode::from(14),
            },
            None => ExitCode::SUCCESS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InputKey;

    #[test]
    fn test_input_key_display() {
        let local = InputKey::local("/foo/bar/baz.yml".into()).unwrap();
        assert_eq!(local.to_string(), "file:///foo/bar/baz.yml");
        assert_eq!(local.filename(), "baz.yml");
    }
}
