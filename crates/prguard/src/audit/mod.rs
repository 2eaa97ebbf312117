//! Core namespace for prguard's audits.

use thiserror::Error;

use crate::finding::{Finding, FindingBuilder};
use crate::models::{Job, Step, Workflow};
use crate::state::AuditState;

pub(crate) mod untrusted_checkout;

/// A supertrait for all audits, providing identity metadata.
///
/// Implemented via the [`audit_meta`] macro.
pub(crate) trait AuditCore {
    fn ident() -> &'static str
    where
        Self: Sized;

    fn desc() -> &'static str
    where
        Self: Sized;

    fn finding<'w>() -> FindingBuilder<'w>
    where
        Self: Sized,
    {
        FindingBuilder::new(Self::ident(), Self::desc())
    }
}

/// A convenience macro for implementing [`AuditCore`] on a type.
///
/// Example use:
///
/// ```no_run
/// struct SomeAudit;
///
/// audit_meta!(SomeAudit, "some-audit", "brief description");
/// ```
macro_rules! audit_meta {
    ($t:ty, $id:literal, $desc:expr) => {
        use crate::audit::AuditCore;

        impl AuditCore for $t {
            fn ident() -> &'static str {
                $id
            }

            fn desc() -> &'static str
            where
                Self: Sized,
            {
                $desc
            }
        }
    };
}

pub(crate) use audit_meta;

#[derive(Error, Debug)]
pub(crate) enum AuditLoadError {
    /// The audit's initialization failed in a way that suggests it should
    /// be skipped, rather than failing the entire run.
    #[error("{0}")]
    Skip(anyhow::Error),
    /// The audit's initialization failed in a way that should fail
    /// the entire run.
    #[error("{0}")]
    Fail(anyhow::Error),
}

/// Auditing trait.
///
/// Implementors can choose their level of specificity: overriding
/// [`Audit::audit_workflow`] shadows the per-job and per-step defaults,
/// and overriding [`Audit::audit_job`] shadows the per-step default.
pub(crate) trait Audit: AuditCore {
    fn new(state: &AuditState<'_>) -> Result<Self, AuditLoadError>
    where
        Self: Sized;

    fn audit_step<'w>(&self, _step: &Step<'w>) -> anyhow::Result<Vec<Finding<'w>>> {
        Ok(vec![])
    }

    fn audit_job<'w>(&self, job: &Job<'w>) -> anyhow::Result<Vec<Finding<'w>>> {
        let mut results = vec![];
        for step in job.steps() {
            results.extend(self.audit_step(&step)?);
        }
        Ok(results)
    }

    fn audit_workflow<'w>(&self, workflow: &'w Workflow) -> anyhow::Result<Vec<Finding<'w>>> {
        let mut results = vec![];
        for job in workflow.jobs() {
            results.extend(self.audit_job(&job)?);
        }
        Ok(results)
    }

    /// The top-level auditing function.
    ///
    /// Implementors **should not** override this blanket implementation.
    ///
    /// NOTE: This method takes the audit's own identifier as an argument:
    /// it gets invoked through a trait object, where `Self::ident()` is
    /// unavailable because `Self` is not `Sized`.
    fn audit<'w>(
        &self,
        ident: &'static str,
        workflow: &'w Workflow,
    ) -> anyhow::Result<Vec<Finding<'w>>> {
        tracing::debug!(
            "audit: {ident} evaluating {workflow}",
            workflow = workflow.filename()
        );

        self.audit_workflow(workflow)
    }
}
