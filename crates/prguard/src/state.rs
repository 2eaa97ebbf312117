//! prguard's runtime state, shared across audit construction.

use crate::config::Config;

#[derive(Clone)]
pub(crate) struct AuditState<'a> {
    pub(crate) config: &'a Config,
}

impl<'a> AuditState<'a> {
    pub(crate) fn new(config: &'a Config) -> Self {
        Self { config }
    }
}
