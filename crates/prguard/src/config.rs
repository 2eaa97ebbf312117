//! Runtime configuration, corresponding to a `prguard.yml` file.

use std::collections::HashMap;
use std::fs;
use std::str::FromStr;

use anyhow::{Context as _, Result, anyhow};
use serde::{
    Deserialize,
    de::{self, DeserializeOwned},
};

use crate::App;
use crate::finding::Finding;

/// A per-rule ignore entry, naming a workflow file whose findings
/// should be suppressed.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct WorkflowRule {
    /// The workflow filename.
    pub(crate) filename: String,
}

impl FromStr for WorkflowRule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.ends_with(".yml") && !s.ends_with(".yaml") {
            return Err(anyhow!("invalid workflow filename: {s}"));
        }

        Ok(Self {
            filename: s.to_string(),
        })
    }
}

impl<'de> Deserialize<'de> for WorkflowRule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        WorkflowRule::from_str(&raw).map_err(de::Error::custom)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AuditRuleConfig {
    #[serde(default)]
    ignore: Vec<WorkflowRule>,
    #[serde(default)]
    config: Option<serde_yaml::Mapping>,
}

/// Runtime configuration, loaded from a `prguard.yml` file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    #[serde(default)]
    rules: HashMap<String, AuditRuleConfig>,
}

impl Config {
    pub(crate) fn new(app: &App) -> Result<Self> {
        if app.no_config {
            return Ok(Self::default());
        }

        let config = match &app.config {
            Some(path) => serde_yaml::from_str(
                &fs::read_to_string(path)
                    .with_context(|| format!("couldn't read config file: {path}"))?,
            )?,
            None => {
                // If the user didn't pass a config path explicitly with
                // `--config`, then we attempt to discover one relative to
                // $CWD: first `$CWD/.github/prguard.yml`, then
                // `$CWD/prguard.yml`, and then fall back to the default.
                let cwd = std::env::current_dir()
                    .with_context(|| "config discovery couldn't access CWD")?;

                let path = cwd.join(".github").join("prguard.yml");
                if path.is_file() {
                    serde_yaml::from_str(&fs::read_to_string(path)?)?
                } else {
                    let path = cwd.join("prguard.yml");
                    if path.is_file() {
                        serde_yaml::from_str(&fs::read_to_string(path)?)?
                    } else {
                        tracing::debug!("no config discovered; loading default");
                        Config::default()
                    }
                }
            }
        };

        tracing::debug!("loaded config: {config:?}");

        Ok(config)
    }

    /// Returns `true` if this [`Config`] has an ignore rule covering the
    /// given finding.
    ///
    /// If *any* location in the finding matches an ignore rule, the
    /// entire finding is considered ignored.
    pub(crate) fn ignores(&self, finding: &Finding<'_>) -> bool {
        let Some(rule_config) = self.rules.get(finding.ident) else {
            return false;
        };

        finding.locations.iter().any(|loc| {
            rule_config
                .ignore
                .iter()
                .any(|rule| rule.filename == loc.workflow)
        })
    }

    /// Deserializes the per-rule `config:` mapping for the given audit,
    /// if present.
    pub(crate) fn rule_config<T>(&self, ident: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        Ok(self
            .rules
            .get(ident)
            .and_then(|rule_config| rule_config.config.as_ref())
            .map(|policy| serde_yaml::from_value::<T>(serde_yaml::Value::Mapping(policy.clone())))
            .transpose()?)
    }
}
