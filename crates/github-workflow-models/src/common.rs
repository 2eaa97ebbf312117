//! Shared models and deserialization helpers.

use std::fmt::{self, Display};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

/// An environment mapping, also used for `with:` parameter maps.
pub type Env = IndexMap<String, EnvValue>;

/// Environment variable and `with:` parameter values are always strings,
/// but GitHub Actions allows users to write them as various native YAML
/// types before internal stringification.
///
/// The raw text of string values is preserved verbatim; no trimming or
/// other normalization is applied.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum EnvValue {
    // Missing values are empty strings.
    #[serde(deserialize_with = "null_to_default")]
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// An `if:` condition on a job or step.
///
/// These are either booleans or bare (i.e. non-curly) expressions;
/// expression text is kept exactly as written.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum If {
    Bool(bool),
    Expr(String),
}

impl If {
    /// The condition's expression text, if it is an expression.
    pub fn as_expr(&self) -> Option<&str> {
        match self {
            If::Bool(_) => None,
            If::Expr(expr) => Some(expr),
        }
    }
}

/// A "scalar or vector" type, for places where a key can have either a
/// single value or an array of values (e.g. a trigger's `types:`).
#[derive(Deserialize, Debug, PartialEq)]
#[serde(untagged)]
enum SoV<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<SoV<T>> for Vec<T> {
    fn from(val: SoV<T>) -> Vec<T> {
        match val {
            SoV::One(v) => vec![v],
            SoV::Many(vs) => vs,
        }
    }
}

pub(crate) fn opt_scalar_or_vector<'de, D, T>(de: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<SoV<T>>::deserialize(de)?.map(Into::into))
}

/// A bool or string, for places where GitHub Actions contextually
/// reinterprets a YAML boolean as a string, e.g. `run: true`.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(untagged)]
enum BoS {
    Bool(bool),
    String(String),
}

impl From<BoS> for String {
    fn from(value: BoS) -> Self {
        match value {
            BoS::Bool(b) => b.to_string(),
            BoS::String(s) => s,
        }
    }
}

pub(crate) fn opt_bool_is_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BoS>::deserialize(de)?.map(Into::into))
}

fn null_to_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let key = Option::<T>::deserialize(de)?;
    Ok(key.unwrap_or_default())
}

/// The error returned when a `uses:` clause fails to parse.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("malformed `uses` ref: {0}")]
pub struct UsesError(String);

/// A parsed `uses:` clause.
#[derive(Debug, PartialEq)]
pub enum Uses {
    /// A local `uses:` clause, e.g. `uses: ./foo/bar`.
    Local(String),

    /// A repository `uses:` clause, e.g. `uses: foo/bar@v1`.
    Repository(RepositoryUses),

    /// A Docker image `uses:` clause, e.g. `uses: docker://ubuntu`.
    Docker(String),
}

impl Uses {
    /// Parse a `uses:` clause into its appropriate variant.
    pub fn parse(uses: &str) -> Result<Self, UsesError> {
        if uses.starts_with("./") {
            Ok(Self::Local(uses.into()))
        } else if let Some(image) = uses.strip_prefix("docker://") {
            Ok(Self::Docker(image.into()))
        } else {
            RepositoryUses::parse(uses).map(Self::Repository)
        }
    }
}

/// A `uses: owner/repo[/subpath][@ref]` clause.
#[derive(Debug, PartialEq)]
pub struct RepositoryUses {
    /// The repo user or org.
    pub owner: String,
    /// The repo name.
    pub repo: String,
    /// The subpath to the action or reusable workflow, if present.
    pub subpath: Option<String>,
    /// The `@<ref>` that the `uses:` is pinned to, if present.
    pub git_ref: Option<String>,
}

impl Display for RepositoryUses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{owner}/{repo}", owner = self.owner, repo = self.repo)?;
        if let Some(subpath) = &self.subpath {
            write!(f, "/{subpath}")?;
        }
        if let Some(git_ref) = &self.git_ref {
            write!(f, "@{git_ref}")?;
        }
        Ok(())
    }
}

impl RepositoryUses {
    /// Parse a `uses: owner/repo` clause.
    ///
    /// Unlike GitHub Actions itself, this accepts a missing `@<ref>`,
    /// since the same syntax doubles as a match template.
    pub fn parse(uses: &str) -> Result<Self, UsesError> {
        // NOTE: Both git refs and paths can contain `@`, but in practice
        // GHA refuses to run a `uses:` clause with more than one `@` in it.
        let (path, git_ref) = match uses.rsplit_once('@') {
            Some((path, git_ref)) => (path, Some(git_ref)),
            None => (uses, None),
        };

        let mut components = path.splitn(3, '/');
        match (components.next(), components.next()) {
            (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
                Ok(RepositoryUses {
                    owner: owner.into(),
                    repo: repo.into(),
                    subpath: components.next().map(Into::into),
                    git_ref: git_ref.map(Into::into),
                })
            }
            _ => Err(UsesError(format!("owner/repo slug is too short: {uses}"))),
        }
    }

    /// Returns whether this `uses:` clause "matches" the given template.
    /// The template is itself formatted like a normal `uses:` clause.
    ///
    /// This is an asymmetrical match: `actions/checkout@v3` matches the
    /// `actions/checkout` template but not vice versa.
    ///
    /// Comparisons are case-insensitive, since GitHub's own APIs are
    /// insensitive.
    pub fn matches(&self, template: &str) -> bool {
        let Ok(template) = RepositoryUses::parse(template) else {
            return false;
        };

        self.owner.eq_ignore_ascii_case(&template.owner)
            && self.repo.eq_ignore_ascii_case(&template.repo)
            && self.subpath.as_ref().map(|s| s.to_lowercase())
                == template.subpath.as_ref().map(|s| s.to_lowercase())
            && template.git_ref.as_ref().is_none_or(|git_ref| {
                self.git_ref
                    .as_ref()
                    .is_some_and(|r| r.eq_ignore_ascii_case(git_ref))
            })
    }
}
