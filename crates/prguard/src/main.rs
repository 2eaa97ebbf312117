use std::io::stdout;
use std::process::ExitCode;

use anstream::eprintln;
use anyhow::{Context, Result, anyhow};
use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::InfoLevel;
use owo_colors::OwoColorize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use crate::audit::{Audit as _, AuditCore as _, AuditLoadError};
use crate::config::Config;
use crate::finding::{Confidence, Severity};
use crate::registry::{AuditRegistry, FindingRegistry, InputRegistry};
use crate::state::AuditState;

mod audit;
mod config;
mod finding;
mod models;
mod registry;
mod render;
mod state;

/// Detects unsafe checkouts of untrusted pull requests in GitHub Actions
/// workflows.
#[derive(Parser)]
#[command(about, version)]
struct App {
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity<InfoLevel>,

    /// The output format to emit. By default, plain text will be emitted.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// The configuration file to load. By default, any config will be
    /// discovered relative to $CWD.
    #[arg(short, long, group = "conf")]
    config: Option<Utf8PathBuf>,

    /// Disable all configuration loading.
    #[arg(long, group = "conf")]
    no_config: bool,

    /// Disable all exit codes besides success and tool failure.
    #[arg(long)]
    no_exit_codes: bool,

    /// Filter all results below the given severity.
    #[arg(long, value_enum)]
    min_severity: Option<Severity>,

    /// Filter all results below the given confidence.
    #[arg(long, value_enum)]
    min_confidence: Option<Confidence>,

    /// The workflow filenames or directories to audit.
    #[arg(required = true)]
    inputs: Vec<Utf8PathBuf>,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub(crate) enum OutputFormat {
    Plain,
    Json,
}

/// Collects individual workflow files from the given input, which is
/// either a workflow file itself or a directory containing workflows
/// (directly, or under `.github/workflows`).
fn collect_from_input(input: &Utf8PathBuf, workflow_paths: &mut Vec<Utf8PathBuf>) -> Result<()> {
    if input.is_file() {
        workflow_paths.push(input.clone());
        return Ok(());
    }

    if !input.is_dir() {
        return Err(anyhow!(
            "input malformed, expected file or directory: {input}"
        ));
    }

    let mut absolute = input
        .canonicalize_utf8()
        .with_context(|| format!("couldn't canonicalize {input}"))?;
    if !absolute.ends_with(".github/workflows") && absolute.join(".github/workflows").is_dir() {
        absolute.push(".github/workflows");
    }

    tracing::debug!("collecting workflows from {absolute}");

    for entry in absolute
        .read_dir_utf8()
        .with_context(|| format!("couldn't list {absolute}"))?
    {
        let workflow_path = entry?.into_path();
        match workflow_path.extension() {
            Some("yml" | "yaml") => workflow_paths.push(workflow_path),
            _ => continue,
        }
    }

    Ok(())
}

fn run() -> Result<ExitCode> {
    human_panic::setup_panic!();

    let app = App::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(app.verbose.tracing_level_filter().into())
        .from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();

    let mut workflow_paths = vec![];
    for input in &app.inputs {
        collect_from_input(input, &mut workflow_paths)?;
    }

    if workflow_paths.is_empty() {
        return Err(anyhow!(
            "no workflow files collected; empty or wrong directory?"
        ));
    }

    tracing::debug!(
        "collected workflows: {workflows:?}",
        workflows = workflow_paths
    );

    let config = Config::new(&app)?;
    let audit_state = AuditState::new(&config);

    let mut input_registry = InputRegistry::new();
    for workflow_path in &workflow_paths {
        input_registry.register_by_path(workflow_path);
    }

    let mut audit_registry = AuditRegistry::new();
    macro_rules! register_audit {
        ($rule:path) => {{
            // HACK: https://github.com/rust-lang/rust/issues/48067
            use $rule as base;
            match base::new(&audit_state) {
                Ok(audit) => audit_registry.register_audit(base::ident(), Box::new(audit)),
                Err(AuditLoadError::Skip(e)) => {
                    tracing::warn!("skipping {audit}: {e:#}", audit = base::ident())
                }
                Err(AuditLoadError::Fail(e)) => {
                    return Err(e.context(format!("couldn't load {audit}", audit = base::ident())))
                }
            }
        }};
    }

    register_audit!(audit::untrusted_checkout::UntrustedCheckout);

    tracing::debug!(
        "running {naudits} audit(s) across {ninputs} workflow(s)",
        naudits = audit_registry.len(),
        ninputs = input_registry.len()
    );

    let mut results = FindingRegistry::new(&app, &config);
    for (_, workflow) in input_registry.iter_workflows() {
        for (name, audit) in audit_registry.iter_audits() {
            results.extend(audit.audit(*name, workflow).with_context(|| {
                format!(
                    "{name} failed on {workflow}",
                    workflow = workflow.filename()
                )
            })?);
        }
    }

    match app.format.unwrap_or(OutputFormat::Plain) {
        OutputFormat::Plain => render::render_findings(&input_registry, &results),
        OutputFormat::Json => serde_json::to_writer_pretty(stdout(), &results.findings())?,
    };

    if app.no_exit_codes {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(results.into())
    }
}

fn main() -> ExitCode {
    // This is a little silly, but returning an ExitCode like this ensures
    // we always exit cleanly, rather than performing a hard process exit.
    match run() {
        Ok(exit) => exit,
        Err(err) => {
            eprintln!(
                "{fatal}: no audit was performed",
                fatal = "fatal".red().bold()
            );
            eprintln!("{err:?}");
            ExitCode::FAILURE
        }
    }
}
