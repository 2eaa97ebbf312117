//! Plain-text output rendering.

use std::collections::{HashMap, hash_map::Entry};

use anstream::{eprintln, println};
use owo_colors::OwoColorize;

use crate::finding::{Finding, Severity, WorkflowLocation};
use crate::registry::{FindingRegistry, InputRegistry};

pub(crate) fn render_findings(registry: &InputRegistry, findings: &FindingRegistry) {
    for finding in findings.findings() {
        render_finding(finding);
        println!();
    }

    if findings.findings().is_empty() {
        if findings.ignored().is_empty() {
            println!("{}", "No findings to report. Good job!".green());
        } else {
            println!(
                "{no_findings} ({nignored} ignored)",
                no_findings = "No findings to report. Good job!".green(),
                nignored = findings.ignored().len().bright_yellow(),
            );
        }
    } else {
        let mut findings_by_severity = HashMap::new();

        for finding in findings.findings() {
            match findings_by_severity.entry(&finding.determinations.severity) {
                Entry::Occupied(mut e) => {
                    *e.get_mut() += 1;
                }
                Entry::Vacant(e) => {
                    e.insert(1);
                }
            }
        }

        let nfindings = findings.count();
        if findings.ignored().is_empty() {
            print_summary_counts(nfindings, None, &findings_by_severity);
        } else {
            print_summary_counts(nfindings, Some(findings.ignored().len()), &findings_by_severity);
        }
    }

    render_errors(registry);
}

fn print_summary_counts(
    nfindings: usize,
    nignored: Option<usize>,
    findings_by_severity: &HashMap<&Severity, usize>,
) {
    let prefix = match nignored {
        Some(nignored) => format!(
            "{nfindings} findings ({nignored} ignored)",
            nfindings = nfindings.green(),
            nignored = nignored.bright_yellow(),
        ),
        None => format!(
            "{nfindings} finding{s}",
            nfindings = nfindings.green(),
            s = if nfindings == 1 { "" } else { "s" },
        ),
    };

    println!(
        "{prefix}: {ninformational} informational, {nlow} low, {nmedium} medium, {nhigh} high",
        ninformational = findings_by_severity
            .get(&Severity::Informational)
            .unwrap_or(&0)
            .purple(),
        nlow = findings_by_severity
            .get(&Severity::Low)
            .unwrap_or(&0)
            .cyan(),
        nmedium = findings_by_severity
            .get(&Severity::Medium)
            .unwrap_or(&0)
            .yellow(),
        nhigh = findings_by_severity
            .get(&Severity::High)
            .unwrap_or(&0)
            .red(),
    );
}

fn render_finding(finding: &Finding) {
    println!(
        "{ident} ({severity:?} severity, {confidence:?} confidence): {desc}",
        ident = finding.ident.bold(),
        severity = finding.determinations.severity,
        confidence = finding.determinations.confidence,
        desc = finding.desc,
    );

    for location in &finding.locations {
        println!("  {location}", location = render_location(location));
    }
}

fn render_location(location: &WorkflowLocation) -> String {
    let mut rendered = location.workflow.cyan().to_string();

    if let Some(job) = &location.job {
        rendered.push_str(&format!(", job {id}", id = job.id.bold()));

        if let Some(step) = &job.step {
            match step.name {
                Some(name) => rendered.push_str(&format!(", step {name:?}")),
                None => rendered.push_str(&format!(", step {index}", index = step.index)),
            }
        }
    }

    if let Some(annotation) = &location.annotation {
        rendered.push_str(&format!(": {annotation}"));
    }

    rendered
}

fn render_errors(registry: &InputRegistry) {
    for (path, err) in registry.errors() {
        eprintln!(
            "{warning}: couldn't audit {path}: {err:#}",
            warning = "warning".yellow(),
        );
    }
}
