//! Summary report generation.
//!
//! This module renders the summary of an aggregation run as Markdown or
//! JSON, and chart data documents as JSON.

use crate::models::{
    AlgorithmSummary, Chart, ProblemOutcomeSummary, ReportMetadata, SkippedSeries, SummaryReport,
};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &SummaryReport) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Convergence Summary\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));

    for problem in &report.problems {
        output.push_str(&generate_problem_section(problem));
    }

    output.push_str(&generate_skipped_section(&report.skipped));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Results File:** `{}`\n", metadata.input));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Suboptimality:** {} (reference: {})\n",
        metadata.mode, metadata.reference
    ));

    let sizes: Vec<String> = [
        ("stages", metadata.nstages),
        ("scenarios", metadata.nscenarios),
        ("workers", metadata.nworkers),
    ]
    .iter()
    .filter_map(|(name, value)| value.map(|v| format!("{} {}", v, name)))
    .collect();
    if !sizes.is_empty() {
        section.push_str(&format!("- **Experiment:** {}\n", sizes.join(", ")));
    }

    section.push_str(&format!("- **Problems:** {}\n", metadata.problems));
    section.push_str(&format!("- **Charts Written:** {}\n", metadata.charts_written));
    section.push_str(&format!("- **Duration:** {:.2}s\n", metadata.duration_seconds));
    section.push('\n');

    section
}

fn anchor(name: &str) -> String {
    name.replace(['/', '.', ' ', '_'], "-").to_lowercase()
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &SummaryReport) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");

    for problem in &report.problems {
        toc.push_str(&format!("- [{}](#{})\n", problem.problem, anchor(&problem.problem)));
    }

    if !report.skipped.is_empty() {
        toc.push_str("- [Skipped Series](#skipped-series)\n");
    }

    toc.push('\n');

    toc
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4e}", v),
        None => "-".to_string(),
    }
}

/// Generate the section for one problem.
fn generate_problem_section(problem: &ProblemOutcomeSummary) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {} {{#{}}}\n\n", problem.problem, anchor(&problem.problem)));

    if problem.algorithms.is_empty() {
        section.push_str("No series were produced for this problem.\n\n");
        return section;
    }

    section.push_str(
        "| Algorithm | Runs | Checkpoints | Final | Best | Time (s) | Envelope | Final Spread |\n",
    );
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");

    for algorithm in &problem.algorithms {
        section.push_str(&generate_algorithm_row(algorithm));
    }
    section.push('\n');

    section
}

/// Generate a table row for one algorithm.
fn generate_algorithm_row(summary: &AlgorithmSummary) -> String {
    let elapsed = summary
        .elapsed_seconds
        .map(|t| format!("{:.2}", t))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "| {} (`{}`) | {} | {} | {} | {} | {} | {} | {} |\n",
        summary.label,
        summary.algorithm,
        summary.runs,
        summary.checkpoints,
        format_value(summary.final_suboptimality),
        format_value(summary.best_suboptimality),
        elapsed,
        summary.envelope_length,
        format_value(summary.final_spread),
    )
}

/// Generate the skipped series section.
fn generate_skipped_section(skipped: &[SkippedSeries]) -> String {
    if skipped.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Skipped Series\n\n");
    section.push_str("| Series | Reason |\n");
    section.push_str("|:---|:---|\n");

    for skip in skipped {
        section.push_str(&format!("| {} | {} |\n", skip.target(), skip.reason));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by rphtrace v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &SummaryReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate the JSON document for one chart.
pub fn generate_chart_json(chart: &Chart) -> Result<String> {
    serde_json::to_string_pretty(chart).map_err(Into::into)
}
