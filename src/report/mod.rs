//! Report and chart data output.

pub mod dry_run;
pub mod generator;

pub use dry_run::dry_run_listing;
pub use generator::{generate_chart_json, generate_json_report, generate_markdown_report};

use crate::cli::SummaryFormat;
use crate::models::{ProblemOutcome, SummaryReport};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write every chart of the given outcomes into `dir`. Returns the number
/// of chart documents written.
pub async fn write_charts(dir: &Path, outcomes: &[ProblemOutcome]) -> Result<usize> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let mut written = 0;
    for chart in outcomes.iter().flat_map(|o| o.charts.iter()) {
        if chart.series.is_empty() {
            debug!("No series for {}, not writing", chart.file_name());
            continue;
        }

        let path = dir.join(chart.file_name());
        let content = generate_chart_json(chart)?;
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write chart data to {}", path.display()))?;
        written += 1;
    }

    Ok(written)
}

/// Write the summary report into `dir` and return its path.
pub async fn write_summary(
    dir: &Path,
    report: &SummaryReport,
    format: SummaryFormat,
) -> Result<PathBuf> {
    let content = match format {
        SummaryFormat::Json => generate_json_report(report)?,
        SummaryFormat::Markdown => generate_markdown_report(report),
    };

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let path = dir.join(format.file_name());
    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;

    Ok(path)
}
