//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{ReferenceValue, SuboptimalityMode};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// rphtrace - convergence traces for progressive hedging experiments
///
/// Reads the JSON results written by an experiment run and produces the
/// chart data for suboptimality vs. scenarios treated, suboptimality vs.
/// time, and the min/max envelope across seeds.
///
/// Examples:
///   rphtrace --input results/run.json
///   rphtrace --input results/ --output-dir Figs --mode absolute
///   rphtrace --input run.json --algorithms randomized_sync,randomized_async
///   rphtrace --input run.json --dry-run
///   rphtrace --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Results file, or directory of results files, to aggregate
    #[arg(
        short,
        long,
        value_name = "PATH",
        env = "RPHTRACE_INPUT",
        required_unless_present = "init_config"
    )]
    pub input: Option<PathBuf>,

    /// Directory to write chart data and the summary to
    ///
    /// Default: from config or "Figs".
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .rphtrace.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Suboptimality mode (signed, absolute)
    #[arg(long, value_name = "MODE")]
    pub mode: Option<SuboptimalityMode>,

    /// Reference objective value (recorded, best-observed)
    #[arg(long, value_name = "REF")]
    pub reference: Option<ReferenceValue>,

    /// Algorithms to chart (comma-separated)
    ///
    /// Example: --algorithms progressivehedging,randomized_sync
    #[arg(long, value_name = "KEYS", value_delimiter = ',')]
    pub algorithms: Option<Vec<String>>,

    /// Problems to chart (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub problems: Option<Vec<String>>,

    /// Summary report format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<SummaryFormat>,

    /// Abort on the first series that cannot be produced
    #[arg(long)]
    pub strict: bool,

    /// Only chart algorithms listed in the config file
    #[arg(long)]
    pub no_discover: bool,

    /// Exit with code 2 if any series was skipped
    #[arg(long, conflicts_with = "strict")]
    pub fail_on_skip: bool,

    /// Dry run: list problems, algorithms and runs without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .rphtrace.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the summary report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl SummaryFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            SummaryFormat::Markdown => "summary.md",
            SummaryFormat::Json => "summary.json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref input) = self.input else {
            return Err("An input results file or directory is required".to_string());
        };

        if !input.exists() {
            return Err(format!("Input path does not exist: {}", input.display()));
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref algorithms) = self.algorithms {
            if algorithms.iter().any(|a| a.trim().is_empty()) {
                return Err("Algorithm keys must not be empty".to_string());
            }
        }

        if let Some(ref problems) = self.problems {
            if problems.iter().any(|p| p.trim().is_empty()) {
                return Err("Problem names must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
