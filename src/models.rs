//! Data models for results aggregation.
//!
//! This module contains the shapes of the experiment results document
//! (store, algorithm entries, run records) and the chart data and summary
//! structures produced from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key under which a single-seed algorithm stores its only run.
pub const PRIMARY_RUN_KEY: &str = "1";

/// How a raw objective value is turned into suboptimality.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SuboptimalityMode {
    /// `(f - fopt) / fopt`
    #[default]
    Signed,
    /// `|(f - fopt) / fopt|`
    Absolute,
}

impl fmt::Display for SuboptimalityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuboptimalityMode::Signed => write!(f, "signed"),
            SuboptimalityMode::Absolute => write!(f, "absolute"),
        }
    }
}

/// Which objective value serves as the optimum when normalizing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceValue {
    /// The `fopt` recorded in the algorithm's primary run.
    #[default]
    Recorded,
    /// The smallest objective value seen across the problem's selected runs.
    BestObserved,
}

impl fmt::Display for ReferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceValue::Recorded => write!(f, "recorded"),
            ReferenceValue::BestObserved => write!(f, "best-observed"),
        }
    }
}

/// The `seeds` attribute: one seed, or the list of seeds that were run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seeds {
    Single(i64),
    Many(Vec<i64>),
}

impl Seeds {
    /// Number of runs the attribute describes.
    pub fn run_count(&self) -> usize {
        match self {
            Seeds::Single(_) => 1,
            Seeds::Many(seeds) => seeds.len(),
        }
    }
}

/// One execution of an algorithm under one seed.
///
/// Every attribute is optional at parse time so that one incomplete run
/// only costs the series that read it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Objective value at each logged checkpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functionalvalue: Option<Vec<f64>>,
    /// Elapsed seconds at each checkpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Vec<f64>>,
    /// Reference optimal (or best-known) objective value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fopt: Option<f64>,
    /// Stride between checkpoints, in scenarios treated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logstep: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeds: Option<Seeds>,
}

impl RunRecord {
    /// Number of logged checkpoints; zero when no objective values were recorded.
    pub fn len(&self) -> usize {
        self.functionalvalue.as_ref().map_or(0, Vec::len)
    }
}

/// One algorithm's entry under a problem: the seeds it ran with and a run
/// record per run identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeds: Option<Seeds>,
    #[serde(flatten)]
    pub runs: BTreeMap<String, RunRecord>,
}

impl AlgorithmResults {
    /// Look up a run by identifier.
    pub fn run(&self, key: &str) -> Option<&RunRecord> {
        self.runs.get(key)
    }

    /// The algorithm-level seeds, falling back to those recorded in run "1".
    pub fn seeds(&self) -> Option<&Seeds> {
        self.seeds.as_ref().or_else(|| {
            self.runs
                .get(PRIMARY_RUN_KEY)
                .and_then(|run| run.seeds.as_ref())
        })
    }
}

/// All algorithms run on one problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemResults {
    pub algorithms: BTreeMap<String, AlgorithmResults>,
}

impl ProblemResults {
    pub fn algorithm(&self, key: &str) -> Option<&AlgorithmResults> {
        self.algorithms.get(key)
    }
}

/// The parsed results document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultsStore {
    /// Problem keys in the order the experiment listed them.
    pub problem_names: Vec<String>,
    pub nstages: Option<u64>,
    pub nscenarios: Option<u64>,
    pub nworkers: Option<u64>,
    pub problems: BTreeMap<String, ProblemResults>,
    /// Problem entries that could not be read, with the parse error.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rejected: BTreeMap<String, String>,
}

impl ResultsStore {
    pub fn problem(&self, name: &str) -> Option<&ProblemResults> {
        self.problems.get(name)
    }
}

/// The three comparison charts produced per problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Suboptimality vs. number of scenarios treated.
    SuboptCalls,
    /// Suboptimality vs. wall-clock time.
    SuboptTime,
    /// Min/max envelope across seeds vs. number of scenarios treated.
    SuboptFillCalls,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [
        ChartKind::SuboptCalls,
        ChartKind::SuboptTime,
        ChartKind::SuboptFillCalls,
    ];

    /// Output file name prefix; the problem name is appended.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            ChartKind::SuboptCalls => "Subopt_Calls",
            ChartKind::SuboptTime => "Subopt_Time",
            ChartKind::SuboptFillCalls => "SuboptFill_Calls",
        }
    }

    pub fn x_label(&self) -> &'static str {
        match self {
            ChartKind::SuboptCalls | ChartKind::SuboptFillCalls => "Number of scenarios treated",
            ChartKind::SuboptTime => "Time (s)",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_prefix())
    }
}

/// A single suboptimality curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSeries {
    pub algorithm: String,
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// A min/max band across seed runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandSeries {
    pub algorithm: String,
    pub label: String,
    pub x: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChartSeries {
    Line(LineSeries),
    Band(BandSeries),
}

impl ChartSeries {
    pub fn algorithm(&self) -> &str {
        match self {
            ChartSeries::Line(line) => &line.algorithm,
            ChartSeries::Band(band) => &band.algorithm,
        }
    }
}

/// Everything an external charting layer needs to draw one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub kind: ChartKind,
    pub problem: String,
    pub x_label: String,
    pub y_label: String,
    /// Suboptimality is drawn on a log axis with non-positive values clipped.
    pub log_y: bool,
    pub series: Vec<ChartSeries>,
}

impl Chart {
    /// Creates an empty chart of the given kind for a problem.
    pub fn new(kind: ChartKind, problem: &str) -> Self {
        Self {
            kind,
            problem: problem.to_string(),
            x_label: kind.x_label().to_string(),
            y_label: "Suboptimality".to_string(),
            log_y: true,
            series: Vec::new(),
        }
    }

    /// File name the chart document is written under.
    pub fn file_name(&self) -> String {
        format!("{}{}.json", self.kind.file_prefix(), self.problem)
    }
}

/// A series that could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSeries {
    pub problem: String,
    /// `None` when the whole problem was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartKind>,
    pub reason: String,
}

impl SkippedSeries {
    /// Returns a short description of what was skipped.
    pub fn target(&self) -> String {
        match (&self.algorithm, self.chart) {
            (Some(algorithm), Some(chart)) => format!("{} / {} / {}", self.problem, algorithm, chart),
            (Some(algorithm), None) => format!("{} / {}", self.problem, algorithm),
            _ => self.problem.clone(),
        }
    }
}

/// Headline numbers for one algorithm on one problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmSummary {
    pub algorithm: String,
    pub label: String,
    /// Number of seed runs listed for the algorithm.
    pub runs: usize,
    /// Checkpoints logged by the primary run.
    pub checkpoints: usize,
    pub final_suboptimality: Option<f64>,
    pub best_suboptimality: Option<f64>,
    pub elapsed_seconds: Option<f64>,
    /// Length of the seed envelope after truncation to the shortest run.
    pub envelope_length: usize,
    /// `upper - lower` at the last envelope index.
    pub final_spread: Option<f64>,
}

/// Everything produced for one problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemOutcome {
    pub problem: String,
    pub charts: Vec<Chart>,
    pub summaries: Vec<AlgorithmSummary>,
    pub skipped: Vec<SkippedSeries>,
}

impl ProblemOutcome {
    pub fn new(problem: &str) -> Self {
        Self {
            problem: problem.to_string(),
            charts: ChartKind::ALL
                .iter()
                .map(|kind| Chart::new(*kind, problem))
                .collect(),
            summaries: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn chart(&self, kind: ChartKind) -> Option<&Chart> {
        self.charts.iter().find(|c| c.kind == kind)
    }

    pub fn chart_mut(&mut self, kind: ChartKind) -> Option<&mut Chart> {
        self.charts.iter_mut().find(|c| c.kind == kind)
    }
}

/// Metadata about the summary report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Results file the report was built from.
    pub input: String,
    pub generated_at: DateTime<Utc>,
    pub mode: SuboptimalityMode,
    pub reference: ReferenceValue,
    pub nstages: Option<u64>,
    pub nscenarios: Option<u64>,
    pub nworkers: Option<u64>,
    pub problems: usize,
    pub charts_written: usize,
    pub duration_seconds: f64,
}

/// The summary report written next to the chart documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub metadata: ReportMetadata,
    pub problems: Vec<ProblemOutcomeSummary>,
    pub skipped: Vec<SkippedSeries>,
}

/// Per-problem section of the summary report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemOutcomeSummary {
    pub problem: String,
    pub algorithms: Vec<AlgorithmSummary>,
}

impl SummaryReport {
    /// Builds the report from the outcomes of every processed problem.
    pub fn from_outcomes(
        metadata: ReportMetadata,
        outcomes: &[ProblemOutcome],
        problem_skips: Vec<SkippedSeries>,
    ) -> Self {
        let mut skipped = problem_skips;
        skipped.extend(outcomes.iter().flat_map(|o| o.skipped.iter().cloned()));

        Self {
            metadata,
            problems: outcomes
                .iter()
                .map(|o| ProblemOutcomeSummary {
                    problem: o.problem.clone(),
                    algorithms: o.summaries.clone(),
                })
                .collect(),
            skipped,
        }
    }
}
