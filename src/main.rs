//! rphtrace - convergence traces for progressive hedging experiments
//!
//! A CLI tool that reads the JSON results written by an experiment run,
//! normalizes each algorithm's objective values into suboptimality, and
//! writes the chart data (vs. scenarios treated, vs. time, and the seed
//! envelope) for an external plotting layer.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad input, config, strict-mode failure, write failure)
//!   2 - Series were skipped and --fail-on-skip was set

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod scanner;
mod store;

use analysis::{build_problem, select_problems, AggregationSettings};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{ReportMetadata, SkippedSeries, SummaryReport};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("rphtrace v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Aggregation failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .rphtrace.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize algorithms, strides, and output location.");
    Ok(())
}

/// Initialize logging based on verbosity settings. `RUST_LOG` wins when set.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().as_str().to_ascii_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// A results file to process and where its outputs go.
#[derive(Debug)]
struct InputFile {
    path: PathBuf,
    output_dir: PathBuf,
}

/// What processing one results file produced.
struct FileResult {
    charts: usize,
    skipped: usize,
    summary_path: PathBuf,
}

/// Run the aggregation workflow. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    let settings = AggregationSettings::from(&config);

    let input = args
        .input
        .clone()
        .context("An input results file or directory is required")?;
    let output_dir = PathBuf::from(&config.general.output_dir);

    let inputs = collect_inputs(&input, &output_dir, &config)?;
    if inputs.is_empty() {
        println!("⚠️  No results files found under {}", input.display());
        return Ok(0);
    }

    if args.dry_run {
        let paths: Vec<PathBuf> = inputs.iter().map(|f| f.path.clone()).collect();
        for line in report::dry_run_listing(&paths, &settings).await? {
            println!("{}", line);
        }
        println!("\n✅ Dry run complete. Nothing was written.");
        return Ok(0);
    }

    println!("📊 Aggregating {} results file(s)", inputs.len());
    println!("   Mode: {} (reference: {})", settings.mode, settings.reference);
    println!("   Output: {}", output_dir.display());

    let mut charts = 0;
    let mut skipped = 0;

    for file in &inputs {
        let result = process_file(file, &config, &settings, !args.quiet).await?;
        println!(
            "   📄 {}: {} chart(s), summary at {}",
            file.path.display(),
            result.charts,
            result.summary_path.display()
        );
        charts += result.charts;
        skipped += result.skipped;
    }

    println!("\n✅ Done. {} chart document(s) written.", charts);
    if skipped > 0 {
        println!("   ⚠️  {} series skipped (see summary)", skipped);
    }

    if args.fail_on_skip && skipped > 0 {
        eprintln!("\n⛔ {} series could not be produced. Failing (exit code 2).", skipped);
        return Ok(2);
    }

    Ok(0)
}

/// Aggregate one results file and write its charts and summary.
async fn process_file(
    file: &InputFile,
    config: &Config,
    settings: &AggregationSettings,
    show_progress: bool,
) -> Result<FileResult> {
    let start_time = Instant::now();
    let store = store::load_store(&file.path).await?;
    let problems = select_problems(&store, settings);

    let progress = if show_progress {
        let pb = ProgressBar::new(problems.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut outcomes = Vec::new();
    let mut problem_skips = Vec::new();

    for problem in &problems {
        if let Some(ref pb) = progress {
            pb.set_message(problem.clone());
        }

        match build_problem(&store, problem, settings) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) if !settings.strict => {
                warn!(problem = %problem, "Skipping problem: {}", e);
                problem_skips.push(SkippedSeries {
                    problem: problem.clone(),
                    algorithm: None,
                    chart: None,
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!(
                    "Failed to aggregate problem {} from {}",
                    problem,
                    file.path.display()
                )));
            }
        }

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let charts = report::write_charts(&file.output_dir, &outcomes).await?;

    let metadata = ReportMetadata {
        input: file.path.display().to_string(),
        generated_at: Utc::now(),
        mode: settings.mode,
        reference: settings.reference,
        nstages: store.nstages,
        nscenarios: store.nscenarios,
        nworkers: store.nworkers,
        problems: outcomes.len(),
        charts_written: charts,
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let summary = SummaryReport::from_outcomes(metadata, &outcomes, problem_skips);

    let summary_path =
        report::write_summary(&file.output_dir, &summary, config.general.summary_format).await?;
    info!("Summary written to {}", summary_path.display());

    Ok(FileResult {
        charts,
        skipped: summary.skipped.len(),
        summary_path,
    })
}

/// Resolve the input path into results files. A directory is scanned and
/// each file gets its own output subdirectory.
fn collect_inputs(input: &Path, output_dir: &Path, config: &Config) -> Result<Vec<InputFile>> {
    if !input.is_dir() {
        return Ok(vec![InputFile {
            path: input.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
        }]);
    }

    let scan_config = scanner::ScanConfig::from(&config.scanner);
    let files = scanner::ResultsScanner::new(input.to_path_buf(), scan_config)
        .scan()
        .with_context(|| format!("Failed to scan results directory: {}", input.display()))?;

    info!("Found {} results file(s) in {}", files.len(), input.display());

    let keys = unique_output_keys(files.iter().map(|f| f.output_key()));

    Ok(files
        .into_iter()
        .zip(keys)
        .map(|(f, key)| {
            debug!("Queued {} ({} bytes) into {}", f.relative, f.size, key);
            InputFile {
                output_dir: output_dir.join(key),
                path: f.path,
            }
        })
        .collect())
}

/// Make output subdirectory names unique. A repeated key gets a `-2`,
/// `-3`, ... suffix, skipping any name already taken.
fn unique_output_keys(keys: impl IntoIterator<Item = String>) -> Vec<String> {
    let keys: Vec<String> = keys.into_iter().collect();
    let mut taken: HashMap<String, usize> = HashMap::new();
    for key in &keys {
        taken.entry(key.clone()).or_insert(0);
    }

    keys.into_iter()
        .map(|key| {
            let uses = taken.get(&key).copied().unwrap_or(0);
            taken.insert(key.clone(), uses + 1);
            if uses == 0 {
                return key;
            }

            let mut n = uses + 1;
            loop {
                let candidate = format!("{}-{}", key, n);
                if !taken.contains_key(&candidate) {
                    warn!("Output directory {} is shared, using {}", key, candidate);
                    taken.insert(candidate.clone(), 1);
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
