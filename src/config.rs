//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.rphtrace.toml` files.

use crate::cli::{Args, SummaryFormat};
use crate::models::{ReferenceValue, SuboptimalityMode};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".rphtrace.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Known algorithms, in chart order.
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<AlgorithmConfig>,

    /// Results directory scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            aggregation: AggregationConfig::default(),
            algorithms: default_algorithms(),
            scanner: ScannerConfig::default(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory chart documents and the summary are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Format of the summary report.
    #[serde(default)]
    pub summary_format: SummaryFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            summary_format: SummaryFormat::default(),
        }
    }
}

fn default_output_dir() -> String {
    "Figs".to_string()
}

/// How series are normalized and which ones are produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    #[serde(default)]
    pub mode: SuboptimalityMode,

    #[serde(default)]
    pub reference: ReferenceValue,

    /// Abort on the first series that cannot be produced.
    #[serde(default)]
    pub strict: bool,

    /// Chart every algorithm found under a problem, not only configured ones.
    #[serde(default = "default_true")]
    pub discover_algorithms: bool,

    /// Restrict processing to these problems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_problems: Option<Vec<String>>,

    /// Restrict processing to these algorithms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_algorithms: Option<Vec<String>>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            mode: SuboptimalityMode::default(),
            reference: ReferenceValue::default(),
            strict: false,
            discover_algorithms: true,
            only_problems: None,
            only_algorithms: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// How a checkpoint index converts into a number of scenarios treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stride {
    /// Plain checkpoint index.
    Identity,
    /// The run's `logstep`, or identity when it has none.
    #[default]
    Logstep,
    /// The experiment's `nscenarios` (one full pass per checkpoint).
    Scenarios,
    /// A fixed number of scenarios per checkpoint.
    Fixed(u64),
}

/// Display settings for one algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    /// Key of the algorithm in the results document.
    pub key: String,

    /// Legend label.
    pub label: String,

    #[serde(default)]
    pub stride: Stride,
}

impl AlgorithmConfig {
    fn new(key: &str, label: &str, stride: Stride) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            stride,
        }
    }
}

fn default_algorithms() -> Vec<AlgorithmConfig> {
    vec![
        AlgorithmConfig::new("progressivehedging", "Progressive Hedging", Stride::Scenarios),
        AlgorithmConfig::new(
            "randomized_sync",
            "Randomized Progressive Hedging",
            Stride::Logstep,
        ),
        AlgorithmConfig::new(
            "randomized_async",
            "Asynchronous Randomized Progressive Hedging",
            Stride::Logstep,
        ),
    ]
}

/// Results directory scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum results files to process.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// File extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory or file names to exclude.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            extensions: default_extensions(),
            excludes: default_excludes(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_files() -> usize {
    100
}

fn default_extensions() -> Vec<String> {
    vec!["json".to_string()]
}

fn default_excludes() -> Vec<String> {
    vec!["Figs", "Tex", "target", "__pycache__"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_file_size() -> u64 {
    512 * 1024 * 1024 // long runs log a lot of checkpoints
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check settings serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for algorithm in &self.algorithms {
            if !seen.insert(algorithm.key.as_str()) {
                bail!("Duplicate algorithm key: {}", algorithm.key);
            }
            if algorithm.stride == Stride::Fixed(0) {
                bail!("Fixed stride for {} must be at least 1", algorithm.key);
            }
        }

        if self.scanner.extensions.is_empty() {
            bail!("Scanner needs at least one file extension");
        }

        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = output_dir.to_string_lossy().to_string();
        }
        if let Some(format) = args.format {
            self.general.summary_format = format;
        }

        if let Some(mode) = args.mode {
            self.aggregation.mode = mode;
        }
        if let Some(reference) = args.reference {
            self.aggregation.reference = reference;
        }

        if let Some(ref problems) = args.problems {
            self.aggregation.only_problems = Some(problems.clone());
        }
        if let Some(ref algorithms) = args.algorithms {
            self.aggregation.only_algorithms = Some(algorithms.clone());
        }

        // Flags always override
        if args.strict {
            self.aggregation.strict = true;
        }
        if args.no_discover {
            self.aggregation.discover_algorithms = false;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
