//! Results directory scanner.
//!
//! This module discovers results documents under a directory, respecting
//! configuration for extensions, excludes, and file size limits.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Configuration for results scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["json"])
    pub extensions: Vec<String>,
    /// Names to exclude (e.g., ["Figs", "target"])
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: u64,
    /// Maximum number of files to return
    pub max_files: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from(&crate::config::ScannerConfig::default())
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
            max_files: Some(config.max_files),
        }
    }
}

/// A results file found by the scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Path relative to the scanned directory
    pub relative: String,
    /// File size in bytes
    pub size: u64,
}

impl ScannedFile {
    /// Name of the output subdirectory for this file: the relative path
    /// without extension, separators flattened to underscores.
    pub fn output_key(&self) -> String {
        let without_ext = Path::new(&self.relative).with_extension("");
        without_ext
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Scanner for discovering results files.
pub struct ResultsScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl ResultsScanner {
    /// Create a new scanner rooted at a results directory.
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Scan for all matching files, sorted by path.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.root.is_dir() {
            return Err(anyhow!("Not a directory: {}", self.root.display()));
        }

        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded(e));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Cannot read entry under {}: {}", self.root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    debug!("Cannot stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            if size > self.config.max_file_size {
                debug!(
                    "Skipping {} ({} bytes exceeds limit)",
                    entry.path().display(),
                    size
                );
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();

            files.push(ScannedFile {
                path: entry.path().to_path_buf(),
                relative,
                size,
            });

            if let Some(max) = self.config.max_files {
                if files.len() >= max {
                    break;
                }
            }
        }

        Ok(files)
    }

    /// Check if a file has one of the configured extensions.
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.config
            .extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    /// Check if an entry matches exclusion patterns.
    fn is_excluded(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();

        // Hidden files
        if name.starts_with('.') {
            return true;
        }

        self.config.excludes.iter().any(|pattern| name == pattern.as_str())
    }
}
