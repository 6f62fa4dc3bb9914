//! Dry-run listing.
//!
//! Describes what an aggregation would read, without building or writing
//! any series.

use crate::analysis::{seed_keys, select_problems, AggregationSettings, SeriesBuilder};
use crate::models::ResultsStore;
use crate::store::load_store;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Lines describing one results document: experiment sizes, then each
/// problem with its algorithms and their run keys and lengths.
pub fn dry_run_lines(
    path: &Path,
    store: &ResultsStore,
    settings: &AggregationSettings,
) -> Vec<String> {
    let mut lines = vec![format!("🔍 {}", path.display())];

    let sizes = [
        ("stages", store.nstages),
        ("scenarios", store.nscenarios),
        ("workers", store.nworkers),
    ];
    for (name, value) in sizes {
        if let Some(v) = value {
            lines.push(format!("   {}: {}", name, v));
        }
    }

    for problem in select_problems(store, settings) {
        let builder = match SeriesBuilder::new(store, &problem, settings) {
            Ok(b) => b,
            Err(e) => {
                lines.push(format!("   ❌ {}: {}", problem, e));
                continue;
            }
        };

        lines.push(format!("   📈 {}", problem));
        let Some(results) = store.problem(&problem) else {
            continue;
        };

        for algorithm in builder.algorithms() {
            let label = settings.algorithm_config(&algorithm).label;
            let Some(alg) = results.algorithm(&algorithm) else {
                lines.push(format!("      - {} ({}): missing", algorithm, label));
                continue;
            };

            let keys = match alg.seeds() {
                Some(seeds) => seed_keys(seeds),
                None => alg.runs.keys().cloned().collect(),
            };
            let runs: Vec<String> = keys
                .iter()
                .map(|key| match alg.run(key) {
                    Some(run) => format!("{} [{}]", key, run.len()),
                    None => format!("{} [missing]", key),
                })
                .collect();

            lines.push(format!("      - {} ({}): {}", algorithm, label, runs.join(", ")));
        }
    }

    lines
}

/// Load every input and list it. Reads only.
pub async fn dry_run_listing(
    inputs: &[PathBuf],
    settings: &AggregationSettings,
) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for path in inputs {
        let store = load_store(path).await?;
        lines.extend(dry_run_lines(path, &store, settings));
    }
    Ok(lines)
}
