//! Results document loading.
//!
//! The experiment writes one JSON document holding its sizes, the list of
//! problem names, and one entry per problem keyed by that name.

use crate::models::{ProblemResults, ResultsStore};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// The document as written, before problem entries are typed.
#[derive(Debug, Deserialize)]
struct RawStore {
    #[serde(default)]
    problem_names: Vec<String>,
    #[serde(default)]
    nstages: Option<u64>,
    #[serde(default)]
    nscenarios: Option<u64>,
    #[serde(default)]
    nworkers: Option<u64>,
    #[serde(flatten)]
    entries: BTreeMap<String, serde_json::Value>,
}

/// Parse a results document.
///
/// A listed problem with no entry is kept in the list so that lookups
/// report it missing. A problem entry that does not parse is kept too and
/// recorded in `rejected`, so it is reported instead of aborting the whole
/// document. Without `problem_names`, every object entry is a problem.
pub fn parse_store(content: &str) -> Result<ResultsStore> {
    let mut raw: RawStore =
        serde_json::from_str(content).context("Results document is not valid JSON")?;

    if raw.problem_names.is_empty() {
        raw.problem_names = raw
            .entries
            .iter()
            .filter(|(_, value)| value.is_object())
            .map(|(name, _)| name.clone())
            .collect();
        debug!("Discovered {} problem(s)", raw.problem_names.len());
    }

    let mut problems = BTreeMap::new();
    let mut rejected = BTreeMap::new();

    for name in &raw.problem_names {
        let Some(value) = raw.entries.remove(name) else {
            warn!(problem = %name, "Listed problem has no results");
            continue;
        };

        match serde_json::from_value::<ProblemResults>(value) {
            Ok(problem) => {
                problems.insert(name.clone(), problem);
            }
            Err(e) => {
                warn!(problem = %name, "Malformed results for problem: {}", e);
                rejected.insert(name.clone(), e.to_string());
            }
        }
    }

    Ok(ResultsStore {
        problem_names: raw.problem_names,
        nstages: raw.nstages,
        nscenarios: raw.nscenarios,
        nworkers: raw.nworkers,
        problems,
        rejected,
    })
}

/// Read and parse a results file.
pub async fn load_store(path: &Path) -> Result<ResultsStore> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read results file: {}", path.display()))?;

    let store = parse_store(&content)
        .with_context(|| format!("Failed to parse results file: {}", path.display()))?;

    info!(
        "Loaded {} problem(s) from {}",
        store.problems.len(),
        path.display()
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Seeds;
    use serde_json::json;
    use tempfile::TempDir;

    const FIXTURE: &str = include_str!("../../fixtures/results.json");

    #[test]
    fn test_parse_fixture() {
        let store = parse_store(FIXTURE).unwrap();

        assert_eq!(store.problem_names, vec!["hydrothermal"]);
        assert_eq!(store.nstages, Some(3));
        assert_eq!(store.nscenarios, Some(4));
        assert_eq!(store.nworkers, Some(2));

        let problem = store.problem("hydrothermal").unwrap();
        let ph = problem.algorithm("progressivehedging").unwrap();
        assert_eq!(ph.seeds(), Some(&Seeds::Single(7)));
        assert_eq!(ph.run("1").map(|r| r.len()), Some(4));

        let rph = problem.algorithm("randomized_sync").unwrap();
        assert_eq!(rph.runs.len(), 3);
        assert_eq!(rph.run("20").map(|r| r.len()), Some(4));
    }

    #[test]
    fn test_listed_problem_without_entry() {
        let content = json!({
            "problem_names": ["present", "absent"],
            "present": {}
        })
        .to_string();

        let store = parse_store(&content).unwrap();
        assert_eq!(store.problem_names, vec!["present", "absent"]);
        assert!(store.problem("present").is_some());
        assert!(store.problem("absent").is_none());
    }

    #[test]
    fn test_malformed_listed_problem() {
        let content = json!({
            "problem_names": ["pb", "ok"],
            "pb": {"alg": {"1": {"functionalvalue": "oops", "time": [], "fopt": 1.0}}},
            "ok": {"alg": {"seeds": 1, "1": {"functionalvalue": [1.0], "time": [0.0], "fopt": 1.0}}}
        })
        .to_string();

        let store = parse_store(&content).unwrap();
        assert_eq!(store.problem_names, vec!["pb", "ok"]);
        assert!(store.problem("pb").is_none());
        assert!(store.problem("ok").is_some());
        assert!(store.rejected["pb"].contains("invalid type"));
    }

    #[test]
    fn test_run_missing_attribute_still_parses() {
        let content = json!({
            "problem_names": ["pb"],
            "pb": {"alg": {"seeds": 1, "1": {"functionalvalue": [2.0], "time": [0.0]}}}
        })
        .to_string();

        let store = parse_store(&content).unwrap();
        let run = store
            .problem("pb")
            .and_then(|p| p.algorithm("alg"))
            .and_then(|a| a.run("1"));
        assert_eq!(run.map(|r| r.fopt), Some(None));
        assert!(store.rejected.is_empty());
    }

    #[test]
    fn test_problems_discovered_without_names() {
        let content = json!({
            "nscenarios": 10,
            "label": "not a problem",
            "pb2": {"alg": {"seeds": 1, "1": {"functionalvalue": [1.0], "time": [0.0], "fopt": 1.0}}},
            "pb1": {"alg": {"seeds": 1, "1": {"time": [0.0]}}},
            "broken": {"alg": {"1": 3}}
        })
        .to_string();

        let store = parse_store(&content).unwrap();
        assert_eq!(store.problem_names, vec!["broken", "pb1", "pb2"]);
        assert_eq!(store.nscenarios, Some(10));
        assert_eq!(store.problems.len(), 2);
        assert!(store.rejected.contains_key("broken"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(parse_store("{ not json").is_err());
    }

    #[test]
    fn test_load_store_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("results.json");
        std::fs::write(&path, FIXTURE).unwrap();

        let store = tokio_test::block_on(load_store(&path)).unwrap();
        assert_eq!(store.problems.len(), 1);

        let missing = tokio_test::block_on(load_store(&temp_dir.path().join("nope.json")));
        assert!(missing.is_err());
    }
}
