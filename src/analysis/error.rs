//! Aggregation failures.

use thiserror::Error;

/// Why a series could not be aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// A problem, algorithm, run or attribute is absent from the store.
    #[error("missing key `{key}` in {scope}")]
    MissingKey { scope: String, key: String },

    /// The reference objective value is zero.
    #[error("reference objective value is zero, suboptimality is undefined")]
    DivisionByZero,

    /// Objective and time samples of one run are not index-aligned.
    #[error("run `{run}` has {values} objective samples but {times} time samples")]
    ShapeMismatch {
        run: String,
        values: usize,
        times: usize,
    },

    /// Nothing to aggregate.
    #[error("no runs to aggregate")]
    NoRuns,

    /// The problem's entry exists but could not be read.
    #[error("results for problem `{problem}` are malformed: {reason}")]
    Malformed { problem: String, reason: String },
}

impl AggregateError {
    pub fn missing(scope: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingKey {
            scope: scope.into(),
            key: key.into(),
        }
    }
}
