//! Convergence trace aggregation.
//!
//! Pure transforms from raw run data to the sequences that get charted:
//! suboptimality normalization, checkpoint-to-calls conversion, seed
//! envelopes, and run-key resolution for seeded algorithms.

use super::error::AggregateError;
use crate::models::{Seeds, SuboptimalityMode, PRIMARY_RUN_KEY};

/// Per-index min/max band across seed runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Envelope {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Envelope {
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Width of the band at its last index.
    pub fn final_spread(&self) -> Option<f64> {
        band_spread(&self.lower, &self.upper)
    }
}

/// Width of a min/max band at its last index.
pub fn band_spread(lower: &[f64], upper: &[f64]) -> Option<f64> {
    match (lower.last(), upper.last()) {
        (Some(lo), Some(hi)) => Some(hi - lo),
        _ => None,
    }
}

/// Normalize objective values into suboptimality relative to `fopt`.
pub fn normalize(
    values: &[f64],
    fopt: f64,
    mode: SuboptimalityMode,
) -> Result<Vec<f64>, AggregateError> {
    if fopt == 0.0 {
        return Err(AggregateError::DivisionByZero);
    }

    let normalized = values.iter().map(|f| (f - fopt) / fopt);

    Ok(match mode {
        SuboptimalityMode::Signed => normalized.collect(),
        SuboptimalityMode::Absolute => normalized.map(f64::abs).collect(),
    })
}

/// Convert checkpoint indices `0..n` into call counts with the given stride.
///
/// `step` must be at least 1; algorithms without a stride use 1. Counts
/// saturate at `u64::MAX`.
pub fn index_to_calls(step: u64, n: usize) -> Vec<u64> {
    (0..n as u64).map(|i| i.saturating_mul(step)).collect()
}

/// Fold seed runs into a min/max envelope, truncated to the shortest run.
pub fn envelope<R: AsRef<[f64]>>(runs: &[R]) -> Result<Envelope, AggregateError> {
    let len = runs
        .iter()
        .map(|r| r.as_ref().len())
        .min()
        .ok_or(AggregateError::NoRuns)?;

    let mut env = Envelope {
        lower: Vec::with_capacity(len),
        upper: Vec::with_capacity(len),
    };

    for i in 0..len {
        let mut samples = runs.iter().map(|r| r.as_ref()[i]);
        // `runs` is non-empty past the `min()` above
        let first = samples.next().unwrap_or(f64::NAN);
        let (lo, hi) = samples.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        env.lower.push(lo);
        env.upper.push(hi);
    }

    Ok(env)
}

/// Run identifiers to read for an algorithm's `seeds` attribute.
///
/// A single seed always maps to run "1", never to the seed's own value.
pub fn seed_keys(seeds: &Seeds) -> Vec<String> {
    match seeds {
        Seeds::Single(_) => vec![PRIMARY_RUN_KEY.to_string()],
        Seeds::Many(values) => values.iter().map(|s| s.to_string()).collect(),
    }
}

/// Smallest finite objective value across runs, if any.
pub fn best_observed<'a, I>(runs: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    runs.into_iter()
        .flat_map(|r| r.iter().copied())
        .filter(|v| v.is_finite())
        .fold(None, |best: Option<f64>, v| {
            Some(best.map_or(v, |b| b.min(v)))
        })
}
