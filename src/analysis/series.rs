//! Chart series construction.
//!
//! Every chart variant goes through [`SeriesBuilder`]: it resolves the
//! algorithms, runs, reference value and stride for one problem and feeds
//! them through the aggregation primitives.

use super::aggregator::{band_spread, best_observed, envelope, index_to_calls, normalize, seed_keys};
use super::error::AggregateError;
use crate::config::{AlgorithmConfig, Config, Stride};
use crate::models::{
    AlgorithmResults, AlgorithmSummary, BandSeries, ChartKind, ChartSeries, LineSeries,
    ProblemOutcome, ProblemResults, ReferenceValue, ResultsStore, RunRecord, SkippedSeries,
    SuboptimalityMode, PRIMARY_RUN_KEY,
};
use tracing::{debug, warn};

/// Settings that drive series construction.
#[derive(Debug, Clone)]
pub struct AggregationSettings {
    pub mode: SuboptimalityMode,
    pub reference: ReferenceValue,
    pub strict: bool,
    pub discover_algorithms: bool,
    pub algorithms: Vec<AlgorithmConfig>,
    pub only_problems: Option<Vec<String>>,
    pub only_algorithms: Option<Vec<String>>,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for AggregationSettings {
    fn from(config: &Config) -> Self {
        Self {
            mode: config.aggregation.mode,
            reference: config.aggregation.reference,
            strict: config.aggregation.strict,
            discover_algorithms: config.aggregation.discover_algorithms,
            algorithms: config.algorithms.clone(),
            only_problems: config.aggregation.only_problems.clone(),
            only_algorithms: config.aggregation.only_algorithms.clone(),
        }
    }
}

impl AggregationSettings {
    /// Display settings for an algorithm; unknown keys are labelled by key.
    pub fn algorithm_config(&self, key: &str) -> AlgorithmConfig {
        self.algorithms
            .iter()
            .find(|a| a.key == key)
            .cloned()
            .unwrap_or_else(|| AlgorithmConfig {
                key: key.to_string(),
                label: key.to_string(),
                stride: Stride::default(),
            })
    }
}

/// Problems to process, in experiment order unless restricted.
pub fn select_problems(store: &ResultsStore, settings: &AggregationSettings) -> Vec<String> {
    match settings.only_problems {
        Some(ref only) => only.clone(),
        None => store.problem_names.clone(),
    }
}

/// Builds chart series for a single problem.
pub struct SeriesBuilder<'a> {
    store: &'a ResultsStore,
    problem: &'a str,
    results: &'a ProblemResults,
    settings: &'a AggregationSettings,
    shared_reference: Option<f64>,
}

impl<'a> SeriesBuilder<'a> {
    /// Fails with `MissingKey` when the problem is absent from the store.
    pub fn new(
        store: &'a ResultsStore,
        problem: &'a str,
        settings: &'a AggregationSettings,
    ) -> Result<Self, AggregateError> {
        if let Some(reason) = store.rejected.get(problem) {
            return Err(AggregateError::Malformed {
                problem: problem.to_string(),
                reason: reason.clone(),
            });
        }

        let results = store
            .problem(problem)
            .ok_or_else(|| AggregateError::missing("results store", problem))?;

        let mut builder = Self {
            store,
            problem,
            results,
            settings,
            shared_reference: None,
        };

        if settings.reference == ReferenceValue::BestObserved {
            let selected = builder.algorithms();
            let samples = selected
                .iter()
                .filter_map(|key| results.algorithm(key))
                .flat_map(|alg| alg.runs.values())
                .filter_map(|run| run.functionalvalue.as_deref());
            builder.shared_reference = best_observed(samples);
            debug!(
                problem,
                reference = ?builder.shared_reference,
                "Best observed objective value"
            );
        }

        Ok(builder)
    }

    /// Algorithms to chart for this problem, in legend order.
    pub fn algorithms(&self) -> Vec<String> {
        if let Some(ref only) = self.settings.only_algorithms {
            return only.clone();
        }

        let mut selected: Vec<String> = self
            .settings
            .algorithms
            .iter()
            .map(|a| a.key.clone())
            .filter(|key| self.results.algorithms.contains_key(key))
            .collect();

        if self.settings.discover_algorithms {
            let discovered: Vec<String> = self
                .results
                .algorithms
                .keys()
                .filter(|key| !selected.contains(key))
                .cloned()
                .collect();
            selected.extend(discovered);
        }

        selected
    }

    /// Number of seed runs listed for an algorithm.
    pub fn run_count(&self, algorithm: &str) -> usize {
        self.results
            .algorithm(algorithm)
            .map(|alg| {
                alg.seeds()
                    .map(|s| s.run_count())
                    .unwrap_or(alg.runs.len())
            })
            .unwrap_or(0)
    }

    /// The objective value suboptimality is measured against.
    pub fn reference_value(&self, algorithm: &str) -> Result<f64, AggregateError> {
        match self.settings.reference {
            ReferenceValue::Recorded => {
                let results = self.algorithm(algorithm)?;
                let run = self.primary_run(algorithm, results)?;
                run.record.fopt.ok_or_else(|| {
                    AggregateError::missing(self.run_scope(algorithm, &run.key), "fopt")
                })
            }
            ReferenceValue::BestObserved => self.shared_reference.ok_or(AggregateError::NoRuns),
        }
    }

    /// Scenarios treated per checkpoint for an algorithm's run.
    pub fn stride(&self, algorithm: &str, run: &RunRecord) -> Result<u64, AggregateError> {
        let step = match self.settings.algorithm_config(algorithm).stride {
            Stride::Identity => 1,
            Stride::Logstep => match run.logstep {
                Some(step) if step > 0 => step,
                _ => {
                    debug!(problem = self.problem, algorithm, "No logstep, using plain index");
                    1
                }
            },
            Stride::Scenarios => self
                .store
                .nscenarios
                .filter(|n| *n > 0)
                .ok_or_else(|| AggregateError::missing("results store", "nscenarios"))?,
            Stride::Fixed(step) => step,
        };

        Ok(step)
    }

    /// Build the series of one chart kind for an algorithm.
    pub fn series(&self, kind: ChartKind, algorithm: &str) -> Result<ChartSeries, AggregateError> {
        match kind {
            ChartKind::SuboptCalls => self.calls_series(algorithm).map(ChartSeries::Line),
            ChartKind::SuboptTime => self.time_series(algorithm).map(ChartSeries::Line),
            ChartKind::SuboptFillCalls => self.envelope_series(algorithm).map(ChartSeries::Band),
        }
    }

    /// Suboptimality of the primary run against scenarios treated.
    pub fn calls_series(&self, algorithm: &str) -> Result<LineSeries, AggregateError> {
        let results = self.algorithm(algorithm)?;
        let run = self.primary_run(algorithm, results)?;
        let y = normalize(run.values, self.reference_value(algorithm)?, self.settings.mode)?;
        let step = self.stride(algorithm, run.record)?;

        Ok(LineSeries {
            algorithm: algorithm.to_string(),
            label: self.settings.algorithm_config(algorithm).label,
            x: calls_axis(step, y.len()),
            y,
        })
    }

    /// Suboptimality of the primary run against elapsed time.
    pub fn time_series(&self, algorithm: &str) -> Result<LineSeries, AggregateError> {
        let results = self.algorithm(algorithm)?;
        let run = self.primary_run(algorithm, results)?;
        let y = normalize(run.values, self.reference_value(algorithm)?, self.settings.mode)?;

        Ok(LineSeries {
            algorithm: algorithm.to_string(),
            label: self.settings.algorithm_config(algorithm).label,
            x: run.time.to_vec(),
            y,
        })
    }

    /// Min/max band of suboptimality across every seed run.
    pub fn envelope_series(&self, algorithm: &str) -> Result<BandSeries, AggregateError> {
        let results = self.algorithm(algorithm)?;
        let seeds = results
            .seeds()
            .ok_or_else(|| AggregateError::missing(self.algorithm_scope(algorithm), "seeds"))?;
        let fopt = self.reference_value(algorithm)?;

        let normalized = seed_keys(seeds)
            .iter()
            .map(|key| {
                let run = self.run(algorithm, results, key)?;
                normalize(run.values, fopt, self.settings.mode)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let env = envelope(&normalized)?;
        if normalized.iter().any(|r| r.len() > env.len()) {
            debug!(
                problem = self.problem,
                algorithm,
                length = env.len(),
                "Seed runs truncated to the shortest run"
            );
        }

        let step = self.stride(algorithm, self.primary_run(algorithm, results)?.record)?;
        debug!(
            problem = self.problem,
            algorithm,
            spread = ?env.final_spread(),
            "Envelope built"
        );

        Ok(BandSeries {
            algorithm: algorithm.to_string(),
            label: self.settings.algorithm_config(algorithm).label,
            x: calls_axis(step, env.len()),
            lower: env.lower,
            upper: env.upper,
        })
    }

    fn algorithm(&self, key: &str) -> Result<&'a AlgorithmResults, AggregateError> {
        self.results
            .algorithm(key)
            .ok_or_else(|| AggregateError::missing(format!("problem `{}`", self.problem), key))
    }

    fn algorithm_scope(&self, algorithm: &str) -> String {
        format!("algorithm `{}` of problem `{}`", algorithm, self.problem)
    }

    fn run_scope(&self, algorithm: &str, key: &str) -> String {
        format!("run `{}` of {}", key, self.algorithm_scope(algorithm))
    }

    /// Look up a run, check it carries both sample sequences and that they
    /// are aligned.
    fn run(
        &self,
        algorithm: &str,
        results: &'a AlgorithmResults,
        key: &str,
    ) -> Result<Trace<'a>, AggregateError> {
        let record = results
            .run(key)
            .ok_or_else(|| AggregateError::missing(self.algorithm_scope(algorithm), key))?;

        let scope = self.run_scope(algorithm, key);
        let values = record
            .functionalvalue
            .as_deref()
            .ok_or_else(|| AggregateError::missing(scope.as_str(), "functionalvalue"))?;
        let time = record
            .time
            .as_deref()
            .ok_or_else(|| AggregateError::missing(scope.as_str(), "time"))?;

        if values.len() != time.len() {
            return Err(AggregateError::ShapeMismatch {
                run: key.to_string(),
                values: values.len(),
                times: time.len(),
            });
        }

        Ok(Trace {
            key: key.to_string(),
            record,
            values,
            time,
        })
    }

    /// Run "1", or the first listed seed run present when there is none.
    fn primary_run(
        &self,
        algorithm: &str,
        results: &'a AlgorithmResults,
    ) -> Result<Trace<'a>, AggregateError> {
        if results.run(PRIMARY_RUN_KEY).is_none() {
            let fallback = results
                .seeds()
                .map(seed_keys)
                .and_then(|keys| keys.into_iter().find(|k| results.run(k).is_some()));

            if let Some(key) = fallback {
                return self.run(algorithm, results, &key);
            }
        }

        self.run(algorithm, results, PRIMARY_RUN_KEY)
    }
}

/// A run whose objective and time samples are present and aligned.
struct Trace<'a> {
    key: String,
    record: &'a RunRecord,
    values: &'a [f64],
    time: &'a [f64],
}

fn calls_axis(step: u64, n: usize) -> Vec<f64> {
    index_to_calls(step, n).into_iter().map(|c| c as f64).collect()
}

/// Fold a produced series into the algorithm's summary.
fn record(summary: &mut AlgorithmSummary, kind: ChartKind, series: &ChartSeries) {
    match (kind, series) {
        (ChartKind::SuboptCalls, ChartSeries::Line(line)) => {
            summary.checkpoints = line.y.len();
            summary.final_suboptimality = line.y.last().copied();
            summary.best_suboptimality = best_observed([line.y.as_slice()]);
        }
        (ChartKind::SuboptTime, ChartSeries::Line(line)) => {
            summary.elapsed_seconds = line.x.last().copied();
        }
        (ChartKind::SuboptFillCalls, ChartSeries::Band(band)) => {
            summary.envelope_length = band.lower.len();
            summary.final_spread = band_spread(&band.lower, &band.upper);
        }
        _ => {}
    }
}

/// Build every chart and summary for one problem.
///
/// In strict mode the first failing series is returned as the error;
/// otherwise it is logged and recorded as skipped.
pub fn build_problem(
    store: &ResultsStore,
    problem: &str,
    settings: &AggregationSettings,
) -> Result<ProblemOutcome, AggregateError> {
    let builder = SeriesBuilder::new(store, problem, settings)?;
    let mut outcome = ProblemOutcome::new(problem);

    for algorithm in builder.algorithms() {
        let mut summary = AlgorithmSummary {
            algorithm: algorithm.clone(),
            label: settings.algorithm_config(&algorithm).label,
            runs: builder.run_count(&algorithm),
            checkpoints: 0,
            final_suboptimality: None,
            best_suboptimality: None,
            elapsed_seconds: None,
            envelope_length: 0,
            final_spread: None,
        };
        let mut produced = false;

        for kind in ChartKind::ALL {
            match builder.series(kind, &algorithm) {
                Ok(series) => {
                    record(&mut summary, kind, &series);
                    if let Some(chart) = outcome.chart_mut(kind) {
                        chart.series.push(series);
                    }
                    produced = true;
                }
                Err(err) if settings.strict => return Err(err),
                Err(err) => {
                    warn!(
                        problem,
                        algorithm = %algorithm,
                        chart = %kind,
                        "Skipping series: {}",
                        err
                    );
                    outcome.skipped.push(SkippedSeries {
                        problem: problem.to_string(),
                        algorithm: Some(algorithm.clone()),
                        chart: Some(kind),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if produced {
            outcome.summaries.push(summary);
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::parse_store;
    use serde_json::json;

    const FIXTURE: &str = include_str!("../../fixtures/results.json");

    fn fixture() -> ResultsStore {
        parse_store(FIXTURE).unwrap()
    }

    fn store_from(value: serde_json::Value) -> ResultsStore {
        parse_store(&value.to_string()).unwrap()
    }

    fn line(outcome: &ProblemOutcome, kind: ChartKind, algorithm: &str) -> LineSeries {
        match outcome
            .chart(kind)
            .and_then(|c| c.series.iter().find(|s| s.algorithm() == algorithm))
        {
            Some(ChartSeries::Line(line)) => line.clone(),
            other => panic!("expected line series, got {:?}", other),
        }
    }

    fn band(outcome: &ProblemOutcome, algorithm: &str) -> BandSeries {
        match outcome
            .chart(ChartKind::SuboptFillCalls)
            .and_then(|c| c.series.iter().find(|s| s.algorithm() == algorithm))
        {
            Some(ChartSeries::Band(band)) => band.clone(),
            other => panic!("expected band series, got {:?}", other),
        }
    }

    #[test]
    fn test_calls_series_scales_by_scenarios() {
        let store = fixture();
        let settings = AggregationSettings::default();
        let outcome = build_problem(&store, "hydrothermal", &settings).unwrap();

        let ph = line(&outcome, ChartKind::SuboptCalls, "progressivehedging");
        assert_eq!(ph.label, "Progressive Hedging");
        assert_eq!(ph.x, vec![0.0, 4.0, 8.0, 12.0]);
        assert_eq!(ph.y, vec![1.0, 0.6, 0.0, 0.0]);
    }

    #[test]
    fn test_calls_series_uses_logstep() {
        let store = fixture();
        let settings = AggregationSettings::default();
        let outcome = build_problem(&store, "hydrothermal", &settings).unwrap();

        let rph = line(&outcome, ChartKind::SuboptCalls, "randomized_sync");
        assert_eq!(rph.x, vec![0.0, 2.0, 4.0]);
        assert_eq!(rph.y, vec![1.4, 0.8, 0.2]);
    }

    #[test]
    fn test_time_series_uses_run_time() {
        let store = fixture();
        let settings = AggregationSettings::default();
        let outcome = build_problem(&store, "hydrothermal", &settings).unwrap();

        let ph = line(&outcome, ChartKind::SuboptTime, "progressivehedging");
        assert_eq!(ph.x, vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(ph.y.len(), ph.x.len());
    }

    #[test]
    fn test_envelope_series_over_seed_runs() {
        let store = fixture();
        let settings = AggregationSettings::default();
        let outcome = build_problem(&store, "hydrothermal", &settings).unwrap();

        let rph = band(&outcome, "randomized_sync");
        assert_eq!(rph.lower, vec![0.8, 0.5, 0.1]);
        assert_eq!(rph.upper, vec![1.0, 0.5, 0.2]);
        assert_eq!(rph.x, vec![0.0, 2.0, 4.0]);

        // single seed reads run "1"
        let ph = band(&outcome, "progressivehedging");
        assert_eq!(ph.lower, ph.upper);
        assert_eq!(ph.lower, vec![1.0, 0.6, 0.0, 0.0]);
    }

    #[test]
    fn test_summaries() {
        let store = fixture();
        let settings = AggregationSettings::default();
        let outcome = build_problem(&store, "hydrothermal", &settings).unwrap();

        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.summaries.len(), 2);

        let rph = &outcome.summaries[1];
        assert_eq!(rph.algorithm, "randomized_sync");
        assert_eq!(rph.runs, 2);
        assert_eq!(rph.checkpoints, 3);
        assert_eq!(rph.final_suboptimality, Some(0.2));
        assert_eq!(rph.best_suboptimality, Some(0.2));
        assert_eq!(rph.elapsed_seconds, Some(0.4));
        assert_eq!(rph.envelope_length, 3);
        assert_eq!(rph.final_spread, Some(0.2 - 0.1));
    }

    #[test]
    fn test_algorithm_order_configured_then_discovered() {
        let store = store_from(json!({
            "problem_names": ["pb"],
            "pb": {
                "zeta": {"seeds": 1, "1": {"functionalvalue": [2.0], "time": [0.0], "fopt": 1.0}},
                "alpha": {"seeds": 1, "1": {"functionalvalue": [2.0], "time": [0.0], "fopt": 1.0}},
                "randomized_async": {"seeds": 1, "1": {"functionalvalue": [2.0], "time": [0.0], "fopt": 1.0}},
                "progressivehedging": {"seeds": 1, "1": {"functionalvalue": [2.0], "time": [0.0], "fopt": 1.0}}
            }
        }));

        let settings = AggregationSettings::default();
        let builder = SeriesBuilder::new(&store, "pb", &settings).unwrap();
        assert_eq!(
            builder.algorithms(),
            vec!["progressivehedging", "randomized_async", "alpha", "zeta"]
        );

        let mut settings = AggregationSettings::default();
        settings.discover_algorithms = false;
        let builder = SeriesBuilder::new(&store, "pb", &settings).unwrap();
        assert_eq!(builder.algorithms(), vec!["progressivehedging", "randomized_async"]);
    }

    #[test]
    fn test_missing_problem() {
        let store = fixture();
        let settings = AggregationSettings::default();
        let err = build_problem(&store, "unknown", &settings).unwrap_err();
        assert_eq!(err, AggregateError::missing("results store", "unknown"));
    }

    #[test]
    fn test_missing_algorithm_skipped_or_strict() {
        let store = fixture();
        let mut settings = AggregationSettings::default();
        settings.only_algorithms = Some(vec!["randomized_async".to_string()]);

        let outcome = build_problem(&store, "hydrothermal", &settings).unwrap();
        assert_eq!(outcome.skipped.len(), 3);
        assert!(outcome.summaries.is_empty());
        assert!(outcome.charts.iter().all(|c| c.series.is_empty()));
        assert!(outcome.skipped[0].reason.contains("randomized_async"));

        settings.strict = true;
        let err = build_problem(&store, "hydrothermal", &settings).unwrap_err();
        assert!(matches!(err, AggregateError::MissingKey { .. }));
    }

    #[test]
    fn test_missing_seed_run_only_skips_envelope() {
        let store = store_from(json!({
            "problem_names": ["pb"],
            "pb": {
                "randomized_sync": {
                    "seeds": [1, 2],
                    "1": {"functionalvalue": [4.0, 3.0], "time": [0.0, 1.0], "fopt": 2.0}
                }
            }
        }));

        let settings = AggregationSettings::default();
        let outcome = build_problem(&store, "pb", &settings).unwrap();

        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].chart, Some(ChartKind::SuboptFillCalls));
        assert_eq!(outcome.summaries.len(), 1);
        assert_eq!(outcome.summaries[0].envelope_length, 0);
    }

    #[test]
    fn test_shape_mismatch() {
        let store = store_from(json!({
            "problem_names": ["pb"],
            "pb": {
                "randomized_sync": {
                    "seeds": 3,
                    "1": {"functionalvalue": [4.0, 3.0], "time": [0.0], "fopt": 2.0}
                }
            }
        }));

        let settings = AggregationSettings::default();
        let builder = SeriesBuilder::new(&store, "pb", &settings).unwrap();
        for kind in ChartKind::ALL {
            assert_eq!(
                builder.series(kind, "randomized_sync"),
                Err(AggregateError::ShapeMismatch {
                    run: "1".to_string(),
                    values: 2,
                    times: 1,
                })
            );
        }
    }

    #[test]
    fn test_zero_fopt() {
        let store = store_from(json!({
            "problem_names": ["pb"],
            "pb": {
                "alg": {"seeds": 3, "1": {"functionalvalue": [1.0], "time": [0.0], "fopt": 0.0}}
            }
        }));

        let settings = AggregationSettings::default();
        let builder = SeriesBuilder::new(&store, "pb", &settings).unwrap();
        assert_eq!(builder.calls_series("alg"), Err(AggregateError::DivisionByZero));
    }

    #[test]
    fn test_scenarios_stride_requires_nscenarios() {
        let store = store_from(json!({
            "problem_names": ["pb"],
            "pb": {
                "progressivehedging": {"seeds": 3, "1": {"functionalvalue": [1.0], "time": [0.0], "fopt": 1.0}}
            }
        }));

        let settings = AggregationSettings::default();
        let builder = SeriesBuilder::new(&store, "pb", &settings).unwrap();
        assert_eq!(
            builder.calls_series("progressivehedging"),
            Err(AggregateError::missing("results store", "nscenarios"))
        );
        // the time chart has no stride
        assert!(builder.time_series("progressivehedging").is_ok());
    }

    #[test]
    fn test_fixed_and_identity_strides() {
        let store = fixture();
        let mut settings = AggregationSettings::default();
        settings.algorithms = vec![
            AlgorithmConfig {
                key: "progressivehedging".to_string(),
                label: "PH".to_string(),
                stride: Stride::Identity,
            },
            AlgorithmConfig {
                key: "randomized_sync".to_string(),
                label: "RPH".to_string(),
                stride: Stride::Fixed(10),
            },
        ];

        let builder = SeriesBuilder::new(&store, "hydrothermal", &settings).unwrap();
        assert_eq!(
            builder.calls_series("progressivehedging").unwrap().x,
            vec![0.0, 1.0, 2.0, 3.0]
        );
        assert_eq!(
            builder.calls_series("randomized_sync").unwrap().x,
            vec![0.0, 10.0, 20.0]
        );
    }

    #[test]
    fn test_best_observed_reference() {
        let store = store_from(json!({
            "problem_names": ["pb"],
            "pb": {
                "a": {"seeds": 1, "1": {"functionalvalue": [8.0, 6.0], "time": [0.0, 1.0], "fopt": 5.0}},
                "b": {"seeds": 1, "1": {"functionalvalue": [7.0, 4.0], "time": [0.0, 1.0], "fopt": 5.0}}
            }
        }));

        let mut settings = AggregationSettings::default();
        settings.reference = ReferenceValue::BestObserved;
        let builder = SeriesBuilder::new(&store, "pb", &settings).unwrap();

        assert_eq!(builder.reference_value("a"), Ok(4.0));
        assert_eq!(builder.calls_series("a").unwrap().y, vec![1.0, 0.5]);
        assert_eq!(builder.calls_series("b").unwrap().y, vec![0.75, 0.0]);
    }

    #[test]
    fn test_absolute_mode() {
        let store = store_from(json!({
            "problem_names": ["pb"],
            "pb": {
                "a": {"seeds": 1, "1": {"functionalvalue": [4.0, 6.0], "time": [0.0, 1.0], "fopt": 5.0}}
            }
        }));

        let mut settings = AggregationSettings::default();
        settings.mode = SuboptimalityMode::Absolute;
        let builder = SeriesBuilder::new(&store, "pb", &settings).unwrap();
        assert_eq!(builder.calls_series("a").unwrap().y, vec![0.2, 0.2]);
    }

    #[test]
    fn test_primary_run_falls_back_to_first_seed() {
        let store = store_from(json!({
            "problem_names": ["pb"],
            "pb": {
                "a": {
                    "seeds": [7, 9],
                    "9": {"functionalvalue": [3.0], "time": [0.0], "fopt": 2.0}
                }
            }
        }));

        let settings = AggregationSettings::default();
        let builder = SeriesBuilder::new(&store, "pb", &settings).unwrap();
        assert_eq!(builder.reference_value("a"), Ok(2.0));
        assert_eq!(builder.calls_series("a").unwrap().y, vec![0.5]);
    }

    fn incomplete_run_store(listed: bool) -> ResultsStore {
        let mut doc = json!({
            "pb": {
                "randomized_sync": {
                    "seeds": 1,
                    "1": {"functionalvalue": [6.0, 5.5], "time": [0.0, 1.0], "fopt": 5.0, "logstep": 2}
                },
                "randomized_async": {
                    "seeds": 1,
                    "1": {"functionalvalue": [7.0, 6.0], "time": [0.0, 1.0], "logstep": 2}
                }
            }
        });
        if listed {
            doc["problem_names"] = json!(["pb"]);
        }
        store_from(doc)
    }

    #[test]
    fn test_run_without_fopt_only_skips_its_series() {
        for listed in [true, false] {
            let store = incomplete_run_store(listed);
            assert_eq!(select_problems(&store, &AggregationSettings::default()), vec!["pb"]);

            let settings = AggregationSettings::default();
            let outcome = build_problem(&store, "pb", &settings).unwrap();

            let rph = line(&outcome, ChartKind::SuboptCalls, "randomized_sync");
            assert_eq!(rph.x, vec![0.0, 2.0]);
            assert_eq!(outcome.summaries.len(), 1);
            assert_eq!(outcome.summaries[0].algorithm, "randomized_sync");

            assert_eq!(outcome.skipped.len(), 3);
            for skip in &outcome.skipped {
                assert_eq!(skip.algorithm.as_deref(), Some("randomized_async"));
                assert!(skip.reason.contains("missing key `fopt`"));
            }
        }
    }

    #[test]
    fn test_run_without_fopt_strict() {
        let store = incomplete_run_store(true);
        let mut settings = AggregationSettings::default();
        settings.strict = true;
        settings.only_algorithms = Some(vec!["randomized_async".to_string()]);

        let err = build_problem(&store, "pb", &settings).unwrap_err();
        assert_eq!(
            err,
            AggregateError::missing(
                "run `1` of algorithm `randomized_async` of problem `pb`",
                "fopt"
            )
        );
    }

    #[test]
    fn test_run_without_time() {
        let store = store_from(json!({
            "problem_names": ["pb"],
            "pb": {
                "a": {"seeds": 1, "1": {"functionalvalue": [6.0], "fopt": 5.0}}
            }
        }));

        let settings = AggregationSettings::default();
        let builder = SeriesBuilder::new(&store, "pb", &settings).unwrap();
        for kind in ChartKind::ALL {
            match builder.series(kind, "a") {
                Err(AggregateError::MissingKey { key, .. }) => assert_eq!(key, "time"),
                other => panic!("expected missing time, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_malformed_problem_is_reported() {
        let store = store_from(json!({
            "problem_names": ["pb"],
            "pb": {"a": {"1": "not a run"}}
        }));

        let settings = AggregationSettings::default();
        match build_problem(&store, "pb", &settings) {
            Err(AggregateError::Malformed { problem, .. }) => assert_eq!(problem, "pb"),
            other => panic!("expected malformed problem, got {:?}", other.map(|o| o.problem)),
        }
    }

    #[test]
    fn test_select_problems() {
        let store = fixture();
        let mut settings = AggregationSettings::default();
        assert_eq!(select_problems(&store, &settings), vec!["hydrothermal"]);

        settings.only_problems = Some(vec!["other".to_string()]);
        assert_eq!(select_problems(&store, &settings), vec!["other"]);
    }
}
