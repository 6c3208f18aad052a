//! Timing samples and the report the driver accumulates them into.

use serde::{Deserialize, Serialize};

use crate::strategy::StrategyKind;

/// Wall-clock time of one strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSample {
    /// Regime that produced the sample.
    pub strategy: StrategyKind,
    /// Workers used; always 1 for [`StrategyKind::Sequential`].
    pub worker_count: usize,
    /// Elapsed wall-clock seconds.
    pub elapsed_seconds: f64,
}

/// A timing sample together with how many tasks succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    #[serde(flatten)]
    pub sample: TimingSample,
    pub succeeded: usize,
    pub failed: usize,
}

impl BenchmarkRun {
    /// A run is degraded when at least one task failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.failed > 0
    }

    /// Fraction of tasks that succeeded, 1.0 for an empty workload.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_ratio(&self) -> f64 {
        let total = self.succeeded + self.failed;
        if total == 0 {
            1.0
        } else {
            self.succeeded as f64 / total as f64
        }
    }
}

/// Every run of one benchmark invocation, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Number of images in the shared workload.
    pub task_count: usize,
    /// Runs in the order they were executed. Append-only.
    pub runs: Vec<BenchmarkRun>,
}

impl BenchmarkReport {
    /// Creates an empty report for a workload of `task_count` images.
    #[must_use]
    pub fn new(task_count: usize) -> Self {
        Self {
            task_count,
            runs: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, run: BenchmarkRun) {
        self.runs.push(run);
    }

    /// Timing samples in execution order.
    #[must_use]
    pub fn samples(&self) -> Vec<TimingSample> {
        self.runs.iter().map(|run| run.sample.clone()).collect()
    }

    /// The sequential reference sample, if one was recorded.
    #[must_use]
    pub fn baseline(&self) -> Option<&TimingSample> {
        self.runs
            .iter()
            .map(|run| &run.sample)
            .find(|sample| sample.strategy == StrategyKind::Sequential)
    }

    /// Runs of one strategy, in execution order.
    pub fn runs_for(&self, strategy: StrategyKind) -> impl Iterator<Item = &BenchmarkRun> {
        self.runs
            .iter()
            .filter(move |run| run.sample.strategy == strategy)
    }

    /// Fastest run of one strategy.
    #[must_use]
    pub fn fastest(&self, strategy: StrategyKind) -> Option<&BenchmarkRun> {
        self.runs_for(strategy)
            .min_by(|a, b| a.sample.elapsed_seconds.total_cmp(&b.sample.elapsed_seconds))
    }

    /// Runs in which at least one task failed.
    pub fn degraded_runs(&self) -> impl Iterator<Item = &BenchmarkRun> {
        self.runs.iter().filter(|run| run.is_degraded())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn run(strategy: StrategyKind, worker_count: usize, secs: f64, failed: usize) -> BenchmarkRun {
        BenchmarkRun {
            sample: TimingSample {
                strategy,
                worker_count,
                elapsed_seconds: secs,
            },
            succeeded: 10 - failed,
            failed,
        }
    }

    fn report() -> BenchmarkReport {
        let mut report = BenchmarkReport::new(10);
        report.push(run(StrategyKind::Sequential, 1, 2.0, 0));
        report.push(run(StrategyKind::Thread, 1, 2.1, 0));
        report.push(run(StrategyKind::Process, 1, 2.6, 1));
        report.push(run(StrategyKind::Thread, 2, 1.1, 0));
        report.push(run(StrategyKind::Process, 2, 1.5, 0));
        report
    }

    #[test]
    fn test_samples_keep_execution_order() {
        let strategies: Vec<StrategyKind> =
            report().samples().iter().map(|s| s.strategy).collect();
        assert_eq!(
            strategies,
            vec![
                StrategyKind::Sequential,
                StrategyKind::Thread,
                StrategyKind::Process,
                StrategyKind::Thread,
                StrategyKind::Process,
            ]
        );
    }

    #[test]
    fn test_baseline_is_sequential_sample() {
        let report = report();
        let baseline = report.baseline().unwrap();
        assert_eq!(baseline.strategy, StrategyKind::Sequential);
        assert_eq!(baseline.worker_count, 1);
    }

    #[test]
    fn test_fastest_per_strategy() {
        let report = report();
        let fastest = report.fastest(StrategyKind::Thread).unwrap();
        assert_eq!(fastest.sample.worker_count, 2);
    }

    #[test]
    fn test_degraded_runs_and_ratio() {
        let report = report();
        let degraded: Vec<&BenchmarkRun> = report.degraded_runs().collect();
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0].sample.strategy, StrategyKind::Process);
        assert!((degraded[0].success_ratio() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_run_serializes_flat() {
        let json = serde_json::to_value(run(StrategyKind::Thread, 3, 0.5, 0)).unwrap();
        assert_eq!(json["strategy"], "thread");
        assert_eq!(json["worker_count"], 3);
        assert_eq!(json["succeeded"], 10);
    }
}
