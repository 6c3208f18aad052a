//! Sequential baseline: one task at a time, in input order.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::{ExecutionStrategy, StrategyError, StrategyKind, StrategyRun};
use crate::fetch::{ImageFetcher, fetch_guarded};
use crate::task::DownloadTask;

/// Runs tasks one after another on the caller's task. `worker_count` is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Sequential {
    /// Creates the sequential strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutionStrategy for Sequential {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Sequential
    }

    #[instrument(skip_all, fields(strategy = "sequential", tasks = tasks.len()))]
    async fn run(
        &self,
        tasks: &[DownloadTask],
        fetcher: Arc<dyn ImageFetcher>,
        destination_dir: &Path,
        _worker_count: usize,
    ) -> Result<StrategyRun, StrategyError> {
        let start = Instant::now();
        let mut results = Vec::with_capacity(tasks.len());

        for task in tasks {
            debug!(index = task.index, "running task");
            results.push(fetch_guarded(fetcher.as_ref(), task, destination_dir).await);
        }

        let run = StrategyRun {
            results,
            elapsed: start.elapsed(),
        };
        info!(
            succeeded = run.succeeded(),
            failed = run.failed(),
            elapsed_ms = run.elapsed.as_millis(),
            "sequential run complete"
        );
        Ok(run)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::fetch::SimulatedFetcher;
    use crate::task::FailureKind;

    fn tasks(n: usize) -> Vec<DownloadTask> {
        (0..n)
            .map(|i| DownloadTask::new(format!("sim://image/{i}"), i))
            .collect()
    }

    #[tokio::test]
    async fn test_sequential_preserves_input_order() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher: Arc<dyn ImageFetcher> = Arc::new(SimulatedFetcher::new(Duration::ZERO));

        let run = Sequential::new()
            .run(&tasks(5), fetcher, temp_dir.path(), 1)
            .await
            .unwrap();

        let indices: Vec<usize> = run.results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(run.succeeded(), 5);
    }

    #[tokio::test]
    async fn test_sequential_ignores_worker_count() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher: Arc<dyn ImageFetcher> = Arc::new(SimulatedFetcher::new(Duration::ZERO));

        let run = Sequential::new()
            .run(&tasks(2), fetcher, temp_dir.path(), 0)
            .await
            .unwrap();

        assert_eq!(run.results.len(), 2);
    }

    #[tokio::test]
    async fn test_sequential_continues_after_failure() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher: Arc<dyn ImageFetcher> =
            Arc::new(SimulatedFetcher::new(Duration::ZERO).failing_on([0]));

        let run = Sequential::new()
            .run(&tasks(3), fetcher, temp_dir.path(), 1)
            .await
            .unwrap();

        assert_eq!(run.results[0].failure_kind(), Some(FailureKind::Network));
        assert!(run.results[1].is_success());
        assert!(run.results[2].is_success());
    }
}
