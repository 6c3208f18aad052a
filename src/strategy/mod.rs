//! Execution strategies: the same workload run sequentially, on a thread
//! pool, or on a process pool.
//!
//! Every strategy implements [`ExecutionStrategy::run`] with one contract:
//!
//! - exactly one [`DownloadResult`] per task comes back, whatever fails
//! - a failing (or panicking) task never stops its siblings
//! - every worker thread or process is gone before `run` returns
//!
//! Only problems with the pool itself (bad worker count, a fetcher that
//! cannot be shipped to another process, no worker able to start) surface
//! as [`StrategyError`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use image_bench_core::fetch::{ImageFetcher, SimulatedFetcher};
//! use image_bench_core::strategy::{ExecutionStrategy, ThreadPool};
//! use image_bench_core::DownloadTask;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tasks: Vec<DownloadTask> = (0..10)
//!     .map(|i| DownloadTask::new(format!("sim://image/{i}"), i))
//!     .collect();
//! let fetcher: Arc<dyn ImageFetcher> = Arc::new(SimulatedFetcher::new(Duration::from_millis(100)));
//!
//! let run = ThreadPool::new()
//!     .run(&tasks, fetcher, Path::new("./images"), 4)
//!     .await?;
//! println!("{} ok in {:.3}s", run.succeeded(), run.elapsed_seconds());
//! # Ok(())
//! # }
//! ```

mod probe;
mod process_pool;
mod sequential;
mod thread_pool;
pub mod worker;

pub use probe::{WorkerGuard, WorkerProbe};
pub use process_pool::{DEFAULT_SHUTDOWN_GRACE, ProcessPool};
pub use sequential::Sequential;
pub use thread_pool::ThreadPool;

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fetch::ImageFetcher;
use crate::task::{DownloadResult, DownloadTask, FailureKind};

/// Minimum worker count accepted by the pools.
pub const MIN_WORKERS: usize = 1;

/// Maximum worker count accepted by the pools.
pub const MAX_WORKERS: usize = 64;

/// Which execution regime produced a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// One task at a time on the caller's task.
    Sequential,
    /// Fixed pool of OS threads.
    Thread,
    /// Fixed pool of OS processes.
    Process,
}

impl StrategyKind {
    /// Returns the stable label used in logs and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Thread => "thread",
            Self::Process => "process",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for pool-level failures.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// Worker count outside the accepted range.
    #[error(
        "invalid worker count {value}: must be between {min} and {max}",
        min = MIN_WORKERS,
        max = MAX_WORKERS
    )]
    InvalidWorkerCount {
        /// The rejected value.
        value: usize,
    },

    /// The fetcher has no serializable spec, so a worker process cannot rebuild it.
    #[error("fetcher cannot be transferred to a worker process")]
    FetcherNotTransferable,

    /// Not a single worker could be started.
    #[error("no {strategy} worker could be started: {source}")]
    NoWorkers {
        /// Strategy whose workers failed to start.
        strategy: StrategyKind,
        /// Error from the last start attempt.
        #[source]
        source: std::io::Error,
    },

    /// The worker executable could not be located.
    #[error("cannot locate worker program: {0}")]
    WorkerProgram(#[source] std::io::Error),

    /// The worker init message could not be encoded.
    #[error("cannot encode worker init message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Results and wall-clock time of one strategy run.
#[derive(Debug, Clone)]
pub struct StrategyRun {
    /// One result per task, in completion order.
    pub results: Vec<DownloadResult>,
    /// Wall-clock time from first dispatch to full drain.
    pub elapsed: Duration,
}

impl StrategyRun {
    /// Elapsed time in seconds.
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Number of stored images.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of failed tasks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Results ordered by task index.
    #[must_use]
    pub fn sorted_results(&self) -> Vec<DownloadResult> {
        let mut sorted = self.results.clone();
        sorted.sort_by_key(|r| r.index);
        sorted
    }
}

/// One way of executing a batch of download tasks.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// Which regime this strategy implements.
    fn kind(&self) -> StrategyKind;

    /// Runs every task through `fetcher`, using at most `worker_count`
    /// concurrent workers, and drains all workers before returning.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] only for pool-level failures; per-task
    /// failures are reported in [`StrategyRun::results`].
    async fn run(
        &self,
        tasks: &[DownloadTask],
        fetcher: Arc<dyn ImageFetcher>,
        destination_dir: &Path,
        worker_count: usize,
    ) -> Result<StrategyRun, StrategyError>;
}

pub(crate) fn validate_worker_count(worker_count: usize) -> Result<(), StrategyError> {
    if (MIN_WORKERS..=MAX_WORKERS).contains(&worker_count) {
        Ok(())
    } else {
        Err(StrategyError::InvalidWorkerCount {
            value: worker_count,
        })
    }
}

/// FIFO shared by the workers of one pool run.
#[derive(Debug)]
pub(crate) struct TaskQueue {
    pending: Mutex<VecDeque<DownloadTask>>,
}

impl TaskQueue {
    pub(crate) fn new(tasks: &[DownloadTask]) -> Self {
        Self {
            pending: Mutex::new(tasks.iter().cloned().collect()),
        }
    }

    /// Takes the next task, or `None` once the queue is drained.
    pub(crate) fn pop(&self) -> Option<DownloadTask> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

/// Everything a pool worker needs, cloned once per worker.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub(crate) queue: Arc<TaskQueue>,
    pub(crate) fetcher: Arc<dyn ImageFetcher>,
    pub(crate) destination_dir: PathBuf,
}

/// Enforces the one-result-per-task contract on a pool's raw output.
///
/// Results for unknown or already-reported indices are dropped; tasks that
/// never got a result (their worker died or never started) are reported as
/// [`FailureKind::WorkerLost`]. Completion order is preserved.
pub(crate) fn complete_results(
    tasks: &[DownloadTask],
    results: Vec<DownloadResult>,
) -> Vec<DownloadResult> {
    let expected: HashSet<usize> = tasks.iter().map(|t| t.index).collect();
    let mut seen = HashSet::with_capacity(tasks.len());
    let mut complete = Vec::with_capacity(tasks.len());

    for result in results {
        if expected.contains(&result.index) && seen.insert(result.index) {
            complete.push(result);
        } else {
            warn!(index = result.index, "discarding unexpected or duplicate result");
        }
    }

    for task in tasks {
        if !seen.contains(&task.index) {
            warn!(index = task.index, url = %task.url, "task never completed; marking worker lost");
            complete.push(DownloadResult::failure(task.index, FailureKind::WorkerLost));
        }
    }

    complete
}
