//! Benchmark driver: one workload, every strategy, one timing sample per run.
//!
//! The driver lists URLs once and reuses the same tasks for every run so
//! the comparison shares its workload. Order of runs:
//!
//! 1. Sequential once (the baseline)
//! 2. For each worker count in the range: thread pool, then process pool
//!
//! A listing failure aborts the invocation. Task failures do not: a run
//! with failures is kept and reported as degraded.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use image_bench_core::bench::Benchmark;
//! use image_bench_core::fetch::{HttpFetcher, HttpTimeouts};
//! use image_bench_core::listing::{DEFAULT_LISTING_BASE_URL, PicsumLister};
//! use image_bench_core::strategy::ProcessPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let lister = PicsumLister::new(DEFAULT_LISTING_BASE_URL, HttpTimeouts::default())?;
//! let fetcher = HttpFetcher::new()?;
//! let benchmark = Benchmark::new(Arc::new(lister), Arc::new(fetcher), "./images")
//!     .with_process_pool(ProcessPool::current_exe()?);
//!
//! let report = benchmark.run(10, 1..=10).await?;
//! for sample in report.samples() {
//!     println!("{} x{}: {:.3}s", sample.strategy, sample.worker_count, sample.elapsed_seconds);
//! }
//! # Ok(())
//! # }
//! ```

mod sample;

pub use sample::{BenchmarkReport, BenchmarkRun, TimingSample};

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::fetch::ImageFetcher;
use crate::listing::{ListError, UrlLister};
use crate::strategy::{
    ExecutionStrategy, MAX_WORKERS, MIN_WORKERS, ProcessPool, Sequential, StrategyError,
    StrategyKind, ThreadPool,
};
use crate::task::{DownloadResult, DownloadTask};

/// Callback invoked after every completed run.
pub type RunObserver = Box<dyn Fn(&BenchmarkRun) + Send + Sync>;

/// Error type for a benchmark invocation.
#[derive(Debug, thiserror::Error)]
pub enum BenchmarkError {
    /// The workload could not be listed; nothing to compare.
    #[error("listing failed: {0}")]
    Listing(#[from] ListError),

    /// A strategy could not run at all.
    #[error("strategy failed: {0}")]
    Strategy(#[from] StrategyError),

    /// Worker range empty or outside the accepted bounds.
    #[error(
        "invalid worker range {start}..={end}: must be non-empty within {min}..={max}",
        min = MIN_WORKERS,
        max = MAX_WORKERS
    )]
    InvalidRange {
        /// First worker count.
        start: usize,
        /// Last worker count.
        end: usize,
    },

    /// A strategy broke the one-result-per-task contract.
    #[error(
        "{strategy} run with {worker_count} workers returned an incomplete result set ({received} of {expected})"
    )]
    IncompleteRun {
        /// Offending strategy.
        strategy: StrategyKind,
        /// Worker count of the run.
        worker_count: usize,
        /// Tasks in the workload.
        expected: usize,
        /// Distinct in-range indices received.
        received: usize,
    },
}

/// Runs every strategy over one shared workload.
pub struct Benchmark {
    lister: Arc<dyn UrlLister>,
    fetcher: Arc<dyn ImageFetcher>,
    destination_dir: PathBuf,
    sequential: Arc<dyn ExecutionStrategy>,
    thread_pool: Arc<dyn ExecutionStrategy>,
    process_pool: Option<Arc<dyn ExecutionStrategy>>,
    observer: Option<RunObserver>,
}

impl std::fmt::Debug for Benchmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Benchmark")
            .field("destination_dir", &self.destination_dir)
            .field("process_pool", &self.process_pool.is_some())
            .finish_non_exhaustive()
    }
}

impl Benchmark {
    /// Creates a driver writing images to `destination_dir`.
    ///
    /// Sequential and thread-pool strategies are preconfigured; attach a
    /// process pool with [`with_process_pool`](Self::with_process_pool).
    /// Without one, process-pool runs are skipped.
    pub fn new(
        lister: Arc<dyn UrlLister>,
        fetcher: Arc<dyn ImageFetcher>,
        destination_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            lister,
            fetcher,
            destination_dir: destination_dir.into(),
            sequential: Arc::new(Sequential::new()),
            thread_pool: Arc::new(ThreadPool::new()),
            process_pool: None,
            observer: None,
        }
    }

    /// Replaces the thread-pool strategy.
    #[must_use]
    pub fn with_thread_pool(mut self, strategy: impl ExecutionStrategy + 'static) -> Self {
        self.thread_pool = Arc::new(strategy);
        self
    }

    /// Sets the process-pool strategy.
    #[must_use]
    pub fn with_process_pool(mut self, pool: ProcessPool) -> Self {
        self.process_pool = Some(Arc::new(pool));
        self
    }

    /// Sets the process-pool slot to any strategy.
    #[must_use]
    pub fn with_process_strategy(mut self, strategy: impl ExecutionStrategy + 'static) -> Self {
        self.process_pool = Some(Arc::new(strategy));
        self
    }

    /// Calls `observer` after every run.
    #[must_use]
    pub fn with_observer(mut self, observer: RunObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Number of runs [`run`](Self::run) performs for `worker_range`.
    #[must_use]
    pub fn planned_runs(&self, worker_range: &RangeInclusive<usize>) -> usize {
        let per_count = if self.process_pool.is_some() { 2 } else { 1 };
        1 + worker_range.clone().count() * per_count
    }

    /// Lists `url_count` images once, then runs every strategy on them.
    ///
    /// # Errors
    ///
    /// - [`BenchmarkError::InvalidRange`] for an empty or out-of-bounds range
    /// - [`BenchmarkError::Listing`] when the workload cannot be listed
    /// - [`BenchmarkError::Strategy`] when a pool cannot run at all
    /// - [`BenchmarkError::IncompleteRun`] if a strategy loses results
    #[instrument(skip(self), fields(destination_dir = %self.destination_dir.display()))]
    pub async fn run(
        &self,
        url_count: usize,
        worker_range: RangeInclusive<usize>,
    ) -> Result<BenchmarkReport, BenchmarkError> {
        let (start, end) = (*worker_range.start(), *worker_range.end());
        if worker_range.is_empty() || start < MIN_WORKERS || end > MAX_WORKERS {
            return Err(BenchmarkError::InvalidRange { start, end });
        }

        let urls = self.lister.list_urls(url_count).await?;
        let tasks = DownloadTask::from_urls(urls);
        info!(tasks = tasks.len(), "workload listed");

        let mut report = BenchmarkReport::new(tasks.len());
        report.push(self.execute(self.sequential.as_ref(), &tasks, 1).await?);

        for worker_count in worker_range {
            report.push(
                self.execute(self.thread_pool.as_ref(), &tasks, worker_count)
                    .await?,
            );
            if let Some(process_pool) = &self.process_pool {
                report.push(
                    self.execute(process_pool.as_ref(), &tasks, worker_count)
                        .await?,
                );
            }
        }

        info!(
            runs = report.runs.len(),
            degraded = report.degraded_runs().count(),
            "benchmark complete"
        );
        Ok(report)
    }

    async fn execute(
        &self,
        strategy: &dyn ExecutionStrategy,
        tasks: &[DownloadTask],
        worker_count: usize,
    ) -> Result<BenchmarkRun, BenchmarkError> {
        let kind = strategy.kind();
        let worker_count = if kind == StrategyKind::Sequential {
            1
        } else {
            worker_count
        };

        let run = strategy
            .run(
                tasks,
                Arc::clone(&self.fetcher),
                &self.destination_dir,
                worker_count,
            )
            .await?;
        let sorted = run.sorted_results();
        verify_complete(kind, worker_count, tasks.len(), &sorted)?;

        let bench_run = BenchmarkRun {
            sample: TimingSample {
                strategy: kind,
                worker_count,
                elapsed_seconds: run.elapsed_seconds(),
            },
            succeeded: run.succeeded(),
            failed: run.failed(),
        };

        if bench_run.is_degraded() {
            warn!(
                strategy = %kind,
                worker_count,
                succeeded = bench_run.succeeded,
                failed = bench_run.failed,
                "run degraded"
            );
        } else {
            info!(
                strategy = %kind,
                worker_count,
                elapsed_ms = run.elapsed.as_millis(),
                "run recorded"
            );
        }

        if let Some(observer) = &self.observer {
            observer(&bench_run);
        }
        Ok(bench_run)
    }
}

/// Checks that `sorted` holds indices `0..expected`, once each.
fn verify_complete(
    strategy: StrategyKind,
    worker_count: usize,
    expected: usize,
    sorted: &[DownloadResult],
) -> Result<(), BenchmarkError> {
    let exact = sorted.len() == expected
        && sorted
            .iter()
            .enumerate()
            .all(|(position, result)| result.index == position);
    if exact {
        return Ok(());
    }

    let mut received: Vec<usize> = sorted
        .iter()
        .map(|r| r.index)
        .filter(|&index| index < expected)
        .collect();
    received.dedup();
    Err(BenchmarkError::IncompleteRun {
        strategy,
        worker_count,
        expected,
        received: received.len(),
    })
}
