//! Fixed-size pool of OS threads pulling from a shared queue.
//!
//! Each worker thread runs one task at a time via [`Handle::block_on`] on
//! the caller's runtime, so the thread itself blocks while its request is
//! in flight and concurrency is bounded by the number of threads. The
//! runtime's IO and timer drivers are shared, which keeps pooled HTTP
//! connections usable from any worker.

use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::{
    ExecutionStrategy, StrategyError, StrategyKind, StrategyRun, TaskQueue, WorkerContext,
    WorkerGuard, WorkerProbe, complete_results, validate_worker_count,
};
use crate::fetch::{ImageFetcher, fetch_guarded};
use crate::task::{DownloadResult, DownloadTask};

/// Thread-pool strategy.
///
/// # Concurrency Model
///
/// - `worker_count` named threads (`image-worker-{n}`) are spawned per run
/// - Each thread pops tasks until the queue is empty, then exits
/// - Results travel back over a channel in completion order
/// - Every thread is joined before [`run`](ExecutionStrategy::run) returns
#[derive(Debug, Clone, Default)]
pub struct ThreadPool {
    probe: Option<WorkerProbe>,
}

impl ThreadPool {
    /// Creates a thread-pool strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every worker thread with `probe` while it is alive.
    #[must_use]
    pub fn with_probe(mut self, probe: WorkerProbe) -> Self {
        self.probe = Some(probe);
        self
    }
}

#[async_trait]
impl ExecutionStrategy for ThreadPool {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Thread
    }

    #[instrument(skip_all, fields(strategy = "thread", tasks = tasks.len(), worker_count = worker_count))]
    async fn run(
        &self,
        tasks: &[DownloadTask],
        fetcher: Arc<dyn ImageFetcher>,
        destination_dir: &Path,
        worker_count: usize,
    ) -> Result<StrategyRun, StrategyError> {
        validate_worker_count(worker_count)?;

        let start = Instant::now();
        let runtime = Handle::current();
        let context = WorkerContext {
            queue: Arc::new(TaskQueue::new(tasks)),
            fetcher,
            destination_dir: destination_dir.to_path_buf(),
        };
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();

        let mut handles = Vec::with_capacity(worker_count);
        let mut spawn_error = None;
        for worker_id in 0..worker_count {
            let guard = self.probe.as_ref().map(WorkerProbe::enter);
            let context = context.clone();
            let runtime = runtime.clone();
            let results_tx = results_tx.clone();

            let spawned = thread::Builder::new()
                .name(format!("image-worker-{worker_id}"))
                .spawn(move || worker_loop(worker_id, &context, &runtime, &results_tx, guard));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!(worker_id, error = %e, "failed to spawn worker thread");
                    spawn_error = Some(e);
                    break;
                }
            }
        }
        // Only the workers hold senders now; the channel closes once all exit.
        drop(results_tx);

        if handles.is_empty() {
            return Err(StrategyError::NoWorkers {
                strategy: StrategyKind::Thread,
                source: spawn_error
                    .unwrap_or_else(|| std::io::Error::other("no worker thread started")),
            });
        }
        debug!(workers = handles.len(), "worker threads started");

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(result) = results_rx.recv().await {
            results.push(result);
        }

        join_workers(handles).await;

        let run = StrategyRun {
            results: complete_results(tasks, results),
            elapsed: start.elapsed(),
        };
        info!(
            succeeded = run.succeeded(),
            failed = run.failed(),
            elapsed_ms = run.elapsed.as_millis(),
            "thread-pool run complete"
        );
        Ok(run)
    }
}

fn worker_loop(
    worker_id: usize,
    context: &WorkerContext,
    runtime: &Handle,
    results: &mpsc::UnboundedSender<DownloadResult>,
    _guard: Option<WorkerGuard>,
) {
    let mut processed = 0usize;
    while let Some(task) = context.queue.pop() {
        let result = runtime.block_on(fetch_guarded(
            context.fetcher.as_ref(),
            &task,
            &context.destination_dir,
        ));
        processed += 1;
        if results.send(result).is_err() {
            warn!(worker_id, "result channel closed; worker stopping early");
            break;
        }
    }
    debug!(worker_id, processed, "worker thread drained");
}

/// Joins finished worker threads off the async executor.
async fn join_workers(handles: Vec<JoinHandle<()>>) {
    let joined = tokio::task::spawn_blocking(move || {
        handles
            .into_iter()
            .map(JoinHandle::join)
            .filter(Result::is_err)
            .count()
    })
    .await;

    match joined {
        Ok(0) => {}
        Ok(panicked) => warn!(panicked, "worker threads panicked"),
        Err(e) => warn!(error = %e, "failed to join worker threads"),
    }
}
