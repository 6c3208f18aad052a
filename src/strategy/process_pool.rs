//! Fixed-size pool of OS processes speaking the [`worker`](super::worker)
//! protocol.
//!
//! Each child is driven by one feeder task in the parent. A feeder pops the
//! next task from the shared queue, writes it to its child's stdin, and
//! waits for the single answer line before popping again, so a child never
//! holds more than one task. When the queue is empty the feeder closes
//! stdin and reaps the child, killing it if it outlives the grace period.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::worker::{WorkerError, WorkerRequest, decode_line, write_line};
use super::{
    ExecutionStrategy, StrategyError, StrategyKind, StrategyRun, TaskQueue, WorkerGuard,
    WorkerProbe, complete_results, validate_worker_count,
};
use crate::fetch::ImageFetcher;
use crate::task::{DownloadResult, DownloadTask};

/// Time a worker gets to exit after its stdin is closed before it is killed.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Argument that puts the benchmark binary into worker mode.
const WORKER_ARG: &str = "worker";

/// Process-pool strategy.
///
/// Tasks and results cross the process boundary as JSON lines; the fetcher
/// is rebuilt in every child from its [`FetcherSpec`](crate::fetch::FetcherSpec).
#[derive(Debug, Clone)]
pub struct ProcessPool {
    program: PathBuf,
    args: Vec<OsString>,
    shutdown_grace: Duration,
    probe: Option<WorkerProbe>,
}

impl ProcessPool {
    /// Uses `program worker` as the worker command.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec![OsString::from(WORKER_ARG)],
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            probe: None,
        }
    }

    /// Uses the running executable as the worker program.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::WorkerProgram`] if the path of the current
    /// executable cannot be determined.
    pub fn current_exe() -> Result<Self, StrategyError> {
        let program = std::env::current_exe().map_err(StrategyError::WorkerProgram)?;
        Ok(Self::new(program))
    }

    /// Replaces the arguments passed to the worker program.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets how long a worker may take to exit after its input closes.
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Registers every worker process with `probe` until it is reaped.
    #[must_use]
    pub fn with_probe(mut self, probe: WorkerProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Worker program path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn spawn_worker(&self) -> std::io::Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
    }
}

#[async_trait]
impl ExecutionStrategy for ProcessPool {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Process
    }

    #[instrument(skip_all, fields(strategy = "process", tasks = tasks.len(), worker_count = worker_count))]
    async fn run(
        &self,
        tasks: &[DownloadTask],
        fetcher: Arc<dyn ImageFetcher>,
        destination_dir: &Path,
        worker_count: usize,
    ) -> Result<StrategyRun, StrategyError> {
        validate_worker_count(worker_count)?;
        let spec = fetcher.spec().ok_or(StrategyError::FetcherNotTransferable)?;
        let init = WorkerRequest::Init {
            fetcher: spec,
            destination_dir: destination_dir.to_path_buf(),
        };
        let mut init_line = serde_json::to_vec(&init).map_err(StrategyError::Encode)?;
        init_line.push(b'\n');
        let init_line: Arc<[u8]> = Arc::from(init_line);

        let start = Instant::now();
        let queue = Arc::new(TaskQueue::new(tasks));
        let mut feeders = JoinSet::new();
        let mut spawn_error = None;

        for worker_id in 0..worker_count {
            match self.spawn_worker() {
                Ok(child) => {
                    let feeder = Feeder {
                        worker_id,
                        queue: Arc::clone(&queue),
                        init_line: Arc::clone(&init_line),
                        shutdown_grace: self.shutdown_grace,
                        _guard: self.probe.as_ref().map(WorkerProbe::enter),
                    };
                    feeders.spawn(feeder.drive(child));
                }
                Err(e) => {
                    warn!(worker_id, program = %self.program.display(), error = %e, "failed to spawn worker process");
                    spawn_error = Some(e);
                    break;
                }
            }
        }

        if feeders.is_empty() {
            return Err(StrategyError::NoWorkers {
                strategy: StrategyKind::Process,
                source: spawn_error
                    .unwrap_or_else(|| std::io::Error::other("no worker process started")),
            });
        }
        debug!(workers = feeders.len(), "worker processes started");

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = feeders.join_next().await {
            match joined {
                Ok(mut batch) => results.append(&mut batch),
                Err(e) => warn!(error = %e, "worker feeder task failed"),
            }
        }

        let run = StrategyRun {
            results: complete_results(tasks, results),
            elapsed: start.elapsed(),
        };
        info!(
            succeeded = run.succeeded(),
            failed = run.failed(),
            elapsed_ms = run.elapsed.as_millis(),
            "process-pool run complete"
        );
        Ok(run)
    }
}

/// Parent-side driver for one worker process.
struct Feeder {
    worker_id: usize,
    queue: Arc<TaskQueue>,
    init_line: Arc<[u8]>,
    shutdown_grace: Duration,
    // Released only after the child is reaped.
    _guard: Option<WorkerGuard>,
}

impl Feeder {
    async fn drive(self, mut child: Child) -> Vec<DownloadResult> {
        let mut results = Vec::new();

        match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => {
                self.feed(stdin, BufReader::new(stdout).lines(), &mut results)
                    .await;
            }
            _ => warn!(worker_id = self.worker_id, "worker process has no pipes"),
        }

        self.reap(child).await;
        results
    }

    /// Hands out tasks until the queue drains or the worker stops answering.
    /// Dropping `stdin` on return signals EOF to the worker.
    async fn feed(
        &self,
        mut stdin: ChildStdin,
        mut lines: Lines<BufReader<ChildStdout>>,
        results: &mut Vec<DownloadResult>,
    ) {
        if let Err(e) = write_raw(&mut stdin, &self.init_line).await {
            warn!(worker_id = self.worker_id, error = %e, "failed to initialise worker");
            return;
        }

        while let Some(task) = self.queue.pop() {
            match exchange(&mut stdin, &mut lines, &task).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(
                        worker_id = self.worker_id,
                        index = task.index,
                        error = %e,
                        "worker failed mid-task; retiring it"
                    );
                    results.push(DownloadResult::failure(task.index, e.failure_kind()));
                    return;
                }
            }
        }
        debug!(
            worker_id = self.worker_id,
            answered = results.len(),
            "worker queue drained"
        );
    }

    async fn reap(&self, mut child: Child) {
        match timeout(self.shutdown_grace, child.wait()).await {
            Ok(Ok(status)) => debug!(worker_id = self.worker_id, %status, "worker exited"),
            Ok(Err(e)) => warn!(worker_id = self.worker_id, error = %e, "failed to wait for worker"),
            Err(_) => {
                warn!(
                    worker_id = self.worker_id,
                    grace_ms = self.shutdown_grace.as_millis(),
                    "worker did not exit in time; killing"
                );
                // kill() also waits, so the child is reaped either way.
                if let Err(e) = child.kill().await {
                    warn!(worker_id = self.worker_id, error = %e, "failed to kill worker");
                }
            }
        }
    }
}

async fn write_raw(stdin: &mut ChildStdin, bytes: &[u8]) -> Result<(), WorkerError> {
    use tokio::io::AsyncWriteExt;

    stdin.write_all(bytes).await?;
    stdin.flush().await?;
    Ok(())
}

/// Sends one task and reads its answer.
async fn exchange(
    stdin: &mut ChildStdin,
    lines: &mut Lines<BufReader<ChildStdout>>,
    task: &DownloadTask,
) -> Result<DownloadResult, WorkerError> {
    write_line(stdin, &WorkerRequest::Task(task.clone())).await?;

    let line = lines.next_line().await?.ok_or(WorkerError::Exited)?;
    let result: DownloadResult = decode_line(&line)?;
    if result.index != task.index {
        return Err(WorkerError::IndexMismatch {
            expected: task.index,
            got: result.index,
        });
    }
    Ok(result)
}
