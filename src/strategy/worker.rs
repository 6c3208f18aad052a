//! Process-pool worker: the child side of [`ProcessPool`](super::ProcessPool).
//!
//! # Protocol
//!
//! Newline-delimited JSON over stdin/stdout:
//!
//! 1. The parent sends one [`WorkerRequest::Init`] naming the fetcher and
//!    the destination directory.
//! 2. The parent then sends one [`WorkerRequest::Task`] at a time; the
//!    worker answers each with exactly one
//!    [`DownloadResult`](crate::task::DownloadResult) line.
//! 3. The parent closes stdin; the worker exits cleanly on EOF.
//!
//! stdout carries protocol lines only. Logs must go to stderr.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, instrument};

use crate::fetch::{FetcherSpec, fetch_guarded};
use crate::task::{DownloadTask, FailureKind};

/// Message from the pool to a worker process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// First message: how to fetch and where to store.
    Init {
        fetcher: FetcherSpec,
        destination_dir: PathBuf,
    },
    /// One task to execute.
    Task(DownloadTask),
}

/// Errors on either side of the worker protocol.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Reading or writing the pipe failed.
    #[error("worker pipe error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the pipe while an answer was expected.
    #[error("worker closed its output before answering")]
    Exited,

    /// A line could not be decoded.
    #[error("malformed worker message: {0}")]
    Protocol(#[source] serde_json::Error),

    /// The first message was not `init`.
    #[error("worker expected an init message first")]
    MissingInit,

    /// A second `init` arrived.
    #[error("worker received a second init message")]
    UnexpectedInit,

    /// The worker answered for a different task.
    #[error("worker answered task {got} while task {expected} was pending")]
    IndexMismatch {
        /// Index of the task sent.
        expected: usize,
        /// Index in the answer.
        got: usize,
    },

    /// The fetcher described by the init message could not be built.
    #[error("worker could not build its fetcher: {0}")]
    Fetcher(#[source] reqwest::Error),
}

impl WorkerError {
    /// Failure kind recorded for the task that was in flight.
    #[must_use]
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Protocol(_) | Self::IndexMismatch { .. } => FailureKind::Parse,
            Self::Io(_)
            | Self::Exited
            | Self::MissingInit
            | Self::UnexpectedInit
            | Self::Fetcher(_) => FailureKind::WorkerLost,
        }
    }
}

/// Serializes `message` as one protocol line and flushes it.
///
/// # Errors
///
/// Returns [`WorkerError::Protocol`] if encoding fails and
/// [`WorkerError::Io`] if the write fails.
pub async fn write_line<W, T>(writer: &mut W, message: &T) -> Result<(), WorkerError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(message).map_err(WorkerError::Protocol)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Decodes one protocol line.
///
/// # Errors
///
/// Returns [`WorkerError::Protocol`] for malformed JSON.
pub fn decode_line<T>(line: &str) -> Result<T, WorkerError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_str(line).map_err(WorkerError::Protocol)
}

/// Serves the protocol until `reader` reaches EOF.
///
/// # Returns
///
/// The number of tasks answered.
///
/// # Errors
///
/// Returns [`WorkerError`] on pipe failures, malformed requests, or a
/// fetcher that cannot be built. Task failures are answered, not returned.
#[instrument(skip_all)]
pub async fn serve<R, W>(reader: R, mut writer: W) -> Result<usize, WorkerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    let Some(first) = lines.next_line().await? else {
        debug!("input closed before init");
        return Ok(0);
    };
    let WorkerRequest::Init {
        fetcher,
        destination_dir,
    } = decode_line::<WorkerRequest>(&first)?
    else {
        return Err(WorkerError::MissingInit);
    };
    let fetcher = fetcher.build().map_err(WorkerError::Fetcher)?;
    debug!(destination_dir = %destination_dir.display(), "worker initialised");

    let mut served = 0usize;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match decode_line::<WorkerRequest>(&line)? {
            WorkerRequest::Task(task) => {
                let result = fetch_guarded(fetcher.as_ref(), &task, &destination_dir).await;
                write_line(&mut writer, &result).await?;
                served += 1;
            }
            WorkerRequest::Init { .. } => return Err(WorkerError::UnexpectedInit),
        }
    }

    info!(served, "worker input closed");
    Ok(served)
}

/// Serves the protocol on this process's stdin/stdout.
///
/// # Errors
///
/// See [`serve`].
pub async fn serve_stdio() -> Result<usize, WorkerError> {
    serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}
