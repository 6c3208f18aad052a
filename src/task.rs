//! Plain-data task and result types shared by every execution strategy.
//!
//! Everything here is `Serialize`/`Deserialize` so the same values can be
//! handed to a worker thread or written across a process boundary.

use serde::{Deserialize, Serialize};

/// One image to download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    /// Source URL of the image.
    pub url: String,
    /// Position of the task in the workload, unique within a run.
    pub index: usize,
}

impl DownloadTask {
    /// Creates a task for `url` at position `index`.
    pub fn new(url: impl Into<String>, index: usize) -> Self {
        Self {
            url: url.into(),
            index,
        }
    }

    /// Numbers a URL listing into tasks, `0..urls.len()` in listing order.
    #[must_use]
    pub fn from_urls(urls: Vec<String>) -> Vec<Self> {
        urls.into_iter()
            .enumerate()
            .map(|(index, url)| Self { url, index })
            .collect()
    }

    /// File name the task is stored under: `image_{index}.jpg`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("image_{}.jpg", self.index)
    }
}

/// Why a single task did not produce a stored image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection failure, timeout or non-success HTTP status.
    Network,
    /// A response or message could not be decoded.
    Parse,
    /// Local filesystem write failure.
    Io,
    /// The fetcher panicked.
    Internal,
    /// The pool worker running the task died, or no worker was available.
    WorkerLost,
}

impl FailureKind {
    /// Returns the stable label used in logs and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parse => "parse",
            Self::Io => "io",
            Self::Internal => "internal",
            Self::WorkerLost => "worker_lost",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The image was stored; `bytes` were written.
    Success { bytes: u64 },
    /// The image was not stored.
    Failure { kind: FailureKind },
}

/// Result of processing one [`DownloadTask`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResult {
    /// Index of the task this result belongs to.
    pub index: usize,
    /// What happened.
    pub outcome: Outcome,
}

impl DownloadResult {
    #[must_use]
    pub fn success(index: usize, bytes: u64) -> Self {
        Self {
            index,
            outcome: Outcome::Success { bytes },
        }
    }

    #[must_use]
    pub fn failure(index: usize, kind: FailureKind) -> Self {
        Self {
            index,
            outcome: Outcome::Failure { kind },
        }
    }

    /// Returns `true` if the image was stored.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    /// Returns the failure kind, if the task failed.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure { kind } => Some(kind),
        }
    }
}
