//! Image fetchers: retrieve one image and store it under its task index.
//!
//! This module provides the [`ImageFetcher`] contract that every execution
//! strategy drives, plus two implementations:
//!
//! - [`HttpFetcher`] - streams the image over HTTP with bounded timeouts
//! - [`SimulatedFetcher`] - deterministic stand-in with fixed latency, used
//!   for offline runs and tests
//!
//! A fetcher never fails the call itself: every problem is reported as a
//! [`Failure`](crate::Outcome::Failure) on the returned [`DownloadResult`].
//! Strategies additionally run each call through [`fetch_guarded`] so that a
//! panicking fetcher cannot take sibling tasks down with it.
//!
//! # Example
//!
//! ```no_run
//! use image_bench_core::fetch::{HttpFetcher, ImageFetcher};
//! use image_bench_core::DownloadTask;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpFetcher::new()?;
//! let task = DownloadTask::new("https://picsum.photos/id/10/640/480", 0);
//! let result = fetcher.fetch_and_store(&task, Path::new("./images")).await;
//! println!("{result:?}");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod simulated;

pub use client::{HttpFetcher, HttpTimeouts};
pub use error::FetchError;
pub use simulated::SimulatedFetcher;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::task::{DownloadResult, DownloadTask, FailureKind};

/// Fetches one image and writes it to `destination_dir/image_{index}.jpg`.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Retrieves `task.url` and stores the bytes, creating `destination_dir`
    /// if it does not exist yet.
    async fn fetch_and_store(&self, task: &DownloadTask, destination_dir: &Path)
    -> DownloadResult;

    /// Serializable description a worker process can rebuild this fetcher
    /// from. Fetchers returning `None` can only run in-process.
    fn spec(&self) -> Option<FetcherSpec> {
        None
    }
}

/// Plain-data description of a fetcher, sent to process-pool workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetcherSpec {
    /// An [`HttpFetcher`] with the given timeouts.
    Http(HttpTimeouts),
    /// A [`SimulatedFetcher`] with the given behaviour.
    Simulated(SimulatedFetcher),
}

impl FetcherSpec {
    /// Builds the fetcher this spec describes.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the HTTP client cannot be created.
    pub fn build(&self) -> Result<Arc<dyn ImageFetcher>, reqwest::Error> {
        Ok(match self {
            Self::Http(timeouts) => Arc::new(HttpFetcher::with_timeouts(*timeouts)?),
            Self::Simulated(simulated) => Arc::new(simulated.clone()),
        })
    }
}

/// Runs one fetch, converting a panic inside the fetcher into
/// [`FailureKind::Internal`].
///
/// The returned result always carries `task.index`.
pub async fn fetch_guarded(
    fetcher: &dyn ImageFetcher,
    task: &DownloadTask,
    destination_dir: &Path,
) -> DownloadResult {
    match AssertUnwindSafe(fetcher.fetch_and_store(task, destination_dir))
        .catch_unwind()
        .await
    {
        Ok(result) if result.index == task.index => result,
        Ok(result) => {
            warn!(
                expected = task.index,
                reported = result.index,
                "fetcher reported a foreign index; keeping the task index"
            );
            DownloadResult {
                index: task.index,
                outcome: result.outcome,
            }
        }
        Err(panic) => {
            warn!(
                index = task.index,
                url = %task.url,
                panic = panic_message(panic.as_ref()),
                "fetcher panicked"
            );
            DownloadResult::failure(task.index, FailureKind::Internal)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    struct PanickingFetcher;

    #[async_trait]
    impl ImageFetcher for PanickingFetcher {
        async fn fetch_and_store(&self, _task: &DownloadTask, _dir: &Path) -> DownloadResult {
            panic!("boom");
        }
    }

    struct WrongIndexFetcher;

    #[async_trait]
    impl ImageFetcher for WrongIndexFetcher {
        async fn fetch_and_store(&self, _task: &DownloadTask, _dir: &Path) -> DownloadResult {
            DownloadResult::success(999, 1)
        }
    }

    #[tokio::test]
    async fn test_fetch_guarded_maps_panic_to_internal() {
        let temp_dir = TempDir::new().unwrap();
        let task = DownloadTask::new("https://example.com/a.jpg", 3);

        let result = fetch_guarded(&PanickingFetcher, &task, temp_dir.path()).await;

        assert_eq!(result, DownloadResult::failure(3, FailureKind::Internal));
    }

    #[tokio::test]
    async fn test_fetch_guarded_keeps_task_index() {
        let temp_dir = TempDir::new().unwrap();
        let task = DownloadTask::new("https://example.com/a.jpg", 5);

        let result = fetch_guarded(&WrongIndexFetcher, &task, temp_dir.path()).await;

        assert_eq!(result, DownloadResult::success(5, 1));
    }

    #[test]
    fn test_fetcher_spec_wire_shape() {
        let spec = FetcherSpec::Simulated(SimulatedFetcher::new(Duration::from_millis(5)));
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains(r#""type":"simulated""#), "got {json}");

        let decoded: FetcherSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, spec);
    }

    #[tokio::test]
    async fn test_fetcher_spec_builds_simulated_fetcher() {
        let temp_dir = TempDir::new().unwrap();
        let spec = FetcherSpec::Simulated(SimulatedFetcher::new(Duration::ZERO).failing_on([1]));
        let fetcher = spec.build().unwrap();

        let ok = fetcher
            .fetch_and_store(&DownloadTask::new("sim://0", 0), temp_dir.path())
            .await;
        let failed = fetcher
            .fetch_and_store(&DownloadTask::new("sim://1", 1), temp_dir.path())
            .await;

        assert!(ok.is_success());
        assert_eq!(failed.failure_kind(), Some(FailureKind::Network));
        assert_eq!(fetcher.spec(), Some(spec));
    }
}
