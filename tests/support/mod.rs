//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use image_bench_core::fetch::ImageFetcher;
use image_bench_core::strategy::ProcessPool;
use image_bench_core::{DownloadResult, DownloadTask};

/// Path of the built benchmark binary, used as the process-pool worker.
pub const BENCH_BIN: &str = env!("CARGO_BIN_EXE_image-bench");

/// `n` tasks with synthetic URLs and indices `0..n`.
pub fn tasks(n: usize) -> Vec<DownloadTask> {
    (0..n)
        .map(|i| DownloadTask::new(format!("sim://image/{i}"), i))
        .collect()
}

/// Process pool running the built binary in worker mode.
pub fn process_pool() -> ProcessPool {
    ProcessPool::new(BENCH_BIN)
}

/// Indices of the results, sorted.
pub fn indices(results: &[DownloadResult]) -> Vec<usize> {
    let mut indices: Vec<usize> = results.iter().map(|r| r.index).collect();
    indices.sort_unstable();
    indices
}

/// Indices of the failed results, as a set.
pub fn failed_indices(results: &[DownloadResult]) -> BTreeSet<usize> {
    results
        .iter()
        .filter(|r| !r.is_success())
        .map(|r| r.index)
        .collect()
}

/// Fetcher that panics on one index and succeeds elsewhere. In-process only.
pub struct PanickingFetcher {
    pub panic_on: usize,
}

#[async_trait]
impl ImageFetcher for PanickingFetcher {
    async fn fetch_and_store(&self, task: &DownloadTask, _dir: &Path) -> DownloadResult {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_ne!(task.index, self.panic_on, "fetcher blew up on purpose");
        DownloadResult::success(task.index, 1)
    }
}
