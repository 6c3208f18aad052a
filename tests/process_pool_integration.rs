//! Integration tests for the process pool against the real worker binary.

mod support;

use std::sync::Arc;
use std::time::Duration;

use image_bench_core::fetch::{HttpFetcher, ImageFetcher, SimulatedFetcher};
use image_bench_core::strategy::{ExecutionStrategy, WorkerProbe};
use image_bench_core::{DownloadTask, FailureKind};
use support::{process_pool, tasks};
use tempfile::TempDir;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_process_pool_reaps_every_worker() {
    let temp_dir = TempDir::new().expect("temp dir");
    let probe = WorkerProbe::new();
    let fetcher: Arc<dyn ImageFetcher> =
        Arc::new(SimulatedFetcher::new(Duration::from_millis(20)));

    let run = process_pool()
        .with_probe(probe.clone())
        .run(&tasks(6), fetcher, temp_dir.path(), 3)
        .await
        .expect("run should succeed");

    assert_eq!(run.succeeded(), 6);
    assert_eq!(probe.started(), 3);
    assert_eq!(probe.active(), 0, "no worker process may outlive the run");
    assert!(probe.peak() <= 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_process_pool_idle_workers_exit_cleanly() {
    let temp_dir = TempDir::new().expect("temp dir");
    let probe = WorkerProbe::new();
    let fetcher: Arc<dyn ImageFetcher> = Arc::new(SimulatedFetcher::new(Duration::ZERO));

    let run = process_pool()
        .with_probe(probe.clone())
        .run(&tasks(2), fetcher, temp_dir.path(), 6)
        .await
        .expect("run should succeed");

    assert_eq!(run.results.len(), 2);
    assert_eq!(run.succeeded(), 2);
    assert_eq!(probe.started(), 6);
    assert_eq!(probe.active(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_process_pool_overlaps_tasks_across_workers() {
    const LATENCY_MS: u64 = 200;
    let temp_dir = TempDir::new().expect("temp dir");
    let fetcher: Arc<dyn ImageFetcher> =
        Arc::new(SimulatedFetcher::new(Duration::from_millis(LATENCY_MS)));

    let run = process_pool()
        .run(&tasks(10), fetcher, temp_dir.path(), 5)
        .await
        .expect("run should succeed");

    assert_eq!(run.succeeded(), 10);
    assert!(run.elapsed >= Duration::from_millis(2 * LATENCY_MS));
    assert!(
        run.elapsed < Duration::from_millis(10 * LATENCY_MS),
        "five workers should beat one: {:?}",
        run.elapsed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_process_pool_workers_download_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/img/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-jpeg".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/missing$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut workload: Vec<DownloadTask> = (0..4)
        .map(|i| DownloadTask::new(format!("{}/img/{i}", server.uri()), i))
        .collect();
    workload.push(DownloadTask::new(format!("{}/missing", server.uri()), 4));

    let temp_dir = TempDir::new().expect("temp dir");
    let fetcher: Arc<dyn ImageFetcher> = Arc::new(HttpFetcher::new().expect("client"));

    let run = process_pool()
        .run(&workload, fetcher, temp_dir.path(), 2)
        .await
        .expect("run should succeed");

    let sorted = run.sorted_results();
    assert_eq!(sorted.len(), 5);
    assert!(sorted[..4].iter().all(|r| r.is_success()));
    assert_eq!(sorted[4].failure_kind(), Some(FailureKind::Network));
    for i in 0..4 {
        let bytes = std::fs::read(temp_dir.path().join(format!("image_{i}.jpg"))).expect("image");
        assert_eq!(bytes, b"fake-jpeg");
    }
    assert!(!temp_dir.path().join("image_4.jpg").exists());
}

/// One worker process exits after reading its first task; the others keep
/// draining the queue and only the stranded task is lost.
#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_process_pool_siblings_finish_after_worker_dies() {
    // The first wrapper to claim the marker dies mid-task; the rest exec the real worker.
    const WRAPPER: &str =
        r#"if mkdir "$0/dead" 2>/dev/null; then read init; read task; exit 1; else exec "$1" worker; fi"#;

    let marker = TempDir::new().expect("marker dir");
    let temp_dir = TempDir::new().expect("temp dir");
    let probe = WorkerProbe::new();
    let fetcher: Arc<dyn ImageFetcher> =
        Arc::new(SimulatedFetcher::new(Duration::from_millis(20)));

    let run = image_bench_core::strategy::ProcessPool::new("sh")
        .with_args([
            std::ffi::OsStr::new("-c"),
            std::ffi::OsStr::new(WRAPPER),
            marker.path().as_os_str(),
            std::ffi::OsStr::new(support::BENCH_BIN),
        ])
        .with_probe(probe.clone())
        .run(&tasks(6), fetcher, temp_dir.path(), 3)
        .await
        .expect("run should succeed");

    assert_eq!(run.results.len(), 6);
    let lost: Vec<usize> = run
        .results
        .iter()
        .filter(|r| r.failure_kind() == Some(FailureKind::WorkerLost))
        .map(|r| r.index)
        .collect();
    assert_eq!(lost.len(), 1, "exactly the stranded task is lost: {lost:?}");
    assert_eq!(run.succeeded(), 5);
    assert!(!temp_dir.path().join(format!("image_{}.jpg", lost[0])).exists());
    assert_eq!(probe.started(), 3);
    assert_eq!(probe.active(), 0);
}
