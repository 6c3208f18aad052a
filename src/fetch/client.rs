//! HTTP fetcher that streams images to disk.
//!
//! This module provides the [`HttpFetcher`] which handles streaming
//! downloads with bounded timeouts and per-task error reporting.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};

use super::constants::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};
use super::error::FetchError;
use super::{FetcherSpec, ImageFetcher};
use crate::task::{DownloadResult, DownloadTask};
use crate::user_agent;

/// Timeouts applied to every image request. Both are always finite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpTimeouts {
    /// Maximum time to establish a connection.
    pub connect_secs: u64,
    /// Maximum time for the whole request, body included.
    pub request_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: CONNECT_TIMEOUT_SECS,
            request_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

/// HTTP image fetcher with streaming support.
///
/// Created once and shared by every worker of a strategy (thread-pool
/// workers clone it, which shares the connection pool).
///
/// # Example
///
/// ```no_run
/// use image_bench_core::fetch::{HttpFetcher, HttpTimeouts};
///
/// let fetcher = HttpFetcher::with_timeouts(HttpTimeouts {
///     connect_secs: 5,
///     request_secs: 20,
/// })
/// .expect("static client configuration");
/// ```
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeouts: HttpTimeouts,
}

impl HttpFetcher {
    /// Creates a fetcher with the default timeouts (10 s connect, 30 s total).
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the client cannot be created.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeouts(HttpTimeouts::default())
    }

    /// Creates a fetcher with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the client cannot be created.
    #[instrument(level = "debug")]
    pub fn with_timeouts(timeouts: HttpTimeouts) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()?;
        Ok(Self { client, timeouts })
    }

    /// Returns the configured timeouts.
    #[must_use]
    pub fn timeouts(&self) -> HttpTimeouts {
        self.timeouts
    }

    /// Downloads `task.url` into `destination_dir/image_{index}.jpg`.
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if:
    /// - The request fails or times out
    /// - The server returns a non-success status
    /// - Creating the directory or writing the file fails
    pub async fn download_to_file(
        &self,
        task: &DownloadTask,
        destination_dir: &Path,
    ) -> Result<u64, FetchError> {
        let url = task.url.as_str();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        tokio::fs::create_dir_all(destination_dir)
            .await
            .map_err(|e| FetchError::io(destination_dir, e))?;

        let file_path = destination_dir.join(task.file_name());
        let mut file = File::create(&file_path)
            .await
            .map_err(|e| FetchError::io(file_path.clone(), e))?;

        let stream_result = stream_to_file(&mut file, response, url, &file_path).await;

        if stream_result.is_err() {
            debug!(path = %file_path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(&file_path).await;
        }

        stream_result
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    #[instrument(skip(self, destination_dir), fields(index = task.index, url = %task.url))]
    async fn fetch_and_store(
        &self,
        task: &DownloadTask,
        destination_dir: &Path,
    ) -> DownloadResult {
        match self.download_to_file(task, destination_dir).await {
            Ok(bytes) => {
                debug!(bytes, "image stored");
                DownloadResult::success(task.index, bytes)
            }
            Err(e) => {
                warn!(error = %e, "image fetch failed");
                DownloadResult::failure(task.index, e.kind())
            }
        }
    }

    fn spec(&self) -> Option<FetcherSpec> {
        Some(FetcherSpec::Http(self.timeouts))
    }
}

/// Streams response body to file, returning bytes written.
///
/// This is extracted to enable cleanup on error in the caller.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}
