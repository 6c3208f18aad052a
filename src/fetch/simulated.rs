//! Deterministic fetcher with fixed per-task latency.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::constants::SIMULATED_PAYLOAD_BYTES;
use super::error::FetchError;
use super::{FetcherSpec, ImageFetcher};
use crate::task::{DownloadResult, DownloadTask};

/// Fetcher that waits a fixed latency instead of touching the network.
///
/// After the wait it either fails the task (for indices registered with
/// [`failing_on`](Self::failing_on)) or writes a payload derived only from
/// the task index, so every strategy produces byte-identical files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedFetcher {
    latency_ms: u64,
    payload_bytes: u64,
    #[serde(default)]
    failing: BTreeSet<usize>,
}

impl SimulatedFetcher {
    /// Creates a fetcher that spends `latency` on every task.
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self {
            latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            payload_bytes: SIMULATED_PAYLOAD_BYTES,
            failing: BTreeSet::new(),
        }
    }

    /// Sets the number of bytes written per successful task.
    #[must_use]
    pub fn with_payload_bytes(mut self, payload_bytes: u64) -> Self {
        self.payload_bytes = payload_bytes;
        self
    }

    /// Makes the given task indices fail with a network error.
    #[must_use]
    pub fn failing_on(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.failing.extend(indices);
        self
    }

    /// Per-task latency.
    #[must_use]
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    async fn store(&self, task: &DownloadTask, destination_dir: &Path) -> Result<u64, FetchError> {
        tokio::time::sleep(self.latency()).await;

        if self.failing.contains(&task.index) {
            return Err(FetchError::Simulated { index: task.index });
        }

        tokio::fs::create_dir_all(destination_dir)
            .await
            .map_err(|e| FetchError::io(destination_dir, e))?;

        let file_path = destination_dir.join(task.file_name());
        let payload = payload_for(task.index, self.payload_bytes);
        tokio::fs::write(&file_path, &payload)
            .await
            .map_err(|e| FetchError::io(file_path, e))?;

        Ok(self.payload_bytes)
    }
}

fn payload_for(index: usize, len: u64) -> Vec<u8> {
    #[allow(clippy::cast_possible_truncation)]
    let seed = (index % 251) as u8;
    (0..len)
        .map(|i| {
            #[allow(clippy::cast_possible_truncation)]
            let offset = (i % 256) as u8;
            seed.wrapping_add(offset)
        })
        .collect()
}

#[async_trait]
impl ImageFetcher for SimulatedFetcher {
    #[instrument(skip(self, destination_dir), fields(index = task.index))]
    async fn fetch_and_store(
        &self,
        task: &DownloadTask,
        destination_dir: &Path,
    ) -> DownloadResult {
        match self.store(task, destination_dir).await {
            Ok(bytes) => {
                debug!(bytes, "simulated image stored");
                DownloadResult::success(task.index, bytes)
            }
            Err(e) => {
                warn!(error = %e, "simulated fetch failed");
                DownloadResult::failure(task.index, e.kind())
            }
        }
    }

    fn spec(&self) -> Option<FetcherSpec> {
        Some(FetcherSpec::Simulated(self.clone()))
    }
}
