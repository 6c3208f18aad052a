//! Benchmark configuration resolved from command-line arguments.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use image_bench_core::fetch::HttpTimeouts;
use image_bench_core::fetch::constants::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};
use image_bench_core::listing::ImageSize;
use image_bench_core::strategy::{MAX_WORKERS, MIN_WORKERS};
use url::Url;

pub const DEFAULT_COUNT: u16 = 10;
pub const DEFAULT_MIN_WORKERS: u8 = 1;
pub const DEFAULT_MAX_WORKERS: u8 = 10;
pub const DEFAULT_OUTPUT_DIR: &str = "./images";
pub const DEFAULT_IMAGE_WIDTH: u32 = 640;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 480;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = CONNECT_TIMEOUT_SECS;
pub const DEFAULT_TIMEOUT_SECS: u64 = REQUEST_TIMEOUT_SECS;

/// Largest workload one listing page can hold.
const MAX_COUNT: usize = 100;

/// Fully resolved settings for one benchmark invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    /// Images in the workload.
    pub count: usize,
    /// Worker counts swept for the thread and process pools.
    pub worker_range: RangeInclusive<usize>,
    /// Where images are written.
    pub output_dir: PathBuf,
    /// Listing service base URL.
    pub base_url: String,
    /// Size of the requested images.
    pub image_size: ImageSize,
    /// Per-request timeouts.
    pub timeouts: HttpTimeouts,
    /// Synthetic workload with this per-image latency instead of the network.
    pub simulate_latency: Option<Duration>,
    /// Optional JSON report destination.
    pub json_path: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            count: usize::from(DEFAULT_COUNT),
            worker_range: usize::from(DEFAULT_MIN_WORKERS)..=usize::from(DEFAULT_MAX_WORKERS),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            base_url: image_bench_core::listing::DEFAULT_LISTING_BASE_URL.to_string(),
            image_size: ImageSize {
                width: DEFAULT_IMAGE_WIDTH,
                height: DEFAULT_IMAGE_HEIGHT,
            },
            timeouts: HttpTimeouts {
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
                request_secs: DEFAULT_TIMEOUT_SECS,
            },
            simulate_latency: None,
            json_path: None,
        }
    }
}

impl BenchConfig {
    /// Builds and validates the configuration from parsed CLI arguments.
    pub fn from_args(args: &crate::cli::Args) -> Result<Self> {
        let config = Self {
            count: usize::from(args.count),
            worker_range: usize::from(args.min_workers)..=usize::from(args.max_workers),
            output_dir: args.output_dir.clone(),
            base_url: args.base_url.clone(),
            image_size: ImageSize {
                width: args.image_width,
                height: args.image_height,
            },
            timeouts: HttpTimeouts {
                connect_secs: args.connect_timeout_secs,
                request_secs: args.timeout_secs,
            },
            simulate_latency: args.simulate_latency_ms.map(Duration::from_millis),
            json_path: args.json.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if self.count > MAX_COUNT {
            bail!(
                "Invalid config value for `count`: {}. Expected range: 0..={MAX_COUNT}",
                self.count
            );
        }

        let (min, max) = (*self.worker_range.start(), *self.worker_range.end());
        validate_workers("min_workers", min)?;
        validate_workers("max_workers", max)?;
        if min > max {
            bail!("Invalid worker range: `min_workers` ({min}) exceeds `max_workers` ({max})");
        }

        validate_timeout_secs("connect_timeout_secs", self.timeouts.connect_secs)?;
        validate_timeout_secs("timeout_secs", self.timeouts.request_secs)?;
        if self.timeouts.connect_secs > self.timeouts.request_secs {
            bail!(
                "Invalid timeouts: `connect_timeout_secs` ({}) exceeds `timeout_secs` ({})",
                self.timeouts.connect_secs,
                self.timeouts.request_secs
            );
        }

        if self.simulate_latency.is_none() {
            Url::parse(&self.base_url)
                .with_context(|| format!("Invalid config value for `base_url`: {}", self.base_url))?;
        }
        Ok(())
    }

    /// Whether the run uses the synthetic workload.
    pub fn is_simulated(&self) -> bool {
        self.simulate_latency.is_some()
    }
}

fn validate_workers(field: &str, value: usize) -> Result<()> {
    if !(MIN_WORKERS..=MAX_WORKERS).contains(&value) {
        bail!(
            "Invalid config value for `{field}`: {value}. Expected range: {MIN_WORKERS}..={MAX_WORKERS}"
        );
    }
    Ok(())
}

fn validate_timeout_secs(field: &str, value: u64) -> Result<()> {
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}
