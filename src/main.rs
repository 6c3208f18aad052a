//! CLI entry point for the image-bench tool.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use image_bench_core::fetch::{HttpFetcher, ImageFetcher, SimulatedFetcher};
use image_bench_core::listing::{PicsumLister, SyntheticLister, UrlLister};
use image_bench_core::strategy::{ProcessPool, worker};
use image_bench_core::{
    Benchmark, BenchmarkReport, BenchmarkRun, JsonReport, ReportRenderer, TextReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

mod app_config;
mod cli;

use app_config::BenchConfig;
use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(&args);
    debug!(?args, "CLI arguments parsed");

    if args.command == Some(Command::Worker) {
        let served = worker::serve_stdio().await?;
        debug!(served, "worker exiting");
        return Ok(());
    }

    let config = BenchConfig::from_args(&args)?;
    info!(
        count = config.count,
        min_workers = config.worker_range.start(),
        max_workers = config.worker_range.end(),
        simulated = config.is_simulated(),
        "image-bench starting"
    );

    let report = run_benchmark(&config, &args).await?;

    TextReport
        .render(&report, &mut io::stdout().lock())
        .context("failed to print report")?;

    if let Some(path) = &config.json_path {
        write_json(&report, path)?;
        info!(path = %path.display(), "JSON report written");
    }
    Ok(())
}

/// Log level priority: `RUST_LOG` > quiet flag > verbose flag > default.
///
/// Logs go to stderr: stdout carries the report, or the protocol when
/// running as a pool worker.
fn init_tracing(args: &Args) {
    let is_worker = args.command == Some(Command::Worker);
    let default_level = if args.quiet {
        "error"
    } else {
        match (args.verbose, is_worker) {
            (0, true) => "warn",
            (0, false) => "info",
            (1, _) => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run_benchmark(config: &BenchConfig, args: &Args) -> Result<BenchmarkReport> {
    let (lister, fetcher): (Arc<dyn UrlLister>, Arc<dyn ImageFetcher>) =
        match config.simulate_latency {
            Some(latency) => (
                Arc::new(SyntheticLister),
                Arc::new(SimulatedFetcher::new(latency)),
            ),
            None => (
                Arc::new(
                    PicsumLister::new(&config.base_url, config.timeouts)?
                        .with_image_size(config.image_size),
                ),
                Arc::new(HttpFetcher::with_timeouts(config.timeouts)?),
            ),
        };

    let benchmark = Benchmark::new(lister, fetcher, &config.output_dir)
        .with_process_pool(ProcessPool::current_exe()?.with_args(args.worker_args()));

    let progress = progress_bar(benchmark.planned_runs(&config.worker_range), args.quiet);
    let observer = progress.clone();
    let benchmark = benchmark.with_observer(Box::new(move |run: &BenchmarkRun| {
        observer.set_message(format!(
            "{} x{} {:.2}s",
            run.sample.strategy, run.sample.worker_count, run.sample.elapsed_seconds
        ));
        observer.inc(1);
    }));

    let result = benchmark
        .run(config.count, config.worker_range.clone())
        .await;
    progress.finish_and_clear();
    Ok(result?)
}

fn progress_bar(total_runs: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(u64::try_from(total_runs).unwrap_or(u64::MAX));
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{pos}/{len}] runs {wide_bar} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn write_json(report: &BenchmarkReport, path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    JsonReport
        .render(report, &mut writer)
        .with_context(|| format!("failed to write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
