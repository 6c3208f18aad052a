//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::app_config::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_COUNT, DEFAULT_IMAGE_HEIGHT, DEFAULT_IMAGE_WIDTH,
    DEFAULT_MAX_WORKERS, DEFAULT_MIN_WORKERS, DEFAULT_OUTPUT_DIR, DEFAULT_TIMEOUT_SECS,
};
use image_bench_core::listing::DEFAULT_LISTING_BASE_URL;

/// Benchmark image downloads sequentially, on a thread pool and on a
/// process pool.
///
/// Lists a batch of images once, downloads it with every strategy and
/// worker count, and prints the wall-clock time of each run.
#[derive(Parser, Debug)]
#[command(name = "image-bench")]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Number of images in the workload (0-100)
    #[arg(short = 'n', long, default_value_t = DEFAULT_COUNT, value_parser = clap::value_parser!(u16).range(0..=100))]
    pub count: u16,

    /// Smallest worker count to benchmark (1-64)
    #[arg(long, default_value_t = DEFAULT_MIN_WORKERS, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub min_workers: u8,

    /// Largest worker count to benchmark (1-64)
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub max_workers: u8,

    /// Directory the images are written to
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Base URL of the image listing service
    #[arg(long, default_value = DEFAULT_LISTING_BASE_URL)]
    pub base_url: String,

    /// Width of the requested images in pixels
    #[arg(long, default_value_t = DEFAULT_IMAGE_WIDTH, value_parser = clap::value_parser!(u32).range(1..=5000))]
    pub image_width: u32,

    /// Height of the requested images in pixels
    #[arg(long, default_value_t = DEFAULT_IMAGE_HEIGHT, value_parser = clap::value_parser!(u32).range(1..=5000))]
    pub image_height: u32,

    /// Connection timeout per request in seconds (1-3600)
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout_secs: u64,

    /// Total timeout per request in seconds (1-3600)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout_secs: u64,

    /// Skip the network: synthesize the workload and sleep this long per image (max 60000)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub simulate_latency_ms: Option<u64>,

    /// Also write the report as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,
}

impl Args {
    /// Command line for a process-pool worker carrying this run's verbosity.
    pub fn worker_args(&self) -> Vec<String> {
        let mut args = vec!["worker".to_string()];
        if self.quiet {
            args.push("--quiet".to_string());
        } else if self.verbose > 0 {
            args.push(format!("-{}", "v".repeat(usize::from(self.verbose))));
        }
        args
    }
}

/// Subcommands. The benchmark itself runs when none is given.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Serve download tasks on stdin/stdout for the process pool
    #[command(hide = true)]
    Worker,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["image-bench"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.count, 10);
        assert_eq!(args.min_workers, 1);
        assert_eq!(args.max_workers, 10);
        assert_eq!(args.output_dir, PathBuf::from("./images"));
        assert_eq!(args.base_url, "https://picsum.photos");
        assert_eq!((args.image_width, args.image_height), (640, 480));
        assert_eq!(args.connect_timeout_secs, 10);
        assert_eq!(args.timeout_secs, 30);
        assert!(args.simulate_latency_ms.is_none());
        assert!(args.json.is_none());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["image-bench", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["image-bench", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["image-bench", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["image-bench", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["image-bench", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["image-bench", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_worker_range_flags() {
        let args =
            Args::try_parse_from(["image-bench", "--min-workers", "2", "--max-workers", "8"])
                .unwrap();
        assert_eq!((args.min_workers, args.max_workers), (2, 8));
    }

    #[test]
    fn test_cli_zero_workers_rejected() {
        let err = Args::try_parse_from(["image-bench", "--min-workers", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_workers_above_max_rejected() {
        let err = Args::try_parse_from(["image-bench", "--max-workers", "65"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_count_short_flag_and_bounds() {
        let args = Args::try_parse_from(["image-bench", "-n", "0"]).unwrap();
        assert_eq!(args.count, 0);

        let err = Args::try_parse_from(["image-bench", "-n", "101"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_simulate_and_json_flags() {
        let args = Args::try_parse_from([
            "image-bench",
            "--simulate-latency-ms",
            "50",
            "--json",
            "out/report.json",
        ])
        .unwrap();
        assert_eq!(args.simulate_latency_ms, Some(50));
        assert_eq!(args.json, Some(PathBuf::from("out/report.json")));
    }

    #[test]
    fn test_cli_worker_subcommand() {
        let args = Args::try_parse_from(["image-bench", "worker"]).unwrap();
        assert_eq!(args.command, Some(Command::Worker));

        let args = Args::try_parse_from(["image-bench", "worker", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);
    }

    #[test]
    fn test_cli_worker_args_forward_verbosity() {
        let args = Args::try_parse_from(["image-bench"]).unwrap();
        assert_eq!(args.worker_args(), vec!["worker"]);

        let args = Args::try_parse_from(["image-bench", "-q"]).unwrap();
        assert_eq!(args.worker_args(), vec!["worker", "--quiet"]);

        let args = Args::try_parse_from(["image-bench", "-vv"]).unwrap();
        assert_eq!(args.worker_args(), vec!["worker", "-vv"]);

        let forwarded = Args::try_parse_from(
            std::iter::once("image-bench".to_string()).chain(
                Args::try_parse_from(["image-bench", "-q"])
                    .unwrap()
                    .worker_args(),
            ),
        )
        .unwrap();
        assert_eq!(forwarded.command, Some(Command::Worker));
        assert!(forwarded.quiet);
    }

    #[test]
    fn test_cli_timeout_zero_rejected() {
        let err = Args::try_parse_from(["image-bench", "--timeout-secs", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
