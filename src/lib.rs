//! Image Bench Core Library
//!
//! Measures how one I/O-bound workload (downloading a batch of images)
//! behaves under three execution regimes: sequential, a pool of OS
//! threads, and a pool of OS processes.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`listing`] - Fetches the list of image URLs forming the workload
//! - [`fetch`] - Downloads one image and stores it on disk
//! - [`strategy`] - Sequential, thread-pool and process-pool executors
//! - [`bench`] - Runs every strategy over one workload and collects timings
//! - [`report`] - Text and JSON rendering of the collected timings

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bench;
pub mod fetch;
pub mod listing;
pub mod report;
pub mod strategy;
pub mod task;
mod user_agent;

// Re-export commonly used types
pub use bench::{Benchmark, BenchmarkError, BenchmarkReport, BenchmarkRun, TimingSample};
pub use fetch::{FetchError, HttpFetcher, HttpTimeouts, ImageFetcher, SimulatedFetcher};
pub use listing::{ListError, PicsumLister, SyntheticLister, UrlLister};
pub use report::{JsonReport, RenderError, ReportRenderer, TextReport};
pub use strategy::{
    ExecutionStrategy, ProcessPool, Sequential, StrategyError, StrategyKind, StrategyRun,
    ThreadPool,
};
pub use task::{DownloadResult, DownloadTask, FailureKind, Outcome};
