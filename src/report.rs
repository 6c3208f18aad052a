//! Rendering a [`BenchmarkReport`] for humans or machines.

use std::io::Write;

use thiserror::Error;

use crate::bench::{BenchmarkReport, BenchmarkRun};

/// Width of the proportional bar for the slowest run.
const BAR_WIDTH: usize = 40;

/// Errors while writing a report.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Writing to the output failed.
    #[error("failed to write report: {0}")]
    Io(#[source] std::io::Error),

    /// The report could not be serialized.
    #[error("failed to serialize report: {0}")]
    Json(#[source] serde_json::Error),
}

/// Writes a report in one output format.
pub trait ReportRenderer {
    /// Renders `report` to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if writing or serialization fails.
    fn render(&self, report: &BenchmarkReport, out: &mut dyn Write) -> Result<(), RenderError>;
}

/// Plain-text table with one row per run.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReport;

impl ReportRenderer for TextReport {
    fn render(&self, report: &BenchmarkReport, out: &mut dyn Write) -> Result<(), RenderError> {
        write_text(report, out).map_err(RenderError::Io)
    }
}

fn write_text(report: &BenchmarkReport, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "Benchmark: {} images", report.task_count)?;
    if report.runs.is_empty() {
        return writeln!(out, "(no runs recorded)");
    }

    let slowest = report
        .runs
        .iter()
        .map(|run| run.sample.elapsed_seconds)
        .fold(0.0_f64, f64::max);

    writeln!(
        out,
        "{:<10} {:>7} {:>9} {:>5} {:>6}  bar",
        "strategy", "workers", "seconds", "ok", "failed"
    )?;
    for run in &report.runs {
        write_row(out, run, slowest)?;
    }

    if let Some(baseline) = report.baseline() {
        writeln!(out)?;
        writeln!(
            out,
            "baseline (sequential): {:.3}s",
            baseline.elapsed_seconds
        )?;
    }
    let degraded = report.degraded_runs().count();
    if degraded > 0 {
        writeln!(out, "{degraded} run(s) degraded (*): some downloads failed")?;
    }
    Ok(())
}

fn write_row(out: &mut dyn Write, run: &BenchmarkRun, slowest: f64) -> std::io::Result<()> {
    let marker = if run.is_degraded() { "*" } else { "" };
    writeln!(
        out,
        "{:<10} {:>7} {:>9.3} {:>5} {:>6}  {}{}",
        run.sample.strategy.as_str(),
        run.sample.worker_count,
        run.sample.elapsed_seconds,
        run.succeeded,
        run.failed,
        bar(run.sample.elapsed_seconds, slowest),
        marker
    )
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn bar(seconds: f64, slowest: f64) -> String {
    if slowest <= 0.0 {
        return String::new();
    }
    let filled = ((seconds / slowest) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(filled.clamp(1, BAR_WIDTH))
}

/// Pretty-printed JSON of the whole report.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReport;

impl ReportRenderer for JsonReport {
    fn render(&self, report: &BenchmarkReport, out: &mut dyn Write) -> Result<(), RenderError> {
        serde_json::to_writer_pretty(&mut *out, report).map_err(RenderError::Json)?;
        writeln!(out).map_err(RenderError::Io)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bench::TimingSample;
    use crate::strategy::StrategyKind;

    fn run(strategy: StrategyKind, workers: usize, secs: f64, failed: usize) -> BenchmarkRun {
        BenchmarkRun {
            sample: TimingSample {
                strategy,
                worker_count: workers,
                elapsed_seconds: secs,
            },
            succeeded: 4 - failed,
            failed,
        }
    }

    fn report() -> BenchmarkReport {
        BenchmarkReport {
            task_count: 4,
            runs: vec![
                run(StrategyKind::Sequential, 1, 2.0, 0),
                run(StrategyKind::Thread, 2, 1.0, 0),
                run(StrategyKind::Process, 2, 1.2, 1),
            ],
        }
    }

    fn render_text(report: &BenchmarkReport) -> String {
        let mut out = Vec::new();
        TextReport.render(report, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_report_has_row_per_run_and_baseline() {
        let text = render_text(&report());

        assert!(text.starts_with("Benchmark: 4 images"));
        assert!(text.contains("sequential"));
        assert!(text.contains("thread"));
        assert!(text.contains("process"));
        assert!(text.contains("baseline (sequential): 2.000s"));
        assert!(text.contains("1 run(s) degraded"));
    }

    #[test]
    fn test_text_report_bar_scales_with_time() {
        let text = render_text(&report());
        let bars: Vec<usize> = text
            .lines()
            .filter(|line| line.contains('#'))
            .map(|line| line.chars().filter(|&c| c == '#').count())
            .collect();
        assert_eq!(bars, vec![BAR_WIDTH, BAR_WIDTH / 2, 24]);
    }

    #[test]
    fn test_text_report_marks_degraded_row() {
        let text = render_text(&report());
        let process_row = text
            .lines()
            .find(|line| line.starts_with("process"))
            .unwrap();
        assert!(process_row.ends_with('*'));
    }

    #[test]
    fn test_text_report_empty() {
        let text = render_text(&BenchmarkReport::new(0));
        assert!(text.contains("no runs recorded"));
    }

    #[test]
    fn test_json_report_round_trips() {
        let mut out = Vec::new();
        JsonReport.render(&report(), &mut out).unwrap();

        let parsed: BenchmarkReport = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, report());
    }
}
