//! Export artifacts and human-readable output
//!
//! Every exporter renders the whole artifact in memory and then moves it into
//! place, so a failed export never leaves a truncated file behind. Missing
//! parent directories are created.

mod excel;
mod html;

pub use excel::to_excel;
pub use html::to_html_report;

use anyhow::{Context, Result};
use protobench_core::{BenchmarkComparison, BenchmarkRun, RunSummary, SummaryStats};
use protobench_store::StoreStats;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column order shared by the CSV and spreadsheet exports
pub const METRIC_COLUMNS: [&str; 4] =
    ["request_id", "request_timestamp", "response_timestamp", "latency_seconds"];

/// Export artifact format
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    #[default]
    Json,
    Html,
    #[serde(alias = "xlsx")]
    #[value(alias = "xlsx")]
    Excel,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
            ExportFormat::Excel => "xlsx",
        }
    }

    /// Whether a single artifact holds any number of runs
    pub fn is_multi_run(self) -> bool {
        matches!(self, ExportFormat::Html | ExportFormat::Excel)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
            ExportFormat::Excel => "excel",
        };
        f.write_str(name)
    }
}

/// Rendering options shared by the exporters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub pretty: bool,
    pub title: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { pretty: true, title: "Benchmark Report".to_string() }
    }
}

/// Per-artifact outcome of a batch export
#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, anyhow::Error)>,
}

impl ExportReport {
    pub fn record(&mut self, path: PathBuf, result: Result<()>) {
        match result {
            Ok(()) => {
                tracing::debug!("Wrote {}", path.display());
                self.written.push(path);
            }
            Err(err) => {
                tracing::warn!("Failed to write {}: {:#}", path.display(), err);
                self.failed.push((path, err));
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn print(&self) {
        for path in &self.written {
            println!("✓ Exported to {}", path.display());
        }
        for (path, err) in &self.failed {
            println!("✗ Failed to export {}: {:#}", path.display(), err);
        }
    }
}

/// Write bytes to `path` through a temporary file in the same directory
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    tmp.write_all(data)
        .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move export into place: {}", path.display()))?;
    Ok(())
}

#[derive(Serialize)]
struct CsvRow<'a> {
    request_id: u64,
    request_timestamp: &'a str,
    response_timestamp: &'a str,
    latency_seconds: f64,
}

/// Render a run's metrics as CSV
pub fn render_csv(run: &BenchmarkRun) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(METRIC_COLUMNS)?;
    for metric in &run.metrics {
        writer.serialize(CsvRow {
            request_id: metric.request_id,
            request_timestamp: &metric.request_timestamp,
            response_timestamp: &metric.response_timestamp,
            latency_seconds: metric.latency_seconds,
        })?;
    }
    writer.into_inner().map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e.error()))
}

/// Export a run's metrics as CSV, one row per metric in stored order
pub fn to_csv(run: &BenchmarkRun, path: &Path) -> Result<()> {
    write_atomic(path, &render_csv(run)?)
}

/// Serialize any value as a JSON document
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };
    write_atomic(path, &json)
}

/// Export the full run structure as JSON
pub fn to_json(run: &BenchmarkRun, path: &Path, pretty: bool) -> Result<()> {
    write_json(run, path, pretty)
}

/// Export a single run in the given format
pub fn export_run(
    run: &BenchmarkRun,
    format: ExportFormat,
    path: &Path,
    options: &ExportOptions,
) -> Result<()> {
    match format {
        ExportFormat::Csv => to_csv(run, path),
        ExportFormat::Json => to_json(run, path, options.pretty),
        ExportFormat::Html => to_html_report(std::slice::from_ref(run), path, &options.title),
        ExportFormat::Excel => to_excel(std::slice::from_ref(run), path),
    }
}

/// Export a comparison into `dir`, one artifact per requested format
///
/// CSV produces one file per run. Failures are reported per artifact and do
/// not stop the remaining ones.
pub fn export_comparison(
    comparison: &BenchmarkComparison,
    dir: &Path,
    formats: &[ExportFormat],
    options: &ExportOptions,
) -> ExportReport {
    let mut report = ExportReport::default();
    let runs: Vec<BenchmarkRun> = comparison.runs().cloned().collect();
    let base = &comparison.run_id;
    let title = format!("{} - {}", options.title, comparison.run_id);

    let mut seen = Vec::new();
    for &format in formats {
        if seen.contains(&format) {
            continue;
        }
        seen.push(format);

        match format {
            ExportFormat::Json => {
                let path = dir.join(format!("{base}.json"));
                let result = write_json(comparison, &path, options.pretty);
                report.record(path, result);
            }
            ExportFormat::Html => {
                let path = dir.join(format!("{base}.html"));
                let result = to_html_report(&runs, &path, &title);
                report.record(path, result);
            }
            ExportFormat::Excel => {
                let path = dir.join(format!("{base}.xlsx"));
                let result = to_excel(&runs, &path);
                report.record(path, result);
            }
            ExportFormat::Csv => {
                for run in &runs {
                    let path = dir.join(format!("{}.csv", run.run_id));
                    let result = to_csv(run, &path);
                    report.record(path, result);
                }
            }
        }
    }

    report
}

fn fmt_ms(seconds: f64) -> String {
    format!("{:.3} ms", seconds * 1000.0)
}

fn print_stats(stats: &SummaryStats) {
    println!("  Samples:         {}", stats.count);
    if stats.is_empty() {
        return;
    }
    println!("  Min:             {}", fmt_ms(stats.min));
    println!("  Mean:            {}", fmt_ms(stats.mean));
    println!("  Median:          {}", fmt_ms(stats.median));
    println!("  Std Dev:         {}", fmt_ms(stats.std_dev));
    println!("  Max:             {}", fmt_ms(stats.max));
    for (label, value) in [("p50", stats.p50), ("p95", stats.p95), ("p99", stats.p99)] {
        if let Some(value) = value {
            println!("  {:<17}{}", format!("{label}:"), fmt_ms(value));
        }
    }
}

/// Print one run in human-readable form
pub fn print_run(run: &BenchmarkRun) {
    println!("\n{}", "=".repeat(60));
    println!("Benchmark Run: {}", run.run_id);
    println!("{}", "=".repeat(60));
    println!();
    println!("  Protocol:        {}", run.protocol);
    println!("  Timestamp:       {}", run.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Metrics:         {}", run.metrics.len());
    for (key, value) in &run.metadata {
        println!("  {:<17}{}", format!("{key}:"), value);
    }
    println!();
    println!("Latency:");
    match &run.stats {
        Some(stats) => print_stats(stats),
        None => println!("  (no statistics)"),
    }
    println!();
    println!("{}", "=".repeat(60));
}

/// Print run summaries as a table
pub fn print_runs_table(runs: &[RunSummary]) {
    if runs.is_empty() {
        println!("No runs found");
        return;
    }

    println!("\n{:<12} {:<35} {:<20} {:>12}", "Protocol", "Run ID", "Timestamp", "Mean");
    println!("{}", "-".repeat(82));
    for run in runs {
        let mean = run.stats.map(|s| s.mean).unwrap_or_default();
        println!(
            "{:<12} {:<35} {:<20} {:>12}",
            run.protocol,
            run.run_id,
            run.timestamp.format("%Y-%m-%d %H:%M:%S"),
            format!("{mean:.6}s")
        );
    }
}

/// Print aggregate store counts
pub fn print_store_stats(stats: &StoreStats) {
    println!("\n{}", "=".repeat(60));
    println!("Benchmark Database Statistics");
    println!("{}", "=".repeat(60));
    println!();
    println!("  Total Runs:      {}", stats.total_runs);
    println!("  Total Metrics:   {}", stats.total_metrics);
    println!();
    println!("Runs by Protocol:");
    if stats.protocols.is_empty() {
        println!("  (none)");
    }
    for (protocol, count) in &stats.protocols {
        println!("  {:<17}{}", format!("{protocol}:"), count);
    }
    println!();
    println!("{}", "=".repeat(60));
}

/// Print a latest-per-protocol comparison
pub fn print_comparison(comparison: &BenchmarkComparison) {
    println!("\n{}", "=".repeat(60));
    println!("Protocol Comparison: {}", comparison.run_id);
    println!("{}", "=".repeat(60));

    if comparison.is_empty() {
        println!("\nNo runs to compare");
        println!("\n{}", "=".repeat(60));
        return;
    }

    println!(
        "\n{:<12} {:>8} {:>12} {:>12} {:>12} {:>14}",
        "Protocol", "Samples", "Mean", "p95", "p99", "Mean 95% CI"
    );
    println!("{}", "-".repeat(75));
    for (protocol, summary) in &comparison.summary.protocols {
        let stats = summary.stats.unwrap_or_default();
        let pct = |v: Option<f64>| v.map(fmt_ms).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:>8} {:>12} {:>12} {:>12} {:>14}",
            protocol,
            summary.sample_count,
            fmt_ms(stats.mean),
            pct(stats.p95),
            pct(stats.p99),
            format!("±{}", fmt_ms(summary.mean_ci95))
        );
    }

    if let Some(fastest) = &comparison.summary.fastest_protocol {
        println!("\nFastest by mean latency: {fastest}");
    }
    println!("\n{}", "=".repeat(60));
}
