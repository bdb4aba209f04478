//! Subcommand implementations
//!
//! Batch commands (`import`, `export-all`, `compare --output`) process every
//! item, print one line per item and only fail once the whole batch is done.

use anyhow::{bail, Context, Result};
use protobench_core::normalize::{import_dir, ImportOutcome, ParserRegistry};
use protobench_core::{BenchmarkComparison, BenchmarkRun};
use protobench_store::{MetricsStore, RunQuery, StoreError};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::output::{self, ExportFormat, ExportReport};

/// Per-item tally of an import
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Runs whose id was already stored
    pub duplicates: usize,
    pub failed: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.imported + self.duplicates + self.failed
    }
}

/// Open the configured metrics store
pub fn open_store(config: &Config) -> Result<MetricsStore> {
    MetricsStore::open(&config.storage.path).with_context(|| {
        format!("Failed to open metrics database: {}", config.storage.path.display())
    })
}

/// Import legacy result files from `dir` and save each run
pub fn import(store: &MetricsStore, registry: &ParserRegistry, dir: &Path) -> ImportSummary {
    println!("Importing from {}...", dir.display());
    let report = import_dir(registry, dir);
    let mut summary = ImportSummary::default();

    if report.is_empty() {
        println!("No results found to import");
        return summary;
    }

    for outcome in &report.outcomes {
        match outcome {
            ImportOutcome::Imported { run, .. } => match store.save(run) {
                Ok(_) => {
                    summary.imported += 1;
                    println!(
                        "✓ Imported {}: {} metrics ({})",
                        run.protocol,
                        run.metrics.len(),
                        run.run_id
                    );
                }
                Err(StoreError::DuplicateRunId(run_id)) => {
                    summary.duplicates += 1;
                    println!("- Skipped {}: run {} already exists", run.protocol, run_id);
                }
                Err(err) => {
                    summary.failed += 1;
                    tracing::error!("Failed to save run {}: {}", run.run_id, err);
                    println!("✗ Failed to save {}: {}", run.protocol, err);
                }
            },
            ImportOutcome::Failed { file, error } => {
                summary.failed += 1;
                println!("✗ Failed to import {}: {}", file.display(), error);
            }
        }
    }

    println!("\nTotal imported: {} benchmark runs", summary.imported);
    summary
}

fn fetch_run(store: &MetricsStore, run_id: &str) -> Result<BenchmarkRun> {
    match store.get(run_id)? {
        Some(run) => Ok(run),
        None => bail!("Run {} not found", run_id),
    }
}

/// Export one run, returning the artifact path
pub fn export(
    store: &MetricsStore,
    config: &Config,
    run_id: &str,
    format: Option<ExportFormat>,
    dest: Option<PathBuf>,
) -> Result<PathBuf> {
    let run = fetch_run(store, run_id)?;
    let format = format.unwrap_or(config.export.format);
    let path = dest
        .unwrap_or_else(|| config.export.dir.join(format!("{}.{}", run_id, format.extension())));

    output::export_run(&run, format, &path, &config.export_options())
        .with_context(|| format!("Failed to export run {} to {}", run_id, path.display()))?;
    println!("✓ Exported to {}", path.display());
    Ok(path)
}

/// Export the latest run of every protocol
///
/// HTML and Excel produce one artifact at `dest` (extension added when
/// missing); CSV and JSON produce one file per protocol inside `dest`.
pub fn export_all(
    store: &MetricsStore,
    config: &Config,
    format: Option<ExportFormat>,
    dest: Option<PathBuf>,
) -> Result<ExportReport> {
    let latest = store.latest_by_protocol()?;
    let mut report = ExportReport::default();
    if latest.is_empty() {
        println!("No results found to export");
        return Ok(report);
    }

    let format = format.unwrap_or(ExportFormat::Excel);
    let base = dest.unwrap_or_else(|| config.export.dir.join("all_benchmarks"));
    let options = config.export_options();

    if format.is_multi_run() {
        let runs: Vec<BenchmarkRun> = latest.into_values().collect();
        let path = with_extension(&base, format.extension());
        let result = match format {
            ExportFormat::Html => output::to_html_report(&runs, &path, &options.title),
            _ => output::to_excel(&runs, &path),
        };
        report.record(path, result);
    } else {
        for (protocol, run) in &latest {
            let path = base.join(format!("{}.{}", file_stem(protocol), format.extension()));
            let result = output::export_run(run, format, &path, &options);
            report.record(path, result);
        }
    }

    report.print();
    if !report.is_success() {
        let total = report.written.len() + report.failed.len();
        bail!("{} of {} exports failed", report.failed.len(), total);
    }
    Ok(report)
}

/// Print stored runs, newest first
pub fn list(store: &MetricsStore, query: &RunQuery) -> Result<()> {
    let runs = store.list(query)?;
    output::print_runs_table(&runs);
    Ok(())
}

/// Print one run's details
pub fn show(store: &MetricsStore, run_id: &str) -> Result<()> {
    let run = fetch_run(store, run_id)?;
    output::print_run(&run);
    Ok(())
}

/// Print database statistics
pub fn stats(store: &MetricsStore) -> Result<()> {
    let stats = store.stats()?;
    output::print_store_stats(&stats);
    Ok(())
}

/// Delete one run and its metrics
pub fn delete(store: &MetricsStore, run_id: &str) -> Result<()> {
    if !store.delete(run_id)? {
        bail!("Run {} not found", run_id);
    }
    println!("✓ Deleted run {}", run_id);
    Ok(())
}

/// Compare the latest run of every protocol, optionally exporting the result
pub fn compare(
    store: &MetricsStore,
    config: &Config,
    output_dir: Option<&Path>,
    formats: &[ExportFormat],
) -> Result<BenchmarkComparison> {
    let comparison = BenchmarkComparison::from_runs(store.latest_by_protocol()?);
    output::print_comparison(&comparison);

    let Some(dir) = output_dir else {
        return Ok(comparison);
    };
    if comparison.is_empty() {
        println!("Nothing to export");
        return Ok(comparison);
    }

    let formats = if formats.is_empty() { &config.export.compare_formats[..] } else { formats };
    let report = output::export_comparison(&comparison, dir, formats, &config.export_options());
    report.print();
    if !report.is_success() {
        bail!("{} comparison artifacts failed to export", report.failed.len());
    }
    Ok(comparison)
}

/// `base` with `ext` appended unless it already ends in it
fn with_extension(base: &Path, ext: &str) -> PathBuf {
    match base.extension().and_then(|e| e.to_str()) {
        Some(current) if current.eq_ignore_ascii_case(ext) => base.to_path_buf(),
        _ => {
            let mut name = base.as_os_str().to_owned();
            name.push(".");
            name.push(ext);
            PathBuf::from(name)
        }
    }
}

/// Protocol label usable as a file name
fn file_stem(protocol: &str) -> String {
    protocol
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect()
}
