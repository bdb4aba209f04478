//! XLSX workbook export

use anyhow::{Context, Result};
use protobench_core::BenchmarkRun;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::collections::HashSet;
use std::path::Path;

use super::{write_atomic, METRIC_COLUMNS};

/// Sheet name length limit imposed by the file format
const MAX_SHEET_NAME_LEN: usize = 31;

const SUMMARY_SHEET: &str = "Summary";

const SUMMARY_COLUMNS: [&str; 12] = [
    "protocol", "run_id", "timestamp", "mean", "median", "std_dev", "min", "max", "count", "p50",
    "p95", "p99",
];

/// Write a workbook with one `{protocol}_metrics` sheet per run and a
/// trailing `Summary` sheet with one row per run
pub fn to_excel(runs: &[BenchmarkRun], path: &Path) -> Result<()> {
    let buffer = build_workbook(runs)
        .and_then(|mut workbook| workbook.save_to_buffer())
        .context("Failed to build workbook")?;
    write_atomic(path, &buffer)
}

fn build_workbook(runs: &[BenchmarkRun]) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    // Sheet names compare case-insensitively
    let mut used = HashSet::from([SUMMARY_SHEET.to_lowercase()]);

    for run in runs {
        let name = unique_sheet_name(&format!("{}_metrics", run.protocol), &mut used);
        let sheet = workbook.add_worksheet();
        sheet.set_name(&name)?;
        write_header(sheet, &METRIC_COLUMNS, &header)?;

        for (i, metric) in run.metrics.iter().enumerate() {
            let row = sheet_row(i)?;
            sheet.write_number(row, 0, metric.request_id as f64)?;
            sheet.write_string(row, 1, &metric.request_timestamp)?;
            sheet.write_string(row, 2, &metric.response_timestamp)?;
            sheet.write_number(row, 3, metric.latency_seconds)?;
        }
    }

    let summary = workbook.add_worksheet();
    summary.set_name(SUMMARY_SHEET)?;
    write_header(summary, &SUMMARY_COLUMNS, &header)?;

    for (i, run) in runs.iter().enumerate() {
        let row = sheet_row(i)?;
        summary.write_string(row, 0, &run.protocol)?;
        summary.write_string(row, 1, &run.run_id)?;
        summary.write_string(row, 2, run.timestamp.to_rfc3339())?;

        let Some(stats) = &run.stats else {
            continue;
        };
        let values = [
            Some(stats.mean),
            Some(stats.median),
            Some(stats.std_dev),
            Some(stats.min),
            Some(stats.max),
            Some(stats.count as f64),
            stats.p50,
            stats.p95,
            stats.p99,
        ];
        for (col, value) in (3u16..).zip(values) {
            if let Some(value) = value {
                summary.write_number(row, col, value)?;
            }
        }
    }

    Ok(workbook)
}

fn write_header(sheet: &mut Worksheet, columns: &[&str], format: &Format) -> Result<(), XlsxError> {
    for (col, title) in (0u16..).zip(columns) {
        sheet.write_string_with_format(0, col, *title, format)?;
    }
    Ok(())
}

/// Data row for the `index`-th record, below the header row
fn sheet_row(index: usize) -> Result<u32, XlsxError> {
    u32::try_from(index + 1).map_err(|_| XlsxError::RowColumnLimitError)
}

/// Valid, unique sheet name derived from `base`
fn unique_sheet_name(base: &str, used: &mut HashSet<String>) -> String {
    let sanitized: String = base
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    let sanitized = sanitized.trim_matches('\'');
    let sanitized = if sanitized.is_empty() { "metrics" } else { sanitized };

    let mut candidate = truncate_chars(sanitized, MAX_SHEET_NAME_LEN);
    let mut n = 2;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!("_{n}");
        let keep = MAX_SHEET_NAME_LEN - suffix.chars().count();
        candidate = format!("{}{}", truncate_chars(sanitized, keep), suffix);
        n += 1;
    }

    used.insert(candidate.to_lowercase());
    candidate
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use protobench_core::Metric;

    #[test]
    fn test_sheet_name_truncated() {
        let mut used = HashSet::new();
        let name = unique_sheet_name("AVeryLongProtocolNameForTesting_metrics", &mut used);
        assert_eq!(name.chars().count(), 31);
        assert_eq!(name, "AVeryLongProtocolNameForTesting");
    }

    #[test]
    fn test_sheet_name_collisions() {
        let mut used = HashSet::from(["summary".to_string()]);
        assert_eq!(unique_sheet_name("REST_metrics", &mut used), "REST_metrics");
        assert_eq!(unique_sheet_name("REST_metrics", &mut used), "REST_metrics_2");
        assert_eq!(unique_sheet_name("rest_metrics", &mut used), "rest_metrics_3");
        assert_eq!(unique_sheet_name("Summary", &mut used), "Summary_2");
    }

    #[test]
    fn test_sheet_name_invalid_chars() {
        let mut used = HashSet::new();
        assert_eq!(unique_sheet_name("a/b:c_metrics", &mut used), "a_b_c_metrics");
    }

    #[test]
    fn test_build_workbook() {
        let runs = vec![
            BenchmarkRun::from_metrics(
                "rest_1",
                "REST",
                vec![Metric::new(0, "2024-01-01T00:00:00", "2024-01-01T00:00:01", 1.0)],
            ),
            BenchmarkRun::from_metrics("rest_2", "REST", Vec::new()),
            BenchmarkRun::new("bare", "CBOR"),
        ];

        let mut workbook = build_workbook(&runs).unwrap();
        let names: Vec<String> = workbook.worksheets().iter().map(|sheet| sheet.name()).collect();
        assert_eq!(names, vec!["REST_metrics", "REST_metrics_2", "CBOR_metrics", "Summary"]);

        // XLSX is a zip container
        let buffer = workbook.save_to_buffer().unwrap();
        assert_eq!(&buffer[..2], b"PK");
    }

    #[test]
    fn test_build_workbook_long_protocol_name() {
        let runs = vec![
            BenchmarkRun::from_metrics("rest_1", "REST", Vec::new()),
            BenchmarkRun::from_metrics("long_1", "AVeryLongProtocolNameForTesting", Vec::new()),
        ];

        let mut workbook = build_workbook(&runs).unwrap();
        let names: Vec<String> = workbook.worksheets().iter().map(|sheet| sheet.name()).collect();
        assert_eq!(names, vec!["REST_metrics", "AVeryLongProtocolNameForTesting", "Summary"]);
    }
}
