//! End-to-end tests of the subcommands against a scratch database

use std::fs;
use std::path::{Path, PathBuf};

use protobench_cli::commands;
use protobench_cli::config::Config;
use protobench_cli::output::ExportFormat;
use protobench_core::ParserRegistry;
use protobench_store::{MetricsStore, RunQuery};
use serde_json::json;
use tempfile::{tempdir, TempDir};

struct Fixture {
    store: MetricsStore,
    config: Config,
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let overrides = vec![
            format!("storage.path={}", dir.path().join("metrics.db").display()),
            format!("export.dir={}", dir.path().join("exports").display()),
        ];
        let config = Config::load(Some(write_config(dir.path()).as_path()), &overrides).unwrap();
        let store = commands::open_store(&config).unwrap();
        Self { store, config, dir }
    }

    fn results_dir(&self) -> PathBuf {
        let results = self.dir.path().join("results");
        fs::create_dir_all(&results).unwrap();
        write_json(
            &results,
            "rest_out.txt",
            json!([
                {"request_timestamp": "2024-01-01T00:00:00", "response_timestamp": "2024-01-01T00:00:01"},
                {"request_timestamp": "2024-01-01T00:00:02", "response_timestamp": "2024-01-01T00:00:02.5"}
            ]),
        );
        write_json(
            &results,
            "sio_out.txt",
            json!({"request_ts": "2024-01-01T00:00:00", "respond_ts": ["2024-01-01T00:00:01", "2024-01-01T00:00:03"]}),
        );
        fs::write(results.join("grpc_out.txt"), "{ truncated").unwrap();
        results
    }
}

fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("protobench.toml");
    fs::write(&path, "[export]\npretty = false\n").unwrap();
    path
}

fn write_json(dir: &Path, name: &str, value: serde_json::Value) {
    fs::write(dir.join(name), serde_json::to_string(&value).unwrap()).unwrap();
}

#[test]
fn test_import_reports_each_file() {
    let fx = Fixture::new();
    let results = fx.results_dir();

    let summary = commands::import(&fx.store, &ParserRegistry::with_defaults(), &results);
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.duplicates, 0);

    let stats = fx.store.stats().unwrap();
    assert_eq!(stats.total_runs, 2);
    assert_eq!(stats.total_metrics, 4);
    assert_eq!(stats.protocols["Socket.IO"], 1);
}

#[test]
fn test_import_empty_directory() {
    let fx = Fixture::new();
    let empty = fx.dir.path().join("nothing");
    fs::create_dir_all(&empty).unwrap();

    let summary = commands::import(&fx.store, &ParserRegistry::with_defaults(), &empty);
    assert_eq!(summary.total(), 0);
}

#[test]
fn test_export_single_run() {
    let fx = Fixture::new();
    let results = fx.results_dir();
    commands::import(&fx.store, &ParserRegistry::with_defaults(), &results);
    let run_id = fx.store.list(&RunQuery::default().protocol("REST")).unwrap()[0].run_id.clone();

    let path = commands::export(&fx.store, &fx.config, &run_id, None, None).unwrap();
    assert_eq!(path, fx.config.export.dir.join(format!("{run_id}.json")));

    let content = fs::read_to_string(&path).unwrap();
    // pretty = false from the config file
    assert!(!content.contains('\n'));
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["protocol"], "REST");
    assert_eq!(value["metrics"].as_array().unwrap().len(), 2);

    let csv_path = fx.dir.path().join("custom").join("rest.csv");
    commands::export(&fx.store, &fx.config, &run_id, Some(ExportFormat::Csv), Some(csv_path.clone()))
        .unwrap();
    assert_eq!(fs::read_to_string(&csv_path).unwrap().lines().count(), 3);
}

#[test]
fn test_missing_run_is_an_error() {
    let fx = Fixture::new();

    let err = commands::export(&fx.store, &fx.config, "nope", None, None).unwrap_err();
    assert!(err.to_string().contains("Run nope not found"));
    assert!(!fx.config.export.dir.exists());

    assert!(commands::delete(&fx.store, "nope").is_err());
    assert!(commands::show(&fx.store, "nope").is_err());
}

#[test]
fn test_delete_removes_run() {
    let fx = Fixture::new();
    let results = fx.results_dir();
    commands::import(&fx.store, &ParserRegistry::with_defaults(), &results);
    let run_id = fx.store.list(&RunQuery::default()).unwrap()[0].run_id.clone();

    commands::delete(&fx.store, &run_id).unwrap();
    assert!(fx.store.get(&run_id).unwrap().is_none());
    assert_eq!(fx.store.stats().unwrap().total_runs, 1);
}

#[test]
fn test_export_all_per_protocol_files() {
    let fx = Fixture::new();
    let results = fx.results_dir();
    commands::import(&fx.store, &ParserRegistry::with_defaults(), &results);

    let out = fx.dir.path().join("all");
    let report =
        commands::export_all(&fx.store, &fx.config, Some(ExportFormat::Csv), Some(out.clone()))
            .unwrap();
    assert_eq!(report.written.len(), 2);
    assert!(out.join("REST.csv").exists());
    assert!(out.join("Socket.IO.csv").exists());

    let report =
        commands::export_all(&fx.store, &fx.config, Some(ExportFormat::Excel), Some(out.clone()))
            .unwrap();
    assert_eq!(report.written, vec![fx.dir.path().join("all.xlsx")]);
}

#[test]
fn test_export_all_empty_store() {
    let fx = Fixture::new();
    let report = commands::export_all(&fx.store, &fx.config, None, None).unwrap();
    assert!(report.written.is_empty());
    assert!(report.is_success());
}

#[test]
fn test_compare_exports_configured_formats() {
    let fx = Fixture::new();
    let results = fx.results_dir();
    commands::import(&fx.store, &ParserRegistry::with_defaults(), &results);

    let out = fx.dir.path().join("comparison");
    let comparison = commands::compare(&fx.store, &fx.config, Some(out.as_path()), &[]).unwrap();

    assert_eq!(comparison.results.len(), 2);
    assert_eq!(comparison.summary.fastest_protocol.as_deref(), Some("REST"));
    for ext in ["json", "html", "xlsx"] {
        assert!(out.join(format!("{}.{ext}", comparison.run_id)).exists());
    }
}

#[test]
fn test_compare_without_output_writes_nothing() {
    let fx = Fixture::new();
    let comparison = commands::compare(&fx.store, &fx.config, None, &[]).unwrap();
    assert!(comparison.is_empty());
    assert!(!fx.config.export.dir.exists());
}
