//! Tests for configuration parsing and validation

use std::fs;
use std::path::{Path, PathBuf};

use protobench_cli::completions::get_config_paths;
use protobench_cli::config::Config;
use protobench_cli::output::ExportFormat;
use tempfile::tempdir;

#[test]
fn test_load_sample_config() {
    let config = Config::from_file("../configs/protobench.toml")
        .expect("Failed to load sample configuration");

    assert_eq!(config.storage.path, PathBuf::from("benchmark_metrics.db"));
    assert_eq!(config.import.dir, PathBuf::from("results"));
    assert_eq!(config.export.dir, PathBuf::from("exports"));
    assert_eq!(config.export.format, ExportFormat::Csv);
    assert_eq!(config.export.title, "Protocol Benchmark Report");
    assert_eq!(
        config.export.compare_formats,
        vec![ExportFormat::Json, ExportFormat::Html, ExportFormat::Excel]
    );
    config.validate().unwrap();
}

#[test]
fn test_partial_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("protobench.toml");
    fs::write(&path, "[export]\ntitle = \"Nightly\"\n").unwrap();

    let config = Config::load(Some(path.as_path()), &[]).unwrap();
    assert_eq!(config.export.title, "Nightly");
    assert_eq!(config.storage, Config::default().storage);
    assert_eq!(config.export.format, ExportFormat::Json);
}

#[test]
fn test_overrides_applied_to_file() {
    let overrides = vec![
        "storage.path=/tmp/other.db".to_string(),
        "export.format=excel".to_string(),
        "export.pretty=false".to_string(),
        "export.compare_formats=[\"csv\"]".to_string(),
    ];

    let config =
        Config::from_file_with_overrides("../configs/protobench.toml", &overrides).unwrap();

    assert_eq!(config.storage.path, PathBuf::from("/tmp/other.db"));
    assert_eq!(config.export.format, ExportFormat::Excel);
    assert!(!config.export.pretty);
    assert_eq!(config.export.compare_formats, vec![ExportFormat::Csv]);
    // Untouched values survive
    assert_eq!(config.import.dir, PathBuf::from("results"));
}

#[test]
fn test_load_with_explicit_path() {
    let config = Config::load(
        Some(Path::new("../configs/protobench.toml")),
        &["import.dir=incoming".to_string()],
    )
    .unwrap();
    assert_eq!(config.import.dir, PathBuf::from("incoming"));
}

#[test]
fn test_invalid_override_rejected() {
    let err = Config::from_file_with_overrides(
        "../configs/protobench.toml",
        &["export.format=pdf".to_string()],
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("deserialize"));

    assert!(Config::from_file_with_overrides(
        "../configs/protobench.toml",
        &["missing-equals".to_string()]
    )
    .is_err());
}

#[test]
fn test_validation_runs_after_overrides() {
    let err = Config::from_file_with_overrides(
        "../configs/protobench.toml",
        &["export.title=\"\"".to_string()],
    )
    .unwrap_err();
    assert!(err.to_string().contains("title"));
}

#[test]
fn test_missing_file_is_an_error() {
    let err = Config::from_file("does/not/exist.toml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_schema_covers_every_section() {
    let schema = schemars::schema_for!(Config);
    let json = serde_json::to_value(&schema).unwrap();
    let properties = json["properties"].as_object().unwrap();
    assert!(properties.contains_key("storage"));
    assert!(properties.contains_key("import"));
    assert!(properties.contains_key("export"));

    let paths = get_config_paths();
    assert!(paths.contains(&"export.title".to_string()));
}
