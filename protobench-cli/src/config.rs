//! Configuration file support for protobench
//!
//! Settings live in an optional `protobench.toml`. Every value has a default,
//! so a missing file is equivalent to an empty one, and any value can be
//! overridden from the command line with `--set key.path=value`.

use anyhow::{bail, Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::{ExportFormat, ExportOptions};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "protobench.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Metrics database settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct StorageConfig {
    /// SQLite database file
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: default_storage_path() }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("benchmark_metrics.db")
}

/// Legacy result import settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ImportConfig {
    /// Directory holding `grpc_out.txt`, `rest_out.txt`, ...
    #[serde(default = "default_import_dir")]
    pub dir: PathBuf,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { dir: default_import_dir() }
    }
}

fn default_import_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ExportConfig {
    /// Directory for export artifacts when no explicit output path is given
    #[serde(default = "default_export_dir")]
    pub dir: PathBuf,
    /// Default format for `export` and `export-all`
    #[serde(default)]
    pub format: ExportFormat,
    /// Pretty-print JSON artifacts
    #[serde(default = "default_pretty")]
    pub pretty: bool,
    /// Title of HTML reports
    #[serde(default = "default_title")]
    pub title: String,
    /// Formats written by `compare --output` when no `--format` is given
    #[serde(default = "default_compare_formats")]
    pub compare_formats: Vec<ExportFormat>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
            format: ExportFormat::default(),
            pretty: default_pretty(),
            title: default_title(),
            compare_formats: default_compare_formats(),
        }
    }
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("exports")
}

fn default_pretty() -> bool {
    true
}

fn default_title() -> String {
    "Benchmark Report".to_string()
}

fn default_compare_formats() -> Vec<ExportFormat> {
    vec![ExportFormat::Json, ExportFormat::Html, ExportFormat::Excel]
}

impl Config {
    /// Resolve the effective configuration
    ///
    /// Reads `path` if given, otherwise `protobench.toml` in the working
    /// directory if it exists, otherwise starts from defaults. Overrides are
    /// applied last and the result is validated.
    pub fn load(path: Option<&Path>, overrides: &[String]) -> Result<Self> {
        match path {
            Some(path) => Self::from_file_with_overrides(path, overrides),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file_with_overrides(DEFAULT_CONFIG_FILE, overrides)
            }
            None => {
                let value = toml::Value::try_from(Config::default())
                    .context("Failed to serialize default configuration")?;
                Self::from_value_with_overrides(value, overrides)
            }
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from a TOML file with --set style overrides
    pub fn from_file_with_overrides<P: AsRef<Path>>(path: P, overrides: &[String]) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let value: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Self::from_value_with_overrides(value, overrides)
    }

    fn from_value_with_overrides(mut value: toml::Value, overrides: &[String]) -> Result<Self> {
        for override_str in overrides {
            let (key, val) = parse_key_value(override_str)
                .with_context(|| format!("Invalid override format: {}", override_str))?;

            set_toml_path(&mut value, &key, &val)
                .with_context(|| format!("Failed to apply override: {}", override_str))?;
        }

        let config: Config =
            value.try_into().with_context(|| "Failed to deserialize modified configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Rendering options for exporters
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions { pretty: self.export.pretty, title: self.export.title.clone() }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.path.as_os_str().is_empty() {
            bail!("Storage path cannot be empty");
        }
        if self.import.dir.as_os_str().is_empty() {
            bail!("Import directory cannot be empty");
        }
        if self.export.dir.as_os_str().is_empty() {
            bail!("Export directory cannot be empty");
        }
        if self.export.title.trim().is_empty() {
            bail!("Report title cannot be empty");
        }
        if self.export.compare_formats.is_empty() {
            bail!("export.compare_formats must list at least one format");
        }
        Ok(())
    }
}

/// Parse a "key=value" string into (key, value) tuple
fn parse_key_value(override_str: &str) -> Result<(String, String)> {
    let Some((key, value)) = override_str.split_once('=') else {
        bail!("Invalid override format '{}'. Expected 'key=value'", override_str);
    };
    if key.trim().is_empty() {
        bail!("Override '{}' has an empty key", override_str);
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// Set a value in TOML using dot-notation path
fn set_toml_path(root: &mut toml::Value, path: &str, value_str: &str) -> Result<()> {
    let parts = parse_path(path);
    let Some((last, parents)) = parts.split_last() else {
        bail!("Empty path");
    };

    let mut current = root;
    for part in parents {
        current = match part {
            PathSegment::Key(key) => {
                let toml::Value::Table(table) = current else {
                    bail!("Cannot navigate through non-table value at key '{}'", key);
                };
                table
                    .entry(key.clone())
                    .or_insert_with(|| toml::Value::Table(Default::default()))
            }
            PathSegment::Index(idx) => {
                let toml::Value::Array(arr) = current else {
                    bail!("Cannot index non-array value");
                };
                let len = arr.len();
                arr.get_mut(*idx).with_context(|| {
                    format!("Array index {} out of bounds (length: {})", idx, len)
                })?
            }
            PathSegment::Append => bail!("Append operation '+' can only be at the end of path"),
        };
    }

    let parsed_value = parse_value(value_str)?;
    match (last, current) {
        (PathSegment::Key(key), toml::Value::Table(table)) => {
            table.insert(key.clone(), parsed_value);
        }
        (PathSegment::Key(key), _) => bail!("Cannot set key '{}' on non-table value", key),
        (PathSegment::Index(idx), toml::Value::Array(arr)) => {
            let len = arr.len();
            let slot = arr.get_mut(*idx).with_context(|| {
                format!("Array index {} out of bounds (length: {})", idx, len)
            })?;
            *slot = parsed_value;
        }
        (PathSegment::Append, toml::Value::Array(arr)) => arr.push(parsed_value),
        (PathSegment::Index(_), _) => bail!("Cannot index non-array value"),
        (PathSegment::Append, _) => bail!("Cannot append to non-array value"),
    }

    Ok(())
}

/// Parse a path string into segments (handles "key", "0", "+")
fn parse_path(path: &str) -> Vec<PathSegment> {
    path.split('.')
        .filter(|part| !part.is_empty())
        .map(|part| {
            if part == "+" {
                PathSegment::Append
            } else if let Ok(idx) = part.parse::<usize>() {
                PathSegment::Index(idx)
            } else {
                PathSegment::Key(part.to_string())
            }
        })
        .collect()
}

/// Path segment types
enum PathSegment {
    Key(String),
    Index(usize),
    Append,
}

/// Parse a string value with type inference
fn parse_value(value_str: &str) -> Result<toml::Value> {
    let trimmed = value_str.trim();

    match trimmed {
        "true" => return Ok(toml::Value::Boolean(true)),
        "false" => return Ok(toml::Value::Boolean(false)),
        _ => {}
    }

    if let Ok(int_val) = trimmed.parse::<i64>() {
        return Ok(toml::Value::Integer(int_val));
    }
    if let Ok(float_val) = trimmed.parse::<f64>() {
        return Ok(toml::Value::Float(float_val));
    }

    // Arrays and inline tables go through the TOML parser
    let is_array = trimmed.starts_with('[') && trimmed.ends_with(']');
    let is_table = trimmed.starts_with('{') && trimmed.ends_with('}');
    if is_array || is_table {
        let wrapped = format!("value = {}", trimmed);
        if let Ok(toml::Value::Table(mut table)) = toml::from_str::<toml::Value>(&wrapped) {
            if let Some(value) = table.remove("value") {
                return Ok(value);
            }
        }
        bail!("Failed to parse {}: {}", if is_array { "array" } else { "inline table" }, trimmed);
    }

    // Everything else is a string, with surrounding quotes stripped
    let string_val = if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    Ok(toml::Value::String(string_val.to_string()))
}
