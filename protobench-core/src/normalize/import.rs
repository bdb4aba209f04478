//! Bulk import of legacy result files from a directory

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use super::{LegacyParser, ParserRegistry};
use crate::model::BenchmarkRun;
use crate::{Error, Result};

/// Result of importing one source file
#[derive(Debug)]
pub enum ImportOutcome {
    Imported { file: PathBuf, run: BenchmarkRun },
    Failed { file: PathBuf, error: Error },
}

impl ImportOutcome {
    pub fn file(&self) -> &Path {
        match self {
            ImportOutcome::Imported { file, .. } | ImportOutcome::Failed { file, .. } => file,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ImportOutcome::Imported { .. })
    }
}

/// Per-file report of a directory import
#[derive(Debug, Default)]
pub struct ImportReport {
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportReport {
    pub fn runs(&self) -> impl Iterator<Item = &BenchmarkRun> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            ImportOutcome::Imported { run, .. } => Some(run),
            ImportOutcome::Failed { .. } => None,
        })
    }

    pub fn imported_count(&self) -> usize {
        self.runs().count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.imported_count()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Read and decode one legacy source file
pub fn read_source(path: &Path) -> Result<JsonValue> {
    let content = fs::read_to_string(path).map_err(|e| Error::SourceUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| Error::SourceUnreadable {
        path: path.to_path_buf(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Import one file with a specific parser
pub fn import_file(parser: &dyn LegacyParser, path: &Path) -> Result<BenchmarkRun> {
    let payload = read_source(path)?;
    let run = parser.parse(&payload)?;
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    Ok(run.with_metadata("source_file", JsonValue::String(file_name)))
}

/// Import every registered source file present in `dir`
///
/// Files that do not exist are ignored. A file that cannot be read, is not
/// valid JSON or has the wrong top-level shape is reported as failed without
/// aborting the remaining files.
pub fn import_dir(registry: &ParserRegistry, dir: &Path) -> ImportReport {
    let mut report = ImportReport::default();

    for parser in registry.iter() {
        let file = dir.join(parser.source_file());
        if !file.exists() {
            tracing::debug!("No {} results at {}", parser.protocol(), file.display());
            continue;
        }

        match import_file(parser, &file) {
            Ok(run) => {
                tracing::info!(
                    "Imported {} - {} metrics ({})",
                    file.display(),
                    run.metrics.len(),
                    run.run_id
                );
                report.outcomes.push(ImportOutcome::Imported { file, run });
            }
            Err(error) => {
                tracing::warn!("Error importing {}: {}", file.display(), error);
                report.outcomes.push(ImportOutcome::Failed { file, error });
            }
        }
    }

    report
}
