//! Cross-protocol comparison of benchmark runs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{generate_run_id, BenchmarkRun};
use crate::stats::{self, SummaryStats};

/// Confidence level used for the mean latency interval
pub const CONFIDENCE_LEVEL: f64 = 0.95;

/// Per-protocol line of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSummary {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub stats: Option<SummaryStats>,
    pub sample_count: usize,
    /// Half-width of the 95% confidence interval of the mean latency (seconds)
    pub mean_ci95: f64,
}

/// Digest of a comparison
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub protocols: BTreeMap<String, ProtocolSummary>,
    /// Protocol with the lowest mean latency among runs that have samples
    pub fastest_protocol: Option<String>,
}

/// Latest runs of several protocols side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub results: BTreeMap<String, BenchmarkRun>,
    pub summary: ComparisonSummary,
}

impl BenchmarkComparison {
    /// Build a comparison from a protocol -> run mapping
    pub fn from_runs(results: BTreeMap<String, BenchmarkRun>) -> Self {
        Self::from_runs_at(results, Utc::now())
    }

    pub fn from_runs_at(results: BTreeMap<String, BenchmarkRun>, at: DateTime<Utc>) -> Self {
        let protocols: BTreeMap<String, ProtocolSummary> = results
            .iter()
            .map(|(protocol, run)| {
                let summary = ProtocolSummary {
                    run_id: run.run_id.clone(),
                    timestamp: run.timestamp,
                    stats: run.stats,
                    sample_count: run.metrics.len(),
                    mean_ci95: stats::confidence_interval(&run.latencies(), CONFIDENCE_LEVEL),
                };
                (protocol.clone(), summary)
            })
            .collect();

        let fastest_protocol = protocols
            .iter()
            .filter_map(|(protocol, summary)| {
                summary.stats.filter(|s| !s.is_empty()).map(|s| (protocol, s.mean))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(protocol, _)| protocol.clone());

        Self {
            run_id: generate_run_id("comparison", at),
            timestamp: at,
            results,
            summary: ComparisonSummary { protocols, fastest_protocol },
        }
    }

    pub fn runs(&self) -> impl Iterator<Item = &BenchmarkRun> {
        self.results.values()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
