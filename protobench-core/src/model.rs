//! Benchmark run data model
//!
//! A [`BenchmarkRun`] is the aggregate root: one benchmark execution for one
//! protocol. It exclusively owns its [`Metric`] samples and carries the
//! [`SummaryStats`] computed from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::stats::{self, SummaryStats};

/// Open key-value bag attached to a run
pub type Metadata = Map<String, JsonValue>;

/// One request/response latency sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Position of the request in the source payload (unique within a run)
    pub request_id: u64,
    /// Request instant exactly as the producer wrote it
    pub request_timestamp: String,
    /// Response instant exactly as the producer wrote it
    pub response_timestamp: String,
    /// `response_timestamp - request_timestamp`
    pub latency_seconds: f64,
}

impl Metric {
    pub fn new(
        request_id: u64,
        request_timestamp: impl Into<String>,
        response_timestamp: impl Into<String>,
        latency_seconds: f64,
    ) -> Self {
        Self {
            request_id,
            request_timestamp: request_timestamp.into(),
            response_timestamp: response_timestamp.into(),
            latency_seconds,
        }
    }
}

/// Complete benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    /// Storage-assigned surrogate key, `None` until the run has been saved
    #[serde(default)]
    pub id: Option<i64>,
    /// Globally unique run identifier, e.g. `rest_20240101_120000`
    pub run_id: String,
    /// Protocol label: REST, gRPC, GraphQL, Socket.IO, AVRO, CBOR, ...
    pub protocol: String,
    /// Creation instant
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub stats: Option<SummaryStats>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl BenchmarkRun {
    /// Create an empty run stamped with the current time
    pub fn new(run_id: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            id: None,
            run_id: run_id.into(),
            protocol: protocol.into(),
            timestamp: Utc::now(),
            metrics: Vec::new(),
            stats: None,
            metadata: Metadata::new(),
        }
    }

    /// Create a run from metrics and compute its summary statistics
    pub fn from_metrics(
        run_id: impl Into<String>,
        protocol: impl Into<String>,
        metrics: Vec<Metric>,
    ) -> Self {
        let mut run = Self::new(run_id, protocol);
        run.metrics = metrics;
        run.refresh_stats();
        run
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Latency samples in stored order
    pub fn latencies(&self) -> Vec<f64> {
        self.metrics.iter().map(|m| m.latency_seconds).collect()
    }

    /// Recompute `stats` from the current metric set
    pub fn refresh_stats(&mut self) {
        self.stats = Some(stats::compute(&self.latencies()));
    }
}

/// Run listing entry without the metric list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: Option<i64>,
    pub run_id: String,
    pub protocol: String,
    pub timestamp: DateTime<Utc>,
    pub stats: Option<SummaryStats>,
    pub metadata: Metadata,
}

/// Build a timestamp-derived run identifier: `{tag}_{YYYYMMDD_HHMMSS}`
pub fn generate_run_id(tag: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}", tag, at.format("%Y%m%d_%H%M%S"))
}
