//! Latency statistics

use serde::{Deserialize, Serialize};

pub mod analysis;

pub use analysis::{compute, confidence_interval, percentile};

/// Statistical digest over a run's latency samples (seconds)
///
/// When `count` is zero every numeric field is zero and the percentiles are unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    /// 50th percentile
    #[serde(default)]
    pub p50: Option<f64>,
    /// 95th percentile
    #[serde(default)]
    pub p95: Option<f64>,
    /// 99th percentile
    #[serde(default)]
    pub p99: Option<f64>,
}

impl SummaryStats {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
