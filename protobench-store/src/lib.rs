//! Protobench Metrics Store
//!
//! Durable storage for benchmark runs backed by SQLite. A run and all of its
//! metrics are written in one transaction; the run id is unique across the
//! store and a second save of the same id is rejected without touching the
//! stored run.
//!
//! ```rust,no_run
//! use protobench_core::{BenchmarkRun, Metric};
//! use protobench_store::{MetricsStore, RunQuery};
//!
//! let store = MetricsStore::open("benchmark_metrics.db").unwrap();
//!
//! let run = BenchmarkRun::from_metrics(
//!     "rest_20240101_120000",
//!     "REST",
//!     vec![Metric::new(0, "2024-01-01T12:00:00", "2024-01-01T12:00:00.015", 0.015)],
//! );
//! store.save(&run).unwrap();
//!
//! for summary in store.list(&RunQuery::default().protocol("REST")).unwrap() {
//!     println!("{} {}", summary.run_id, summary.timestamp);
//! }
//! ```

use thiserror::Error;

pub mod schema;
pub mod store;

pub use store::{MetricsStore, RunQuery, StoreStats};

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    /// A run with this id is already stored
    #[error("run '{0}' already exists")]
    DuplicateRunId(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored timestamp could not be decoded
    #[error("invalid stored timestamp: {0}")]
    Timestamp(String),

    #[error("invalid data: {0}")]
    Invalid(String),

    /// Another thread panicked while holding the connection
    #[error("store connection lock poisoned")]
    Poisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
