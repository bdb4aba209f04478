//! Protobench Core Library
//!
//! This crate provides the core functionality for the protobench protocol
//! benchmarking harness: the benchmark run data model, the latency statistics
//! engine, and normalization of the per-protocol legacy result shapes into
//! uniform runs.

pub mod comparison;
pub mod error;
pub mod model;
pub mod normalize;
pub mod stats;

pub use comparison::{BenchmarkComparison, ComparisonSummary, ProtocolSummary};
pub use error::{Error, Result};
pub use model::{generate_run_id, BenchmarkRun, Metadata, Metric, RunSummary};
pub use normalize::{LegacyParser, ParserRegistry};
pub use stats::SummaryStats;
