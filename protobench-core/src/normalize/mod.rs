//! Legacy result normalization
//!
//! Each protocol requester writes its results in its own JSON shape. A
//! [`LegacyParser`] turns one such payload into a [`BenchmarkRun`] with uniform
//! [`Metric`] records and computed statistics. Parsers are looked up by tag in a
//! [`ParserRegistry`], so new protocols can be added without touching the
//! existing ones.
//!
//! # Example
//!
//! ```
//! use protobench_core::normalize::ParserRegistry;
//! use serde_json::json;
//!
//! let registry = ParserRegistry::with_defaults();
//! let payload = json!([{
//!     "request_timestamp": "2024-01-01T00:00:00",
//!     "response_timestamp": "2024-01-01T00:00:01"
//! }]);
//!
//! let run = registry.parse("rest", &payload).unwrap();
//! assert_eq!(run.protocol, "REST");
//! assert_eq!(run.metrics[0].latency_seconds, 1.0);
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value as JsonValue;

use crate::model::{generate_run_id, BenchmarkRun, Metric};
use crate::{Error, Result};

pub mod import;
pub mod shapes;

pub use import::{import_dir, ImportOutcome, ImportReport};
pub use shapes::{BroadcastParser, RecordListParser};

/// Parser for one legacy result shape
pub trait LegacyParser: Send + Sync {
    /// Lowercase dispatch tag, also used as the run id prefix (e.g. "grpc")
    fn tag(&self) -> &str;

    /// Protocol label stored on the run (e.g. "gRPC")
    fn protocol(&self) -> &str;

    /// File name the requester writes its results to (e.g. "grpc_out.txt")
    fn source_file(&self) -> &str;

    /// Extract latency samples from a raw payload
    ///
    /// Records that cannot be measured are skipped. Only a payload whose
    /// top-level shape is wrong is an error.
    fn extract_metrics(&self, payload: &JsonValue) -> Result<Vec<Metric>>;

    /// Normalize a payload into a run stamped with `at`
    fn parse_at(&self, payload: &JsonValue, at: DateTime<Utc>) -> Result<BenchmarkRun> {
        let metrics = self.extract_metrics(payload)?;
        let run = BenchmarkRun::from_metrics(generate_run_id(self.tag(), at), self.protocol(), metrics)
            .with_timestamp(at);

        tracing::debug!(
            "Normalized {} payload into run {} ({} metrics)",
            self.protocol(),
            run.run_id,
            run.metrics.len()
        );
        Ok(run)
    }

    /// Normalize a payload into a run stamped with the current time
    fn parse(&self, payload: &JsonValue) -> Result<BenchmarkRun> {
        self.parse_at(payload, Utc::now())
    }
}

/// Registry mapping protocol tags to parsers
pub struct ParserRegistry {
    parsers: BTreeMap<String, Box<dyn LegacyParser>>,
}

impl ParserRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { parsers: BTreeMap::new() }
    }

    /// Registry with the six built-in legacy shapes
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(RecordListParser::grpc());
        registry.register(RecordListParser::rest());
        registry.register(RecordListParser::graphql());
        registry.register(RecordListParser::avro());
        registry.register(RecordListParser::cbor());
        registry.register(BroadcastParser::socketio());
        registry
    }

    /// Add a parser, replacing any parser already registered under its tag
    pub fn register<P: LegacyParser + 'static>(&mut self, parser: P) {
        self.parsers.insert(parser.tag().to_string(), Box::new(parser));
    }

    pub fn get(&self, tag: &str) -> Option<&dyn LegacyParser> {
        self.parsers.get(tag).map(|p| p.as_ref())
    }

    /// Registered tags in iteration order
    pub fn tags(&self) -> Vec<&str> {
        self.parsers.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn LegacyParser> {
        self.parsers.values().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Dispatch a payload to the parser registered under `tag`
    pub fn parse(&self, tag: &str, payload: &JsonValue) -> Result<BenchmarkRun> {
        let parser = self.get(tag).ok_or_else(|| Error::UnknownProtocol(tag.to_string()))?;
        parser.parse(payload)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Parse an ISO-8601 instant
///
/// A trailing `Z` means UTC. Timestamps without an offset are taken as UTC.
/// Fractional seconds are optional and a space may separate date and time.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    let normalized = match trimmed.strip_suffix('Z').or_else(|| trimmed.strip_suffix('z')) {
        Some(head) => format!("{head}+00:00"),
        None => trimmed.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(Error::Timestamp(format!("'{raw}' is not an ISO-8601 timestamp")))
}

/// Seconds elapsed from `request` to `response`
pub fn latency_seconds(request: DateTime<Utc>, response: DateTime<Utc>) -> f64 {
    let delta = response - request;
    match delta.num_nanoseconds() {
        Some(nanos) => nanos as f64 / 1e9,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// Measure one request/response pair, or `None` if it must be skipped
///
/// Missing or empty timestamps and unparseable timestamps skip the record.
pub(crate) fn measure(request_id: u64, request: Option<&str>, response: Option<&str>) -> Option<Metric> {
    let (request, response) = match (request, response) {
        (Some(req), Some(resp)) if !req.is_empty() && !resp.is_empty() => (req, resp),
        _ => {
            tracing::debug!("Skipping record {}: missing timestamp", request_id);
            return None;
        }
    };

    let instants = parse_instant(request).and_then(|req| Ok((req, parse_instant(response)?)));
    match instants {
        Ok((req_at, resp_at)) => Some(Metric::new(
            request_id,
            request,
            response,
            latency_seconds(req_at, resp_at),
        )),
        Err(e) => {
            tracing::warn!("Skipping record {}: {}", request_id, e);
            None
        }
    }
}
