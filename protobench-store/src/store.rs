//! Benchmark run persistence

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use protobench_core::normalize::parse_instant;
use protobench_core::{BenchmarkRun, Metadata, Metric, RunSummary, SummaryStats};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::schema;
use crate::{Result, StoreError};

const RUN_COLUMNS: &str = "id, run_id, protocol, timestamp, stats_json, metadata_json";

/// Filter and pagination for [`MetricsStore::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunQuery {
    pub protocol: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for RunQuery {
    fn default() -> Self {
        Self { protocol: None, limit: 100, offset: 0 }
    }
}

impl RunQuery {
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Aggregate counts across the whole store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_runs: u64,
    pub total_metrics: u64,
    /// Number of runs per protocol
    pub protocols: BTreeMap<String, u64>,
}

/// SQLite-backed store of benchmark runs
///
/// Every write runs in a single transaction, so a run is either stored with
/// all of its metrics or not at all. Writers are serialized through one
/// connection; multi-statement reads run inside a transaction to observe a
/// consistent snapshot. Returned runs are detached copies.
#[derive(Debug)]
pub struct MetricsStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl MetricsStore {
    /// Open or create a database file, creating missing parent directories
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        schema::init_schema(&conn, true)?;
        tracing::debug!("Opened metrics store at {}", path.display());

        Ok(Self { conn: Mutex::new(conn), path: Some(path.to_path_buf()) })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn, false)?;
        Ok(Self { conn: Mutex::new(conn), path: None })
    }

    /// Database file path, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert a run and all of its metrics atomically
    ///
    /// Returns the surrogate id. Fails with [`StoreError::DuplicateRunId`] if
    /// the run id is already stored; the stored run is left untouched.
    pub fn save(&self, run: &BenchmarkRun) -> Result<i64> {
        let stats_json = run.stats.as_ref().map(serde_json::to_string).transpose()?;
        let metadata_json = serde_json::to_string(&run.metadata)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO benchmark_runs (run_id, protocol, timestamp, stats_json, metadata_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run.run_id,
                run.protocol,
                encode_timestamp(&run.timestamp),
                stats_json,
                metadata_json
            ],
        )
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::DuplicateRunId(run.run_id.clone())
            } else {
                StoreError::Sqlite(err)
            }
        })?;
        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO metrics
                 (run_id, request_id, request_timestamp, response_timestamp, latency_seconds)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for metric in &run.metrics {
                let request_id = i64::try_from(metric.request_id).map_err(|_| {
                    StoreError::Invalid(format!("request_id {} out of range", metric.request_id))
                })?;
                stmt.execute(params![
                    run.run_id,
                    request_id,
                    metric.request_timestamp,
                    metric.response_timestamp,
                    metric.latency_seconds
                ])?;
            }
        }

        tx.commit()?;
        tracing::info!(
            "Saved run {} ({}, {} metrics) as id {}",
            run.run_id,
            run.protocol,
            run.metrics.len(),
            id
        );
        Ok(id)
    }

    /// Load a full run, or `None` if the run id is not stored
    pub fn get(&self, run_id: &str) -> Result<Option<BenchmarkRun>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let run = load_run(&tx, run_id)?;
        tx.commit()?;
        Ok(run)
    }

    /// List run summaries, newest first
    pub fn list(&self, query: &RunQuery) -> Result<Vec<RunSummary>> {
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM benchmark_runs
             WHERE (?1 IS NULL OR protocol = ?1)
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt.query_map(params![query.protocol, limit, offset], RunRow::from_row)?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?.into_summary()?);
        }
        Ok(summaries)
    }

    /// Most recently inserted run of every protocol, fully hydrated
    pub fn latest_by_protocol(&self) -> Result<BTreeMap<String, BenchmarkRun>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let run_ids: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT run_id FROM benchmark_runs
                 WHERE id IN (SELECT MAX(id) FROM benchmark_runs GROUP BY protocol)",
            )?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let mut latest = BTreeMap::new();
        for run_id in run_ids {
            if let Some(run) = load_run(&tx, &run_id)? {
                latest.insert(run.protocol.clone(), run);
            }
        }

        tx.commit()?;
        Ok(latest)
    }

    /// Delete a run and its metrics atomically
    ///
    /// Returns whether the run existed.
    pub fn delete(&self, run_id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM metrics WHERE run_id = ?1", [run_id])?;
        let deleted = tx.execute("DELETE FROM benchmark_runs WHERE run_id = ?1", [run_id])?;
        tx.commit()?;

        if deleted > 0 {
            tracing::info!("Deleted run {}", run_id);
        } else {
            tracing::debug!("Run {} not found for deletion", run_id);
        }
        Ok(deleted > 0)
    }

    /// Aggregate counts across the whole store
    pub fn stats(&self) -> Result<StoreStats> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let total_runs: i64 =
            tx.query_row("SELECT COUNT(*) FROM benchmark_runs", [], |row| row.get(0))?;
        let total_metrics: i64 =
            tx.query_row("SELECT COUNT(*) FROM metrics", [], |row| row.get(0))?;

        let protocols = {
            let mut stmt = tx.prepare(
                "SELECT protocol, COUNT(*) FROM benchmark_runs GROUP BY protocol ORDER BY protocol",
            )?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
            let mut protocols = BTreeMap::new();
            for row in rows {
                let (protocol, count) = row?;
                protocols.insert(protocol, count.max(0) as u64);
            }
            protocols
        };

        tx.commit()?;
        Ok(StoreStats {
            total_runs: total_runs.max(0) as u64,
            total_metrics: total_metrics.max(0) as u64,
            protocols,
        })
    }
}

/// Raw `benchmark_runs` row
struct RunRow {
    id: i64,
    run_id: String,
    protocol: String,
    timestamp: String,
    stats_json: Option<String>,
    metadata_json: Option<String>,
}

impl RunRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            run_id: row.get(1)?,
            protocol: row.get(2)?,
            timestamp: row.get(3)?,
            stats_json: row.get(4)?,
            metadata_json: row.get(5)?,
        })
    }

    fn into_summary(self) -> Result<RunSummary> {
        // Rows written by older tooling may hold the literal "null"
        let stats = match self.stats_json.as_deref() {
            Some(json) => serde_json::from_str::<Option<SummaryStats>>(json)?,
            None => None,
        };
        let metadata = match self.metadata_json.as_deref() {
            Some(json) => serde_json::from_str::<Option<Metadata>>(json)?.unwrap_or_default(),
            None => Metadata::new(),
        };

        Ok(RunSummary {
            id: Some(self.id),
            run_id: self.run_id,
            protocol: self.protocol,
            timestamp: decode_timestamp(&self.timestamp)?,
            stats,
            metadata,
        })
    }

    fn into_run(self, metrics: Vec<Metric>) -> Result<BenchmarkRun> {
        let summary = self.into_summary()?;
        Ok(BenchmarkRun {
            id: summary.id,
            run_id: summary.run_id,
            protocol: summary.protocol,
            timestamp: summary.timestamp,
            metrics,
            stats: summary.stats,
            metadata: summary.metadata,
        })
    }
}

fn load_run(conn: &Connection, run_id: &str) -> Result<Option<BenchmarkRun>> {
    let row = conn
        .query_row(
            &format!("SELECT {RUN_COLUMNS} FROM benchmark_runs WHERE run_id = ?1"),
            [run_id],
            RunRow::from_row,
        )
        .optional()?;

    match row {
        Some(row) => {
            let metrics = load_metrics(conn, run_id)?;
            Ok(Some(row.into_run(metrics)?))
        }
        None => Ok(None),
    }
}

fn load_metrics(conn: &Connection, run_id: &str) -> Result<Vec<Metric>> {
    let mut stmt = conn.prepare(
        "SELECT request_id, request_timestamp, response_timestamp, latency_seconds
         FROM metrics WHERE run_id = ?1
         ORDER BY request_id ASC, id ASC",
    )?;
    let rows = stmt.query_map([run_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f64>(3)?,
        ))
    })?;

    let mut metrics = Vec::new();
    for row in rows {
        let (request_id, request_timestamp, response_timestamp, latency_seconds) = row?;
        let request_id = u64::try_from(request_id)
            .map_err(|_| StoreError::Invalid(format!("negative request_id {request_id}")))?;
        metrics.push(Metric {
            request_id,
            request_timestamp,
            response_timestamp,
            latency_seconds,
        });
    }
    Ok(metrics)
}

/// UNIQUE or PRIMARY KEY failure; other constraint failures stay `Sqlite` errors
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
    )
}

/// Fixed-width UTC encoding so lexical order matches chronological order
fn encode_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    parse_instant(raw).map_err(|e| StoreError::Timestamp(e.to_string()))
}
