//! SQLite schema definition and initialization.

use rusqlite::Connection;

/// Current schema version
pub const CURRENT_VERSION: &str = "1.0.0";

/// Initialize the database schema, creating tables if they don't exist.
///
/// File-backed databases run in WAL mode so readers in other processes never
/// block on, or observe, an uncommitted write.
pub fn init_schema(conn: &Connection, file_backed: bool) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA busy_timeout = 5000;
         PRAGMA foreign_keys = ON;",
    )?;
    if file_backed {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
    }

    conn.execute_batch(SCHEMA_SQL)?;

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))?;
    if count == 0 {
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [CURRENT_VERSION])?;
    }

    Ok(())
}

/// Read the recorded schema version
pub fn schema_version(conn: &Connection) -> Result<String, rusqlite::Error> {
    conn.query_row(
        "SELECT version FROM schema_version ORDER BY rowid DESC LIMIT 1",
        [],
        |row| row.get(0),
    )
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS benchmark_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT UNIQUE NOT NULL,
    protocol TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    stats_json TEXT,
    metadata_json TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_runs_protocol ON benchmark_runs(protocol);
CREATE INDEX IF NOT EXISTS idx_runs_timestamp ON benchmark_runs(timestamp);

CREATE TABLE IF NOT EXISTS metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    request_id INTEGER NOT NULL,
    request_timestamp TEXT NOT NULL,
    response_timestamp TEXT NOT NULL,
    latency_seconds REAL NOT NULL,
    FOREIGN KEY (run_id) REFERENCES benchmark_runs(run_id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_metrics_run_id ON metrics(run_id);
";
