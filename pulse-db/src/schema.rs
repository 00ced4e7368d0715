//! Output store schema and its upgrades.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database is at schema version {found}, newer than the supported {expected}")]
    VersionMismatch { expected: i32, found: i32 },
}

pub const CURRENT_VERSION: i32 = 2;

/// Steps that bring a database at `version - 1` up to `version`.
const UPGRADES: &[(i32, &str)] = &[(2, JOBS_SQL)];

/// Create every table and index at the current version.
///
/// Idempotent: safe to call on an existing database.
pub fn create_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute_batch(JOBS_SQL)?;
    record_version(conn, CURRENT_VERSION)
}

/// Open (creating if needed) the output store at `path`.
///
/// Fresh files get the full schema, older ones are upgraded in place, and a
/// file written by a newer build is refused.
pub fn open_database(path: &Path) -> Result<Connection, SchemaError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;

    match get_schema_version(&conn)? {
        0 => create_schema(&conn)?,
        found if found > CURRENT_VERSION => {
            return Err(SchemaError::VersionMismatch {
                expected: CURRENT_VERSION,
                found,
            });
        }
        found => upgrade(&conn, found)?,
    }
    Ok(conn)
}

/// In-memory store with the full schema, for tests.
pub fn open_memory() -> Result<Connection, SchemaError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Highest recorded schema version; 0 for a database with no schema.
pub fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let table: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if table.is_none() {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT IFNULL(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn record_version(conn: &Connection, version: i32) -> Result<(), SchemaError> {
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

fn upgrade(conn: &Connection, from: i32) -> Result<(), SchemaError> {
    for &(version, sql) in UPGRADES.iter().filter(|(v, _)| *v > from) {
        log::info!("Upgrading output store to schema version {}", version);
        conn.execute_batch(sql)?;
        record_version(conn, version)?;
    }
    Ok(())
}

/// Version 1 schema: outputs only.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Research outputs: identity, raw provider payloads, derived fields
CREATE TABLE IF NOT EXISTS outputs (
    id TEXT PRIMARY KEY,
    doi TEXT,
    isbn TEXT,
    title TEXT,
    normalized_title TEXT NOT NULL,
    work_type TEXT,
    url TEXT,
    authors TEXT,
    year TEXT,
    journal TEXT,
    altmetric_raw TEXT,
    mendeley_raw TEXT,
    user_supplied_fulltext_url TEXT,
    fulltext_url TEXT,
    license TEXT,
    evidence TEXT,
    altmetric_id TEXT,
    altmetric_score REAL NOT NULL DEFAULT 0,
    post_counts TEXT NOT NULL DEFAULT '{}',
    poster_counts TEXT NOT NULL DEFAULT '{}',
    post_details TEXT NOT NULL DEFAULT '[]',
    event_dates TEXT NOT NULL DEFAULT '{}',
    country_counts TEXT NOT NULL DEFAULT '{}',
    discipline_counts TEXT NOT NULL DEFAULT '{}',
    job_title_counts TEXT NOT NULL DEFAULT '{}',
    language_examples TEXT NOT NULL DEFAULT '{}',
    genre TEXT NOT NULL DEFAULT '',
    mendeley_readers INTEGER NOT NULL DEFAULT 0,
    mendeley_url TEXT,
    error TEXT,
    created TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_outputs_doi ON outputs(doi) WHERE doi IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_outputs_normalized_title ON outputs(normalized_title);
"#;

/// Added in version 2: one row per queued enrichment task.
pub const JOBS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS enrich_jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    output_id TEXT NOT NULL,
    job TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'queued',
    error TEXT,
    enqueued_at TEXT NOT NULL DEFAULT (datetime('now')),
    started_at TEXT,
    finished_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_enrich_jobs_status ON enrich_jobs(status, id);
"#;
