//! Durable enrichment job queue.
//!
//! Queued dispatch writes one row per output; `pulse worker` processes claim
//! rows one at a time. A claim is a single `UPDATE ... RETURNING`, so two
//! workers sharing a database never take the same job.

use rusqlite::{Connection, params};

use crate::operations::OperationError;

/// Lifecycle state of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

/// A job claimed by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub id: i64,
    pub output_id: String,
    pub job: String,
}

/// Per-status job totals.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JobCounts {
    pub queued: i64,
    pub running: i64,
    pub done: i64,
    pub failed: i64,
}

/// Queue `job` for one output. Returns the job row id.
pub fn enqueue_job(conn: &Connection, output_id: &str, job: &str) -> Result<i64, OperationError> {
    conn.execute(
        "INSERT INTO enrich_jobs (output_id, job) VALUES (?1, ?2)",
        params![output_id, job],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Claim the oldest queued job, marking it running.
pub fn claim_next_job(conn: &Connection) -> Result<Option<QueuedJob>, OperationError> {
    let result = conn.query_row(
        "UPDATE enrich_jobs
         SET status = 'running', started_at = datetime('now')
         WHERE id = (SELECT id FROM enrich_jobs WHERE status = 'queued' ORDER BY id LIMIT 1)
         RETURNING id, output_id, job",
        [],
        |row| {
            Ok(QueuedJob {
                id: row.get(0)?,
                output_id: row.get(1)?,
                job: row.get(2)?,
            })
        },
    );
    match result {
        Ok(job) => Ok(Some(job)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Mark a claimed job done, or failed with a reason.
pub fn finish_job(
    conn: &Connection,
    job_id: i64,
    error: Option<&str>,
) -> Result<(), OperationError> {
    let status = match error {
        Some(_) => JobStatus::Failed,
        None => JobStatus::Done,
    };
    let changed = conn.execute(
        "UPDATE enrich_jobs SET status = ?2, error = ?3, finished_at = datetime('now')
         WHERE id = ?1",
        params![job_id, status.as_str(), error],
    )?;
    if changed == 0 {
        return Err(OperationError::NotFound {
            entity_type: "job".to_string(),
            id: job_id.to_string(),
        });
    }
    Ok(())
}

/// Hand a claimed job back to the queue untouched.
pub fn release_job(conn: &Connection, job_id: i64) -> Result<(), OperationError> {
    let changed = conn.execute(
        "UPDATE enrich_jobs SET status = 'queued', started_at = NULL
         WHERE id = ?1 AND status = 'running'",
        params![job_id],
    )?;
    if changed == 0 {
        return Err(OperationError::NotFound {
            entity_type: "running job".to_string(),
            id: job_id.to_string(),
        });
    }
    Ok(())
}

/// Put jobs left running by a worker that died back on the queue.
pub fn requeue_running_jobs(conn: &Connection) -> Result<usize, OperationError> {
    let changed = conn.execute(
        "UPDATE enrich_jobs SET status = 'queued', started_at = NULL WHERE status = 'running'",
        [],
    )?;
    Ok(changed)
}

pub fn job_counts(conn: &Connection) -> Result<JobCounts, OperationError> {
    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM enrich_jobs GROUP BY status")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

    let mut counts = JobCounts::default();
    for row in rows {
        let (status, n) = row?;
        match status.as_str() {
            "queued" => counts.queued = n,
            "running" => counts.running = n,
            "done" => counts.done = n,
            "failed" => counts.failed = n,
            other => log::warn!("Ignoring unknown job status '{other}'"),
        }
    }
    Ok(counts)
}
