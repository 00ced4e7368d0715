//! Batch scheduling over the stored output set.
//!
//! A batch walks output ids in ascending order, a chunk at a time, and hands
//! each id to an [`Executor`]. Inline execution enriches and saves the output
//! before moving on; queued execution only records a job row for a worker.

use async_trait::async_trait;
use pulse_db::{OperationError, enqueue_job, output_ids_from};
use rusqlite::Connection;
use thiserror::Error;

use crate::enrich::{EnrichError, EnrichReport, Enricher, Job};
use crate::progress::BatchProgress;

pub const DEFAULT_CHUNK_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Database error: {0}")]
    Db(#[from] OperationError),
    #[error("Terminated by signal after {completed} outputs")]
    Terminated { completed: u64 },
    #[error("Chunk size must be at least 1")]
    EmptyChunk,
}

/// Which outputs a batch covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Exactly one output.
    One(String),
    /// Every output whose id is at or after the watermark.
    After(String),
    /// Every output.
    Scan,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub scope: Scope,
    /// Stop after this many outputs.
    pub limit: Option<usize>,
    /// Ids read from the store per query.
    pub chunk_size: u32,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            scope: Scope::Scan,
            limit: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct BatchStats {
    pub dispatched: u64,
    /// Enriched and saved inline.
    pub completed: u64,
    /// Completed, but at least one phase recorded an error.
    pub with_errors: u64,
    pub queued: u64,
    /// Dispatch itself failed (missing output, store error).
    pub failed: u64,
}

// ── Cursor ──────────────────────────────────────────────────────────────────

/// Pages through output ids in ascending order.
///
/// The first page includes the starting id; later pages start strictly after
/// the last id seen, so no id is returned twice.
pub struct IdCursor<'c> {
    conn: &'c Connection,
    last: Option<String>,
    inclusive: bool,
    chunk_size: u32,
    remaining: Option<usize>,
    exhausted: bool,
}

impl<'c> IdCursor<'c> {
    pub fn new(
        conn: &'c Connection,
        after: Option<&str>,
        chunk_size: u32,
        limit: Option<usize>,
    ) -> Self {
        Self {
            conn,
            last: after.map(str::to_string),
            inclusive: true,
            chunk_size,
            remaining: limit,
            exhausted: false,
        }
    }

    /// Next page of ids, or `None` once the set or the limit is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<String>>, OperationError> {
        if self.exhausted || self.remaining == Some(0) {
            return Ok(None);
        }
        let page_size = match self.remaining {
            Some(remaining) => (remaining.min(self.chunk_size as usize)) as u32,
            None => self.chunk_size,
        };

        let ids = output_ids_from(self.conn, self.last.as_deref(), self.inclusive, page_size)?;
        if ids.len() < page_size as usize {
            self.exhausted = true;
        }
        if ids.is_empty() {
            return Ok(None);
        }

        self.inclusive = false;
        self.last = ids.last().cloned();
        if let Some(ref mut remaining) = self.remaining {
            *remaining -= ids.len();
        }
        Ok(Some(ids))
    }
}

// ── Executors ───────────────────────────────────────────────────────────────

/// What happened to a submitted output.
#[derive(Debug, Clone, PartialEq)]
pub enum JobHandle {
    /// Enriched and saved before `submit` returned.
    Completed(EnrichReport),
    /// Recorded as a queue job row with this id.
    Queued(i64),
}

/// Dispatches one output id. Callers never know which strategy runs.
#[async_trait(?Send)]
pub trait Executor {
    async fn submit(&self, output_id: &str) -> Result<JobHandle, EnrichError>;
}

/// Enriches each output in the calling task.
pub struct InlineExecutor<'a> {
    conn: &'a Connection,
    enricher: &'a Enricher,
    job: Job,
}

impl<'a> InlineExecutor<'a> {
    pub fn new(conn: &'a Connection, enricher: &'a Enricher, job: Job) -> Self {
        Self { conn, enricher, job }
    }
}

#[async_trait(?Send)]
impl Executor for InlineExecutor<'_> {
    async fn submit(&self, output_id: &str) -> Result<JobHandle, EnrichError> {
        let report = self
            .enricher
            .enrich_stored(self.conn, output_id, self.job)
            .await?;
        Ok(JobHandle::Completed(report))
    }
}

/// Records a job row per output for `pulse worker` processes to pick up.
pub struct QueueExecutor<'a> {
    conn: &'a Connection,
    job: Job,
}

impl<'a> QueueExecutor<'a> {
    pub fn new(conn: &'a Connection, job: Job) -> Self {
        Self { conn, job }
    }
}

#[async_trait(?Send)]
impl Executor for QueueExecutor<'_> {
    async fn submit(&self, output_id: &str) -> Result<JobHandle, EnrichError> {
        let job_id = enqueue_job(self.conn, output_id, self.job.name())?;
        Ok(JobHandle::Queued(job_id))
    }
}

// ── Batch ───────────────────────────────────────────────────────────────────

/// Dispatch every output in scope, in ascending id order.
///
/// A failure for one output is logged and counted; the batch moves on. Only
/// termination stops it early.
pub async fn run_batch(
    conn: &Connection,
    executor: &dyn Executor,
    options: &BatchOptions,
    progress: &dyn BatchProgress,
) -> Result<BatchStats, ScheduleError> {
    if options.chunk_size == 0 {
        return Err(ScheduleError::EmptyChunk);
    }
    let mut stats = BatchStats::default();

    if let Scope::One(ref id) = options.scope {
        dispatch(executor, id, &mut stats).await?;
        progress.on_output(1, Some(1), id);
        progress.on_complete(&summary(&stats));
        return Ok(stats);
    }

    let after = match options.scope {
        Scope::After(ref min_id) => Some(min_id.as_str()),
        _ => None,
    };
    let mut cursor = IdCursor::new(conn, after, options.chunk_size, options.limit);

    loop {
        progress.on_phase("Fetching next chunk of output ids");
        let Some(ids) = cursor.next_chunk()? else {
            break;
        };
        log::debug!(
            "Dispatching {} outputs ({} to {})",
            ids.len(),
            ids.first().map(String::as_str).unwrap_or(""),
            ids.last().map(String::as_str).unwrap_or("")
        );
        for id in &ids {
            dispatch(executor, id, &mut stats).await?;
            progress.on_output(stats.dispatched as usize, options.limit, id);
        }
    }

    progress.on_complete(&summary(&stats));
    Ok(stats)
}

async fn dispatch(
    executor: &dyn Executor,
    output_id: &str,
    stats: &mut BatchStats,
) -> Result<(), ScheduleError> {
    match executor.submit(output_id).await {
        Ok(JobHandle::Completed(report)) => {
            stats.completed += 1;
            if report.has_failures() {
                stats.with_errors += 1;
            }
        }
        Ok(JobHandle::Queued(_)) => stats.queued += 1,
        Err(EnrichError::Terminated) => {
            log::warn!("Terminated while processing {output_id}; it was not saved");
            return Err(ScheduleError::Terminated {
                completed: stats.completed,
            });
        }
        Err(e) => {
            log::error!("Failed to process {output_id}: {e}");
            stats.failed += 1;
        }
    }
    stats.dispatched += 1;
    Ok(())
}

fn summary(stats: &BatchStats) -> String {
    format!(
        "Dispatched {} outputs: {} enriched ({} with errors), {} queued, {} failed",
        stats.dispatched, stats.completed, stats.with_errors, stats.queued, stats.failed
    )
}
