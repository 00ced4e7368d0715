//! Queue worker: claims queued jobs one at a time and runs them inline.
//!
//! Run more worker processes against the same database for more throughput.

use std::time::Duration;

use pulse_db::{claim_next_job, finish_job, release_job};
use rusqlite::Connection;

use crate::enrich::{EnrichError, Enricher, Job};
use crate::progress::BatchProgress;

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Stop after this many jobs.
    pub max_jobs: Option<usize>,
    /// Wait between polls of an empty queue.
    pub poll_interval: Duration,
    /// Stop as soon as the queue is empty instead of polling.
    pub exit_when_empty: bool,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            max_jobs: None,
            poll_interval: Duration::from_secs(5),
            exit_when_empty: false,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    pub done: u64,
    pub failed: u64,
    /// A job was handed back to the queue because of termination.
    pub interrupted: bool,
}

/// Process queued jobs until the queue drains (with `exit_when_empty`), the
/// job limit is reached, or the process is told to stop.
pub async fn run_worker(
    conn: &Connection,
    enricher: &Enricher,
    options: &WorkerOptions,
    progress: &dyn BatchProgress,
) -> Result<WorkerStats, EnrichError> {
    let mut stats = WorkerStats::default();
    let shutdown = enricher.shutdown();

    loop {
        if shutdown.is_triggered() {
            break;
        }
        let handled = (stats.done + stats.failed) as usize;
        if options.max_jobs.is_some_and(|max| handled >= max) {
            break;
        }

        let job = match claim_next_job(conn)? {
            Some(job) => job,
            None if options.exit_when_empty => break,
            None => {
                progress.on_phase("Queue empty, waiting");
                tokio::select! {
                    () = tokio::time::sleep(options.poll_interval) => {}
                    () = shutdown.triggered() => {}
                }
                continue;
            }
        };

        let Some(kind) = Job::from_name(&job.job) else {
            log::warn!("Job {} has unknown kind '{}'", job.id, job.job);
            finish_job(conn, job.id, Some("unknown job kind"))?;
            stats.failed += 1;
            continue;
        };

        match enricher.enrich_stored(conn, &job.output_id, kind).await {
            Ok(_) => {
                finish_job(conn, job.id, None)?;
                stats.done += 1;
            }
            Err(EnrichError::Terminated) => {
                release_job(conn, job.id)?;
                stats.interrupted = true;
                log::warn!("Terminated during job {}; returned it to the queue", job.id);
                break;
            }
            Err(e) => {
                log::error!("Job {} for {} failed: {e}", job.id, job.output_id);
                finish_job(conn, job.id, Some(&e.to_string()))?;
                stats.failed += 1;
            }
        }
        progress.on_output((stats.done + stats.failed) as usize, options.max_jobs, &job.output_id);
    }

    progress.on_complete(&format!(
        "Worker finished: {} jobs done, {} failed",
        stats.done, stats.failed
    ));
    Ok(stats)
}
