use std::path::Path;
use std::time::Duration;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use pulse_enrich::{LogProgress, WorkerOptions};

use crate::CliError;

/// Process queued enrichment jobs until told to stop.
pub(crate) fn run_worker(
    db_path: &Path,
    max_jobs: Option<usize>,
    poll_secs: u64,
    exit_when_empty: bool,
    requeue_stale: bool,
) -> Result<(), CliError> {
    let conn = super::open_db(db_path)?;
    if requeue_stale {
        let requeued = pulse_db::requeue_running_jobs(&conn)
            .map_err(|e| CliError::database(e.to_string()))?;
        if requeued > 0 {
            log::info!("Requeued {} stale jobs", requeued);
        }
    }
    let options = WorkerOptions {
        max_jobs,
        poll_interval: Duration::from_secs(poll_secs),
        exit_when_empty,
    };

    let counts = pulse_db::job_counts(&conn).map_err(|e| CliError::database(e.to_string()))?;
    log::info!(
        "Worker started: {} queued, {} running elsewhere",
        counts.queued.if_supports_color(Stdout, |t| t.bold()),
        counts.running,
    );

    let rt = super::runtime()?;
    let stats = rt.block_on(async {
        let enricher = super::live_enricher()?;
        pulse_enrich::run_worker(&conn, &enricher, &options, &LogProgress)
            .await
            .map_err(|e| CliError::database(e.to_string()))
    })?;

    crate::log_blank();
    log::info!(
        "{} {} jobs done, {} failed",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        stats.done,
        stats.failed,
    );
    if stats.interrupted {
        return Err(CliError::interrupted(
            "the job in progress was returned to the queue",
        ));
    }
    Ok(())
}
