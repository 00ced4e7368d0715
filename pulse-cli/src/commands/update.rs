use std::path::Path;
use std::time::Instant;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use pulse_enrich::{
    BatchOptions, BatchStats, InlineExecutor, Job, QueueExecutor, ScheduleError, Scope, run_batch,
};

use crate::CliError;
use crate::cli_types::ScopeArgs;
use crate::spinner::BatchSpinner;

fn batch_options(scope: ScopeArgs) -> BatchOptions {
    let target = match (scope.id, scope.after) {
        (Some(id), _) => Scope::One(id),
        (None, Some(after)) => Scope::After(after),
        (None, None) => Scope::Scan,
    };
    BatchOptions {
        scope: target,
        limit: scope.limit,
        chunk_size: scope.chunk,
    }
}

/// Run (or queue) an enrichment job over stored outputs.
pub(crate) fn run_update(
    db_path: &Path,
    job: &str,
    scope: ScopeArgs,
    queue: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let job = Job::from_name(job).ok_or_else(|| {
        CliError::other(format!(
            "Unknown job '{}' (expected 'refresh' or 'normalize')",
            job
        ))
    })?;
    let conn = super::open_db(db_path)?;
    let options = batch_options(scope);
    let rt = super::runtime()?;
    let start = Instant::now();

    log::info!(
        "{} {} over {}",
        if queue { "Queueing" } else { "Running" },
        job.if_supports_color(Stdout, |t| t.bold()),
        db_path.display().if_supports_color(Stdout, |t| t.cyan()),
    );

    let result = rt.block_on(async {
        let spinner = BatchSpinner::new(quiet);
        let outcome = if queue {
            let executor = QueueExecutor::new(&conn, job);
            run_batch(&conn, &executor, &options, &spinner).await
        } else {
            let enricher = match super::live_enricher() {
                Ok(enricher) => enricher,
                Err(e) => return Err(ScheduleOrCli::Cli(e)),
            };
            let executor = InlineExecutor::new(&conn, &enricher, job);
            run_batch(&conn, &executor, &options, &spinner).await
        };
        outcome.map_err(ScheduleOrCli::Schedule)
    });

    let stats = match result {
        Ok(stats) => stats,
        Err(ScheduleOrCli::Cli(e)) => return Err(e),
        Err(ScheduleOrCli::Schedule(ScheduleError::Terminated { completed })) => {
            return Err(CliError::interrupted(format!(
                "stopped after {} outputs; resume with --after <next id>",
                completed
            )));
        }
        Err(ScheduleOrCli::Schedule(ScheduleError::EmptyChunk)) => {
            return Err(CliError::other("--chunk must be at least 1"));
        }
        Err(ScheduleOrCli::Schedule(e)) => return Err(CliError::database(e.to_string())),
    };

    print_summary(&stats, queue);
    log::info!("finished update in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

enum ScheduleOrCli {
    Schedule(ScheduleError),
    Cli(CliError),
}

fn print_summary(stats: &BatchStats, queue: bool) {
    crate::log_blank();
    if queue {
        log::info!(
            "{} Queued {} jobs",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            stats.queued,
        );
    } else {
        log::info!(
            "{} Updated {} outputs",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            stats.completed,
        );
        if stats.with_errors > 0 {
            log::info!(
                "  {} with provider errors (see `pulse show <id>`)",
                stats.with_errors.if_supports_color(Stdout, |t| t.yellow()),
            );
        }
    }
    if stats.failed > 0 {
        log::warn!(
            "{} {} outputs could not be processed",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            stats.failed,
        );
    }
}
