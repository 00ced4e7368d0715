use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use pulse_enrich::{ImportError, import_candidates, read_candidates};

use crate::CliError;
use crate::spinner::BatchSpinner;

/// Import candidate outputs from a JSON file.
pub(crate) fn run_import(db_path: &Path, file: &Path, quiet: bool) -> Result<(), CliError> {
    let candidates = read_candidates(file).map_err(|e| match e {
        ImportError::Io(e) => CliError::Io(e),
        other => CliError::other(format!("{}: {}", file.display(), other)),
    })?;
    let conn = super::open_db(db_path)?;

    log::info!(
        "Importing {} candidates from {}",
        candidates.len(),
        file.display().if_supports_color(Stdout, |t| t.cyan()),
    );

    let stats = {
        let spinner = BatchSpinner::new(quiet);
        import_candidates(&conn, candidates, &spinner)
            .map_err(|e| CliError::database(e.to_string()))?
    };

    crate::log_blank();
    log::info!(
        "{} {} added, {} replaced a stored entry, {} duplicates skipped",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        stats.added.if_supports_color(Stdout, |t| t.bold()),
        stats.replaced,
        stats.duplicates.if_supports_color(Stdout, |t| t.dimmed()),
    );
    Ok(())
}
