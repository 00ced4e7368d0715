use std::collections::BTreeMap;
use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use pulse_catalog::{Output, source_summaries};
use pulse_providers::is_sentinel;
use serde_json::Value;

use crate::CliError;

fn field(name: &str, value: Option<&str>) {
    let label = format!("{}:", name);
    match value {
        Some(v) => log::info!("  {:<14} {}", label.if_supports_color(Stdout, |t| t.cyan()), v),
        None => log::info!(
            "  {:<14} {}",
            label.if_supports_color(Stdout, |t| t.cyan()),
            "-".if_supports_color(Stdout, |t| t.dimmed()),
        ),
    }
}

/// How a raw provider slot looks: never fetched, a "no data" marker, or data.
fn payload_state(raw: Option<&Value>) -> String {
    match raw {
        None => "not fetched".to_string(),
        Some(value) if is_sentinel(value) => format!(
            "no data ({})",
            value.get("error").and_then(Value::as_str).unwrap_or("?")
        ),
        Some(_) => "stored".to_string(),
    }
}

/// Largest counts first, at most `n` of them.
fn top(counts: &BTreeMap<String, i64>, n: usize) -> Option<String> {
    if counts.is_empty() {
        return None;
    }
    let mut entries: Vec<(&String, &i64)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    Some(
        entries
            .into_iter()
            .take(n)
            .map(|(k, v)| format!("{} ({})", k, v))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// Print one stored output with its derived fields.
pub(crate) fn run_show(db_path: &Path, id: &str) -> Result<(), CliError> {
    let conn = super::open_db(db_path)?;
    let output = pulse_db::find_output(&conn, id)
        .map_err(|e| CliError::database(e.to_string()))?
        .ok_or_else(|| CliError::other(format!("No output with id '{}'", id)))?;

    print_output(&output);
    Ok(())
}

fn print_output(output: &Output) {
    let derived = output.derived();

    log::info!(
        "{}",
        output.display_title().if_supports_color(Stdout, |t| t.bold()),
    );
    crate::log_blank();
    field("id", Some(&output.id));
    field("doi", output.doi.as_deref());
    field("isbn", output.isbn.as_deref());
    field("type", output.work_type.as_deref());
    field("genre", Some(&derived.genre));
    field("authors", output.authors.as_deref());
    field("year", output.year.as_deref());
    field("journal", output.journal.as_deref());
    field("fulltext", output.fulltext_url.as_deref());
    field("license", output.license.as_deref());

    crate::log_blank();
    field("attention", Some(&payload_state(output.altmetric_raw.as_ref())));
    field("readership", Some(&payload_state(output.mendeley_raw.as_ref())));
    let score = format!("{:.2}", derived.altmetric_score);
    field("score", Some(&score));
    let readers = derived.mendeley_readers.to_string();
    field("readers", Some(&readers));
    field("countries", top(&derived.country_counts, 5).as_deref());
    field("disciplines", top(&derived.discipline_counts, 5).as_deref());
    field("job titles", top(&derived.job_title_counts, 5).as_deref());
    if !derived.language_examples.is_empty() {
        let languages: Vec<&str> = derived.language_examples.keys().map(String::as_str).collect();
        field("languages", Some(&languages.join(", ")));
    }

    let summaries = source_summaries(output, chrono::Utc::now());
    if !summaries.is_empty() {
        crate::log_blank();
        log::info!("  {}", "Sources".if_supports_color(Stdout, |t| t.bold()));
        for summary in &summaries {
            log::info!(
                "    {:<22} {:>6} posts {:>4} this week",
                summary.display_name,
                summary.posts_count,
                summary.events_last_week_count,
            );
        }
    }

    if let Some(ref error) = output.error {
        crate::log_blank();
        log::warn!(
            "{} last update: {}",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            error,
        );
    }
}
