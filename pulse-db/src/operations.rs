//! Write operations for outputs.

use pulse_catalog::types::*;
use rusqlite::{Connection, params};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Entity not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },
}

// ── Output Operations ───────────────────────────────────────────────────────

/// Insert a new output row.
pub fn insert_output(conn: &Connection, output: &Output) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO outputs (id, doi, normalized_title, created) VALUES (?1, ?2, ?3, ?4)",
        params![
            output.id,
            output.doi,
            output.normalized_title(),
            output.created
        ],
    )?;
    write_fields(conn, output)?;
    log::debug!("Inserted output {}", output.id);
    Ok(())
}

/// Persist every mutable field of an existing output.
///
/// The id and creation timestamp never change.
pub fn save_output(conn: &Connection, output: &Output) -> Result<(), OperationError> {
    write_fields(conn, output)
}

/// Give a stored output the bibliographic identity of a better candidate.
///
/// Used when import resolution replaces a title-only output with one that
/// carries a doi. The stored id, creation time, provider payloads and
/// derived fields are kept.
pub fn adopt_identity(
    conn: &Connection,
    existing_id: &str,
    candidate: &Output,
) -> Result<(), OperationError> {
    let changed = conn.execute(
        "UPDATE outputs SET
             doi = ?2, isbn = ?3, title = ?4, normalized_title = ?5,
             work_type = ?6, url = ?7, authors = ?8, year = ?9, journal = ?10,
             updated_at = datetime('now')
         WHERE id = ?1",
        params![
            existing_id,
            candidate.doi,
            candidate.isbn,
            candidate.title(),
            candidate.normalized_title(),
            candidate.work_type,
            candidate.url,
            candidate.authors,
            candidate.year,
            candidate.journal,
        ],
    )?;
    if changed == 0 {
        return Err(not_found(existing_id));
    }
    log::info!(
        "Output {} adopted doi {}",
        existing_id,
        candidate.doi.as_deref().unwrap_or("-")
    );
    Ok(())
}

fn write_fields(conn: &Connection, output: &Output) -> Result<(), OperationError> {
    let derived = output.derived();
    let changed = conn.execute(
        "UPDATE outputs SET
             doi = ?2, isbn = ?3, title = ?4, normalized_title = ?5,
             work_type = ?6, url = ?7, authors = ?8, year = ?9, journal = ?10,
             altmetric_raw = ?11, mendeley_raw = ?12,
             user_supplied_fulltext_url = ?13, fulltext_url = ?14,
             license = ?15, evidence = ?16,
             altmetric_id = ?17, altmetric_score = ?18,
             post_counts = ?19, poster_counts = ?20, post_details = ?21,
             event_dates = ?22, country_counts = ?23, discipline_counts = ?24,
             job_title_counts = ?25, language_examples = ?26,
             genre = ?27, mendeley_readers = ?28, mendeley_url = ?29,
             error = ?30, updated_at = datetime('now')
         WHERE id = ?1",
        params![
            output.id,
            output.doi,
            output.isbn,
            output.title(),
            output.normalized_title(),
            output.work_type,
            output.url,
            output.authors,
            output.year,
            output.journal,
            optional_json(output.altmetric_raw.as_ref())?,
            optional_json(output.mendeley_raw.as_ref())?,
            output.user_supplied_fulltext_url,
            output.fulltext_url,
            output.license,
            output.evidence,
            derived.altmetric_id,
            derived.altmetric_score,
            serde_json::to_string(&derived.post_counts)?,
            serde_json::to_string(&derived.poster_counts)?,
            serde_json::to_string(&derived.posts)?,
            serde_json::to_string(&derived.event_dates)?,
            serde_json::to_string(&derived.country_counts)?,
            serde_json::to_string(&derived.discipline_counts)?,
            serde_json::to_string(&derived.job_title_counts)?,
            serde_json::to_string(&derived.language_examples)?,
            derived.genre,
            derived.mendeley_readers,
            derived.mendeley_url,
            output.error,
        ],
    )?;
    if changed == 0 {
        return Err(not_found(&output.id));
    }
    Ok(())
}

fn optional_json(value: Option<&serde_json::Value>) -> Result<Option<String>, OperationError> {
    value
        .map(serde_json::to_string)
        .transpose()
        .map_err(Into::into)
}

fn not_found(id: &str) -> OperationError {
    OperationError::NotFound {
        entity_type: "output".to_string(),
        id: id.to_string(),
    }
}
