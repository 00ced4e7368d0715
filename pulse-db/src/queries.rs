//! Read queries for the output store.
//!
//! Provides lookup by id and doi, ordered id paging for batch runs, and
//! the identity view the importer resolves candidates against.

use pulse_catalog::types::*;
use rusqlite::{Connection, params, types::Type};
use serde::de::DeserializeOwned;

use crate::operations::OperationError;

const OUTPUT_COLUMNS: &str = "id, doi, isbn, title, work_type, url, authors, year, journal,
     altmetric_raw, mendeley_raw, user_supplied_fulltext_url, fulltext_url,
     license, evidence, altmetric_id, altmetric_score, post_counts,
     poster_counts, post_details, event_dates, country_counts,
     discipline_counts, job_title_counts, language_examples, genre,
     mendeley_readers, mendeley_url, error, created";

// ── Output Lookups ──────────────────────────────────────────────────────────

/// Load a full output by id.
pub fn find_output(conn: &Connection, id: &str) -> Result<Option<Output>, OperationError> {
    let sql = format!("SELECT {OUTPUT_COLUMNS} FROM outputs WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], row_to_output);
    match result {
        Ok(output) => Ok(Some(output)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Load a full output by doi (case-insensitive).
pub fn find_output_by_doi(conn: &Connection, doi: &str) -> Result<Option<Output>, OperationError> {
    let sql = format!("SELECT {OUTPUT_COLUMNS} FROM outputs WHERE LOWER(doi) = LOWER(?1)");
    let result = conn.query_row(&sql, params![doi], row_to_output);
    match result {
        Ok(output) => Ok(Some(output)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Id of the output that owns `doi`, ignoring `except_id`.
pub fn doi_owner(
    conn: &Connection,
    doi: &str,
    except_id: &str,
) -> Result<Option<String>, OperationError> {
    let result = conn.query_row(
        "SELECT id FROM outputs WHERE LOWER(doi) = LOWER(?1) AND id != ?2 LIMIT 1",
        params![doi, except_id],
        |row| row.get::<_, String>(0),
    );
    match result {
        Ok(id) => Ok(Some(id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Batch Paging ────────────────────────────────────────────────────────────

/// Output ids in ascending order, starting from `from`.
///
/// With `inclusive` the page starts at `from` itself, otherwise strictly
/// after it. `None` starts at the beginning.
pub fn output_ids_from(
    conn: &Connection,
    from: Option<&str>,
    inclusive: bool,
    limit: u32,
) -> Result<Vec<String>, OperationError> {
    let mut stmt = match (from, inclusive) {
        (None, _) => conn.prepare("SELECT id FROM outputs ORDER BY id LIMIT ?2")?,
        (Some(_), true) => {
            conn.prepare("SELECT id FROM outputs WHERE id >= ?1 ORDER BY id LIMIT ?2")?
        }
        (Some(_), false) => {
            conn.prepare("SELECT id FROM outputs WHERE id > ?1 ORDER BY id LIMIT ?2")?
        }
    };
    let rows = stmt.query_map(params![from, limit], |row| row.get::<_, String>(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Total number of stored outputs.
pub fn output_count(conn: &Connection) -> Result<i64, OperationError> {
    let count = conn.query_row("SELECT COUNT(*) FROM outputs", [], |r| r.get(0))?;
    Ok(count)
}

// ── Identity View ───────────────────────────────────────────────────────────

/// Every stored output's identity fields, in insertion order.
///
/// Payloads and derived fields are left empty; the result is only meant for
/// duplicate resolution.
pub fn identity_set(conn: &Connection) -> Result<Vec<Output>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT id, doi, isbn, title, created FROM outputs ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        let mut output = Output::with_id(row.get(0)?, row.get(3)?, row.get(4)?);
        output.doi = row.get(1)?;
        output.isbn = row.get(2)?;
        Ok(output)
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

// ── Row Mapping ─────────────────────────────────────────────────────────────

fn row_to_output(row: &rusqlite::Row<'_>) -> rusqlite::Result<Output> {
    let mut output = Output::with_id(row.get(0)?, row.get(3)?, row.get(29)?);
    output.doi = row.get(1)?;
    output.isbn = row.get(2)?;
    output.work_type = row.get(4)?;
    output.url = row.get(5)?;
    output.authors = row.get(6)?;
    output.year = row.get(7)?;
    output.journal = row.get(8)?;
    output.altmetric_raw = optional_json_column(row, 9)?;
    output.mendeley_raw = optional_json_column(row, 10)?;
    output.user_supplied_fulltext_url = row.get(11)?;
    output.fulltext_url = row.get(12)?;
    output.license = row.get(13)?;
    output.evidence = row.get(14)?;
    output.set_derived(DerivedFields {
        altmetric_id: row.get(15)?,
        altmetric_score: row.get(16)?,
        post_counts: json_column(row, 17)?,
        poster_counts: json_column(row, 18)?,
        posts: json_column(row, 19)?,
        event_dates: json_column(row, 20)?,
        country_counts: json_column(row, 21)?,
        discipline_counts: json_column(row, 22)?,
        job_title_counts: json_column(row, 23)?,
        language_examples: json_column(row, 24)?,
        genre: row.get(25)?,
        mendeley_readers: row.get(26)?,
        mendeley_url: row.get(27)?,
    });
    output.error = row.get(28)?;
    Ok(output)
}

fn json_column<T: DeserializeOwned>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_json_column<T: DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        serde_json::from_str(&t)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
