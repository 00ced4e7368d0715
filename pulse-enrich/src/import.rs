//! Import candidate outputs into the store through duplicate resolution.
//!
//! The stored identity set and the new candidates are resolved together, so
//! a candidate can replace a stored doi-less output. A replaced stored output
//! keeps its id and enrichment data and takes the candidate's bibliographic
//! fields.

use std::collections::BTreeMap;
use std::path::Path;

use pulse_catalog::types::CandidateOutput;
use pulse_db::{OperationError, adopt_identity, identity_set, insert_output};
use rusqlite::Connection;
use thiserror::Error;

use crate::progress::BatchProgress;
use crate::resolve::{Resolution, resolve};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Database error: {0}")]
    Db(#[from] OperationError),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid candidate file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Statistics from an import.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub candidates: u64,
    pub added: u64,
    /// Stored or earlier doi-less outputs replaced by a doi-bearing candidate.
    pub replaced: u64,
    pub duplicates: u64,
}

/// Read a JSON array of candidate outputs.
pub fn read_candidates(path: &Path) -> Result<Vec<CandidateOutput>, ImportError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Resolve candidates against the store and write the result in one
/// transaction. Returns what happened to each candidate in aggregate.
pub fn import_candidates(
    conn: &Connection,
    candidates: Vec<CandidateOutput>,
    progress: &dyn BatchProgress,
) -> Result<ImportStats, ImportError> {
    let mut stats = ImportStats::default();
    let mut set = identity_set(conn)?;
    let stored = set.len();
    let stored_ids: Vec<String> = set.iter().map(|o| o.id.clone()).collect();
    // Slot index -> id of the stored output living there before replacement.
    let mut adopted: BTreeMap<usize, String> = BTreeMap::new();
    let total = candidates.len();

    progress.on_phase(&format!(
        "Resolving {} candidates against {} stored outputs",
        total, stored
    ));

    for (i, candidate) in candidates.into_iter().enumerate() {
        stats.candidates += 1;
        let candidate = candidate.into_output();

        let title = candidate.display_title().to_string();
        match resolve(candidate, &mut set) {
            Resolution::Added(_) => stats.added += 1,
            Resolution::Replaced(slot) => {
                stats.replaced += 1;
                if let Some(id) = stored_ids.get(slot) {
                    adopted.entry(slot).or_insert_with(|| id.clone());
                }
            }
            Resolution::Duplicate => {
                log::debug!("Skipping duplicate '{}'", title);
                stats.duplicates += 1;
            }
        }
        progress.on_output(i + 1, Some(total), &title);
    }

    let tx = conn.unchecked_transaction()?;
    for (slot, stored_id) in &adopted {
        adopt_identity(&tx, stored_id, &set[*slot])?;
    }
    for output in &set[stored..] {
        insert_output(&tx, output)?;
    }
    tx.commit()?;

    progress.on_complete(&format!(
        "Imported {} candidates: {} added, {} replaced, {} duplicates",
        stats.candidates, stats.added, stats.replaced, stats.duplicates
    ));
    Ok(stats)
}
