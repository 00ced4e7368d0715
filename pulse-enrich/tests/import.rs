use std::io::Write;

use pulse_catalog::types::{CandidateOutput, Output};
use pulse_db::*;
use pulse_enrich::*;
use serde_json::json;

fn candidate(title: &str, doi: Option<&str>) -> CandidateOutput {
    CandidateOutput {
        title: Some(title.to_string()),
        doi: doi.map(str::to_string),
        ..Default::default()
    }
}

#[test]
fn candidates_are_resolved_before_insert() {
    let conn = open_memory().unwrap();
    let stats = import_candidates(
        &conn,
        vec![
            candidate("Foo", None),
            candidate("Foo", Some("10.1/x")),
            candidate("Foo", Some("10.1/x")),
            candidate("Bar", Some("https://doi.org/10.1/bar")),
        ],
        &SilentProgress,
    )
    .unwrap();

    assert_eq!(
        stats,
        ImportStats {
            candidates: 4,
            added: 2,
            replaced: 1,
            duplicates: 1,
        }
    );
    assert_eq!(output_count(&conn).unwrap(), 2);
    assert!(find_output_by_doi(&conn, "10.1/x").unwrap().is_some());
    assert!(find_output_by_doi(&conn, "10.1/bar").unwrap().is_some());
}

#[test]
fn stored_doi_less_output_adopts_candidate_identity() {
    let conn = open_memory().unwrap();
    let mut stored = Output::new(Some("The Cell".to_string()));
    stored.altmetric_raw = Some(json!({"score": 12}));
    insert_output(&conn, &stored).unwrap();

    let stats = import_candidates(
        &conn,
        vec![candidate("the cell.", Some("10.1/cell"))],
        &SilentProgress,
    )
    .unwrap();
    assert_eq!(stats.replaced, 1);
    assert_eq!(output_count(&conn).unwrap(), 1);

    let loaded = find_output(&conn, &stored.id).unwrap().unwrap();
    assert_eq!(loaded.doi.as_deref(), Some("10.1/cell"));
    assert_eq!(loaded.title(), Some("the cell."));
    assert_eq!(loaded.altmetric_raw, Some(json!({"score": 12})));
}

#[test]
fn doi_held_under_another_title_is_skipped() {
    let conn = open_memory().unwrap();
    import_candidates(&conn, vec![candidate("Methods", Some("10.1/a"))], &SilentProgress).unwrap();

    let stats = import_candidates(
        &conn,
        vec![
            candidate("Methods, revised", Some("10.1/A")),
            candidate("Methods", Some("10.1/b")),
        ],
        &SilentProgress,
    )
    .unwrap();

    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.added, 1);
    assert_eq!(output_count(&conn).unwrap(), 2);
}

#[test]
fn reimporting_the_same_file_adds_nothing() {
    let conn = open_memory().unwrap();
    let batch = || vec![candidate("One", Some("10.1/one")), candidate("Two", None)];
    import_candidates(&conn, batch(), &SilentProgress).unwrap();

    let stats = import_candidates(&conn, batch(), &SilentProgress).unwrap();
    assert_eq!(stats.added, 0);
    assert_eq!(stats.duplicates, 2);
    assert_eq!(output_count(&conn).unwrap(), 2);
}

#[test]
fn candidates_are_read_from_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        json!([
            {"title": "Data", "doi": "10.5061/dryad.1", "type": "dataset", "authors": "Smith, J"},
            {"title": "Notes", "fulltext_url": "https://me.example/notes.pdf"}
        ])
    )
    .unwrap();

    let candidates = read_candidates(file.path()).unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].work_type.as_deref(), Some("dataset"));

    let conn = open_memory().unwrap();
    import_candidates(&conn, candidates, &SilentProgress).unwrap();
    let notes = identity_set(&conn)
        .unwrap()
        .into_iter()
        .find(|o| o.title() == Some("Notes"))
        .unwrap();
    let notes = find_output(&conn, &notes.id).unwrap().unwrap();
    assert_eq!(
        notes.user_supplied_fulltext_url.as_deref(),
        Some("https://me.example/notes.pdf")
    );
}

#[test]
fn malformed_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{\"not\": \"a list\"}}").unwrap();
    assert!(matches!(
        read_candidates(file.path()),
        Err(ImportError::Json(_))
    ));
}
