//! Genre classification from the work type and identifier fragments.
//!
//! Rules are checked in order and the first match wins.

use crate::types::Output;

/// DOI/URL fragments of preprint servers.
pub const PREPRINT_FRAGMENTS: &[&str] = &[
    "/npre.",
    "arxiv.org/",
    "10.15200/winn.",
    "/peerj.preprints",
    "10.1101/",
    "10.15363/",
];

/// figshare hosts both preprints and other genres, so it gets its own rule.
pub const FIGSHARE_FRAGMENT: &str = ".figshare.";

/// DOI/URL fragments of data repositories.
pub const DATASET_FRAGMENTS: &[&str] = &["/dryad.", "/zenodo.", ".gbif.org/"];

const DATASET_TYPES: &[&str] = &["data", "dataset", "data-set", "data_set", "data set"];

/// Classify an output's genre.
///
/// # Examples
///
/// ```
/// use pulse_catalog::genre::guess_genre;
///
/// assert_eq!(guess_genre(None, None, None), "article");
/// assert_eq!(guess_genre(Some("journal-article"), Some("10.1101/123"), None), "preprint");
/// assert_eq!(guess_genre(Some("dataset_raw"), None, None), "dataset-raw");
/// ```
pub fn guess_genre(work_type: Option<&str>, doi: Option<&str>, url: Option<&str>) -> String {
    let doi = doi.map(str::to_lowercase);
    let url = url.map(str::to_lowercase);
    let mentions = |fragments: &[&str]| {
        fragments.iter().any(|f| {
            doi.as_deref().is_some_and(|d| d.contains(f))
                || url.as_deref().is_some_and(|u| u.contains(f))
        })
    };

    if mentions(PREPRINT_FRAGMENTS) {
        return "preprint".to_string();
    }

    let Some(raw_type) = work_type.filter(|t| !t.trim().is_empty()) else {
        return "article".to_string();
    };
    let work_type = raw_type.trim().to_lowercase();

    if DATASET_TYPES.contains(&work_type.as_str()) {
        "dataset".to_string()
    } else if mentions(&[FIGSHARE_FRAGMENT]) {
        if work_type.contains("article") || work_type.contains("paper") {
            "preprint".to_string()
        } else {
            hyphenate(raw_type.trim())
        }
    } else if mentions(DATASET_FRAGMENTS) {
        "dataset".to_string()
    } else if work_type.contains("poster") {
        "poster".to_string()
    } else if work_type.contains("abstract") {
        "abstract".to_string()
    } else if work_type.contains("article") {
        "article".to_string()
    } else {
        hyphenate(raw_type.trim())
    }
}

/// Genre for an output, using its type, doi and url.
pub fn genre_for(output: &Output) -> String {
    guess_genre(
        output.work_type.as_deref(),
        output.doi.as_deref(),
        output.url.as_deref(),
    )
}

fn hyphenate(work_type: &str) -> String {
    work_type.replace('_', "-")
}
