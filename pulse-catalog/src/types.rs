//! Data model types for research outputs.
//!
//! An [`Output`] is the canonical record for one paper, dataset, or preprint.
//! Raw provider payloads are stored as opaque JSON documents; everything
//! computed from them lives in [`DerivedFields`] and is replaced as a whole.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::title::normalize_title;

/// Title used for display and title matching when an output has none.
pub const UNTITLED: &str = "No title";

// ── Output ──────────────────────────────────────────────────────────────────

/// A research output being enriched.
///
/// Not deserializable: the title and its normalized form are only set
/// together, through [`Output::with_id`] and [`Output::set_title`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    pub id: String,
    pub doi: Option<String>,
    pub isbn: Option<String>,
    title: Option<String>,
    normalized_title: String,
    /// Free-text work type from the importing profile (e.g. "journal-article").
    pub work_type: Option<String>,
    pub url: Option<String>,
    /// Comma-separated author list, family name first.
    pub authors: Option<String>,
    pub year: Option<String>,
    pub journal: Option<String>,

    /// Attention-metrics provider payload (full document or sentinel).
    pub altmetric_raw: Option<Value>,
    /// Readership provider payload (full document or sentinel).
    pub mendeley_raw: Option<Value>,

    pub user_supplied_fulltext_url: Option<String>,
    pub fulltext_url: Option<String>,
    pub license: Option<String>,
    pub evidence: Option<String>,

    derived: DerivedFields,

    /// Most recent failure for this output, if the last pass had one.
    pub error: Option<String>,
    pub created: String,
}

impl Output {
    /// Create a new output with a fresh id and creation timestamp.
    pub fn new(title: Option<String>) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self::with_id(id, title, chrono::Utc::now().to_rfc3339())
    }

    /// Rebuild an output with a known id, e.g. when loading from storage.
    pub fn with_id(id: String, title: Option<String>, created: String) -> Self {
        let normalized_title = normalize_title(display_title(title.as_deref()));
        Self {
            id,
            doi: None,
            isbn: None,
            title,
            normalized_title,
            work_type: None,
            url: None,
            authors: None,
            year: None,
            journal: None,
            altmetric_raw: None,
            mendeley_raw: None,
            user_supplied_fulltext_url: None,
            fulltext_url: None,
            license: None,
            evidence: None,
            derived: DerivedFields::default(),
            error: None,
            created,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Replace the title, keeping the normalized form in step.
    pub fn set_title(&mut self, title: Option<String>) {
        self.normalized_title = normalize_title(display_title(title.as_deref()));
        self.title = title;
    }

    pub fn display_title(&self) -> &str {
        display_title(self.title.as_deref())
    }

    pub fn normalized_title(&self) -> &str {
        &self.normalized_title
    }

    pub fn derived(&self) -> &DerivedFields {
        &self.derived
    }

    /// Swap in a freshly computed set of derived fields.
    pub fn set_derived(&mut self, derived: DerivedFields) {
        self.derived = derived;
    }

    /// Family name of the first listed author.
    pub fn first_author_family_name(&self) -> Option<&str> {
        let first = self.authors.as_deref()?.split(',').next()?.trim();
        if first.is_empty() { None } else { Some(first) }
    }

    /// Record a user-supplied fulltext link, which takes the place of a
    /// resolver answer.
    pub fn set_user_supplied_fulltext_url(&mut self, url: String) {
        self.fulltext_url = Some(url.clone());
        self.user_supplied_fulltext_url = Some(url);
        self.evidence = Some("user supplied fulltext url".to_string());
        self.license = Some("unknown".to_string());
    }

    pub fn has_fulltext_url(&self) -> bool {
        self.fulltext_url.is_some()
    }

    /// Total posts across every known source.
    pub fn num_posts(&self) -> i64 {
        self.derived.post_counts.values().sum()
    }

    /// Posts plus readership saves.
    pub fn num_mentions(&self) -> i64 {
        self.num_posts() + self.derived.mendeley_readers
    }

    pub fn has_source(&self, source: &str) -> bool {
        self.derived.post_counts.contains_key(source)
    }

    /// Open-access resolver request body for this output: doi when known,
    /// otherwise the title.
    pub fn biblio_for_open_access(&self) -> BiblioDescriptor {
        match &self.doi {
            Some(doi) => BiblioDescriptor::Doi { doi: doi.clone() },
            None => BiblioDescriptor::Title {
                title: self.display_title().to_string(),
            },
        }
    }
}

fn display_title(title: Option<&str>) -> &str {
    match title {
        Some(t) if !t.trim().is_empty() => t,
        _ => UNTITLED,
    }
}

/// Bibliographic descriptor posted to the open-access resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BiblioDescriptor {
    Doi { doi: String },
    Title { title: String },
}

// ── Derived Fields ──────────────────────────────────────────────────────────

/// Everything computed from the raw payloads by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedFields {
    pub post_counts: BTreeMap<String, i64>,
    pub poster_counts: BTreeMap<String, i64>,
    pub posts: Vec<Post>,
    /// Post timestamps bucketed by source, ascending within each bucket.
    pub event_dates: BTreeMap<String, Vec<String>>,
    pub altmetric_score: f64,
    pub altmetric_id: Option<String>,
    pub country_counts: BTreeMap<String, i64>,
    pub discipline_counts: BTreeMap<String, i64>,
    pub job_title_counts: BTreeMap<String, i64>,
    /// Language name to one example post URL written in that language.
    pub language_examples: BTreeMap<String, String>,
    pub genre: String,
    pub mendeley_readers: i64,
    pub mendeley_url: Option<String>,
}

/// One mention of an output, flattened from a provider's per-source lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub source: String,
    pub posted_on: Option<String>,
    pub attribution: Option<String>,
    pub url: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<i64>,
}

// ── Open Access ─────────────────────────────────────────────────────────────

/// Answer from the open-access resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAccessRecord {
    pub fulltext_url: Option<String>,
    pub license: Option<String>,
    pub evidence: Option<String>,
}

// ── Import Candidates ───────────────────────────────────────────────────────

/// A candidate output as supplied to the importer, before it has an id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateOutput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default, rename = "type")]
    pub work_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub fulltext_url: Option<String>,
}

impl CandidateOutput {
    /// Turn the candidate into a fresh output, cleaning its doi.
    pub fn into_output(self) -> Output {
        let mut output = Output::new(self.title);
        output.doi = self.doi.as_deref().and_then(crate::title::clean_doi);
        output.isbn = self.isbn.filter(|s| !s.trim().is_empty());
        output.work_type = self.work_type;
        output.url = self.url;
        output.authors = self.authors;
        output.year = self.year;
        output.journal = self.journal;
        if let Some(url) = self.fulltext_url {
            output.set_user_supplied_fulltext_url(url);
        }
        output
    }
}
