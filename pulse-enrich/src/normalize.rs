//! Derived-field computation from raw provider payloads.
//!
//! [`FieldNormalizer::normalize`] is pure: the same raw payloads always give
//! the same [`DerivedFields`], which replace the previous ones wholesale.

use std::collections::BTreeMap;

use pulse_catalog::countries::{canonical_readership_country, name_from_iso};
use pulse_catalog::job_titles::standardize_job_title;
use pulse_catalog::languages::{DEFAULT_LANGUAGE, language_name};
use pulse_catalog::sources::{TITLED_SOURCES, is_known_source};
use pulse_catalog::types::{DerivedFields, Output, Post};
use pulse_catalog::genre_for;
use serde_json::{Map, Value};

/// Count keys in the attention payload that are not sources.
const NON_SOURCE_COUNTS: &[&str] = &["total", "readers"];

/// Longest derived post title, in words.
const MAX_TITLE_WORDS: usize = 15;

const UNTITLED_POST: &str = "No title.";

/// Texts with this many words or fewer are too short to classify.
const MIN_WORDS_FOR_DETECTION: usize = 7;
const MIN_LANGUAGE_CONFIDENCE: f64 = 0.90;

// ── Language Detection ──────────────────────────────────────────────────────

/// A detected language.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// ISO 639-3 code.
    pub code: String,
    pub confidence: f64,
}

pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Option<Detection>;
}

/// Trigram detection backed by `whatlang`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<Detection> {
        let info = whatlang::detect(text)?;
        Some(Detection {
            code: info.lang().code().to_string(),
            confidence: info.confidence(),
        })
    }
}

// ── Normalizer ──────────────────────────────────────────────────────────────

/// Computes every derived field of an output.
pub struct FieldNormalizer {
    detector: Box<dyn LanguageDetector>,
}

impl Default for FieldNormalizer {
    fn default() -> Self {
        Self::new(Box::new(WhatlangDetector))
    }
}

impl FieldNormalizer {
    pub fn new(detector: Box<dyn LanguageDetector>) -> Self {
        Self { detector }
    }

    pub fn normalize(&self, output: &Output) -> DerivedFields {
        let attention = output.altmetric_raw.as_ref().and_then(Value::as_object);
        let readership = output.mendeley_raw.as_ref().and_then(Value::as_object);

        DerivedFields {
            post_counts: source_counts(attention, "posts_count"),
            poster_counts: source_counts(attention, "unique_users_count"),
            posts: post_list(attention),
            event_dates: event_dates(attention),
            altmetric_score: attention
                .and_then(|a| a.get("score"))
                .and_then(as_f64)
                .unwrap_or(0.0),
            altmetric_id: attention
                .and_then(|a| a.get("altmetric_id"))
                .and_then(id_string),
            country_counts: country_counts(attention, readership),
            discipline_counts: discipline_counts(readership),
            job_title_counts: job_title_counts(readership),
            language_examples: self.language_examples(attention),
            genre: genre_for(output),
            mendeley_readers: readership
                .and_then(|r| r.get("reader_count"))
                .and_then(as_count)
                .unwrap_or(0),
            mendeley_url: readership
                .and_then(|r| r.get("mendeley_url"))
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    /// One example post url per non-default language seen in post texts.
    fn language_examples(&self, attention: Option<&Map<String, Value>>) -> BTreeMap<String, String> {
        let mut examples = BTreeMap::new();
        for (_, post) in raw_posts(attention) {
            let Some(url) = post.get("url").and_then(Value::as_str) else {
                continue;
            };
            for key in ["title", "summary"] {
                let Some(text) = post.get(key).and_then(Value::as_str) else {
                    continue;
                };
                if text.split(' ').count() <= MIN_WORDS_FOR_DETECTION {
                    continue;
                }
                let Some(detection) = self.detector.detect(text) else {
                    continue;
                };
                if detection.confidence > MIN_LANGUAGE_CONFIDENCE
                    && detection.code != DEFAULT_LANGUAGE
                {
                    examples.insert(language_name(&detection.code).to_string(), url.to_string());
                }
            }
        }
        examples
    }
}

// ── Counts ──────────────────────────────────────────────────────────────────

fn source_counts(attention: Option<&Map<String, Value>>, field: &str) -> BTreeMap<String, i64> {
    let Some(counts) = attention
        .and_then(|a| a.get("counts"))
        .and_then(Value::as_object)
    else {
        return BTreeMap::new();
    };

    counts
        .iter()
        .filter(|(source, _)| !NON_SOURCE_COUNTS.contains(&source.as_str()))
        .filter(|(source, _)| is_known_source(source))
        .filter_map(|(source, entry)| {
            let count = entry.get(field).and_then(as_count)?;
            Some((source.clone(), count))
        })
        .collect()
}

// ── Posts ───────────────────────────────────────────────────────────────────

/// Raw posts of known sources as `(source, post)` pairs.
fn raw_posts(
    attention: Option<&Map<String, Value>>,
) -> impl Iterator<Item = (&str, &Map<String, Value>)> {
    attention
        .and_then(|a| a.get("posts"))
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|posts| posts.iter())
        .filter(|(source, _)| is_known_source(source))
        .flat_map(|(source, list)| {
            list.as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_object)
                .map(move |post| (source.as_str(), post))
        })
}

/// Posts grouped by source ascending, newest first within each source.
fn post_list(attention: Option<&Map<String, Value>>) -> Vec<Post> {
    let mut posts: Vec<Post> = raw_posts(attention)
        .map(|(source, raw)| build_post(source, raw))
        .collect();
    posts.sort_by(|a, b| b.posted_on.cmp(&a.posted_on));
    posts.sort_by(|a, b| a.source.cmp(&b.source));
    posts
}

fn build_post(source: &str, raw: &Map<String, Value>) -> Post {
    let mut post = Post {
        source: source.to_string(),
        posted_on: string_field(raw, "posted_on"),
        ..Default::default()
    };
    let author = raw.get("author").and_then(Value::as_object);

    if source == "twitter" {
        if let Some(author) = author {
            if let Some(handle) = string_field(author, "id_on_source") {
                post.twitter_handle = Some(handle.clone());
                post.attribution = Some(handle);
            }
            post.followers = author.get("followers").and_then(as_count);
        }
    }
    if let Some(name) = author.and_then(|a| string_field(a, "name")) {
        post.attribution = Some(name);
    }

    post.url = string_field(raw, "page_url").or_else(|| string_field(raw, "url"));

    let title = string_field(raw, "title");
    let summary = string_field(raw, "summary");
    match (TITLED_SOURCES.contains(&source), title, summary) {
        (true, Some(title), summary) => {
            post.title = title;
            if source == "wikipedia" {
                post.summary = summary;
            }
        }
        (_, _, Some(summary)) => post.title = title_from_summary(&summary),
        _ => post.title = String::new(),
    }
    post
}

/// Short title from free text: lines starting with a URL are dropped and the
/// rest is cut to fifteen words.
pub fn title_from_summary(summary: &str) -> String {
    let text: String = summary
        .split_inclusive('\n')
        .filter(|line| !(line.starts_with("http://") || line.starts_with("https://")))
        .collect();
    if text.is_empty() {
        return UNTITLED_POST.to_string();
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > MAX_TITLE_WORDS {
        format!("{} \u{2026}", words[..MAX_TITLE_WORDS].join(" "))
    } else {
        text
    }
}

fn event_dates(attention: Option<&Map<String, Value>>) -> BTreeMap<String, Vec<String>> {
    let mut dates: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (source, post) in raw_posts(attention) {
        if let Some(posted_on) = string_field(post, "posted_on") {
            dates.entry(source.to_string()).or_default().push(posted_on);
        }
    }
    for list in dates.values_mut() {
        list.sort();
    }
    dates
}

// ── Readership ──────────────────────────────────────────────────────────────

/// Readers and tweeters per country name, summed across both providers.
fn country_counts(
    attention: Option<&Map<String, Value>>,
    readership: Option<&Map<String, Value>>,
) -> BTreeMap<String, i64> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();

    if let Some(by_country) = object_field(readership, "reader_count_by_country") {
        for (name, count) in by_country {
            if let Some(count) = as_count(count) {
                *counts
                    .entry(canonical_readership_country(name).to_string())
                    .or_default() += count;
            }
        }
    }

    let twitter_geo = attention
        .and_then(|a| a.get("demographics"))
        .and_then(|d| d.get("geo"))
        .and_then(|g| g.get("twitter"))
        .and_then(Value::as_object);
    if let Some(by_iso) = twitter_geo {
        for (iso, count) in by_iso {
            if let Some(count) = as_count(count) {
                *counts.entry(name_from_iso(iso).to_string()).or_default() += count;
            }
        }
    }

    counts
}

fn job_title_counts(readership: Option<&Map<String, Value>>) -> BTreeMap<String, i64> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    if let Some(by_status) = object_field(readership, "reader_count_by_academic_status") {
        for (raw_title, count) in by_status {
            if let Some(count) = as_count(count) {
                *counts
                    .entry(standardize_job_title(raw_title).to_string())
                    .or_default() += count;
            }
        }
    }
    counts
}

fn discipline_counts(readership: Option<&Map<String, Value>>) -> BTreeMap<String, i64> {
    let Some(by_discipline) = object_field(readership, "reader_count_by_subdiscipline") else {
        return BTreeMap::new();
    };
    by_discipline
        .iter()
        .filter_map(|(discipline, subdisciplines)| {
            let total = subdisciplines
                .as_object()?
                .values()
                .filter_map(as_count)
                .sum();
            Some((discipline.clone(), total))
        })
        .collect()
}

// ── Value Helpers ───────────────────────────────────────────────────────────

fn object_field<'a>(
    doc: Option<&'a Map<String, Value>>,
    key: &str,
) -> Option<&'a Map<String, Value>> {
    doc.and_then(|d| d.get(key)).and_then(Value::as_object)
}

fn string_field(doc: &Map<String, Value>, key: &str) -> Option<String> {
    doc.get(key).and_then(Value::as_str).map(str::to_string)
}

/// An integer from a number or a numeric string.
fn as_count(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Detector that reports a fixed language for any text containing a marker.
    struct MarkerDetector;

    impl LanguageDetector for MarkerDetector {
        fn detect(&self, text: &str) -> Option<Detection> {
            let (code, confidence) = if text.contains("hola") {
                ("spa", 0.99)
            } else if text.contains("bonjour") {
                ("fra", 0.5)
            } else {
                ("eng", 0.99)
            };
            Some(Detection {
                code: code.to_string(),
                confidence,
            })
        }
    }

    fn normalizer() -> FieldNormalizer {
        FieldNormalizer::new(Box::new(MarkerDetector))
    }

    fn with_attention(raw: Value) -> Output {
        let mut output = Output::new(Some("Paper".to_string()));
        output.doi = Some("10.1/paper".to_string());
        output.altmetric_raw = Some(raw);
        output
    }

    #[test]
    fn counts_skip_totals_and_unknown_sources() {
        let output = with_attention(json!({
            "counts": {
                "twitter": {"posts_count": 5, "unique_users_count": 3},
                "total": {"posts_count": 9, "unique_users_count": 7},
                "readers": {"mendeley": "44"},
                "myspace": {"posts_count": 1, "unique_users_count": 1}
            }
        }));
        let derived = normalizer().normalize(&output);
        assert_eq!(derived.post_counts, BTreeMap::from([("twitter".to_string(), 5)]));
        assert_eq!(derived.poster_counts, BTreeMap::from([("twitter".to_string(), 3)]));
    }

    #[test]
    fn numeric_strings_are_counts() {
        let output = with_attention(json!({
            "counts": {"news": {"posts_count": "12", "unique_users_count": "4"}}
        }));
        let derived = normalizer().normalize(&output);
        assert_eq!(derived.post_counts["news"], 12);
        assert_eq!(derived.poster_counts["news"], 4);
    }

    #[test]
    fn sentinel_payload_gives_empty_defaults() {
        let output = with_attention(json!({"error": "404"}));
        let derived = normalizer().normalize(&output);
        assert_eq!(derived.altmetric_score, 0.0);
        assert_eq!(derived.altmetric_id, None);
        assert!(derived.post_counts.is_empty());
        assert!(derived.posts.is_empty());
    }

    #[test]
    fn score_and_numeric_id() {
        let output = with_attention(json!({"score": 17.25, "altmetric_id": 241939}));
        let derived = normalizer().normalize(&output);
        assert_eq!(derived.altmetric_score, 17.25);
        assert_eq!(derived.altmetric_id.as_deref(), Some("241939"));
    }

    #[test]
    fn twitter_post_details() {
        let output = with_attention(json!({
            "posts": {"twitter": [{
                "posted_on": "2016-03-01T10:00:00+00:00",
                "url": "https://twitter.com/a/status/1",
                "summary": "Nice paper",
                "author": {"id_on_source": "jdoe", "followers": 120, "name": "Jane Doe"}
            }]}
        }));
        let derived = normalizer().normalize(&output);
        let post = &derived.posts[0];
        assert_eq!(post.twitter_handle.as_deref(), Some("jdoe"));
        assert_eq!(post.followers, Some(120));
        assert_eq!(post.attribution.as_deref(), Some("Jane Doe"));
        assert_eq!(post.title, "Nice paper");
        assert_eq!(post.url.as_deref(), Some("https://twitter.com/a/status/1"));
    }

    #[test]
    fn wikipedia_keeps_title_summary_and_page_url() {
        let output = with_attention(json!({
            "posts": {"wikipedia": [{
                "title": "Radium",
                "summary": "Radium is a chemical element.",
                "url": "https://en.wikipedia.org/w/index.php?oldid=1",
                "page_url": "https://en.wikipedia.org/wiki/Radium",
                "posted_on": "2016-01-01T00:00:00+00:00"
            }]}
        }));
        let derived = normalizer().normalize(&output);
        let post = &derived.posts[0];
        assert_eq!(post.title, "Radium");
        assert_eq!(post.summary.as_deref(), Some("Radium is a chemical element."));
        assert_eq!(post.url.as_deref(), Some("https://en.wikipedia.org/wiki/Radium"));
    }

    #[test]
    fn summary_titles_drop_urls_and_truncate() {
        assert_eq!(title_from_summary("https://t.co/abc"), "No title.");
        assert_eq!(
            title_from_summary("https://t.co/abc\nWorth reading"),
            "Worth reading"
        );
        let long = "one two three four five six seven eight nine ten eleven twelve thirteen fourteen fifteen sixteen";
        assert_eq!(
            title_from_summary(long),
            "one two three four five six seven eight nine ten eleven twelve thirteen fourteen fifteen \u{2026}"
        );
    }

    #[test]
    fn posts_group_by_source_then_newest_first() {
        let output = with_attention(json!({
            "posts": {
                "twitter": [
                    {"posted_on": "2016-01-01T00:00:00+00:00", "summary": "t1"},
                    {"posted_on": "2016-03-01T00:00:00+00:00", "summary": "t3"}
                ],
                "blogs": [
                    {"posted_on": "2016-02-01T00:00:00+00:00", "title": "b2"},
                    {"posted_on": "2016-04-01T00:00:00+00:00", "title": "b4"}
                ]
            }
        }));
        let derived = normalizer().normalize(&output);
        let order: Vec<&str> = derived.posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(order, vec!["b4", "b2", "t3", "t1"]);
    }

    #[test]
    fn event_dates_ascend_per_source() {
        let output = with_attention(json!({
            "posts": {"twitter": [
                {"posted_on": "2016-03-01T00:00:00+00:00"},
                {"posted_on": "2016-01-01T00:00:00+00:00"}
            ]}
        }));
        let derived = normalizer().normalize(&output);
        assert_eq!(
            derived.event_dates["twitter"],
            vec!["2016-01-01T00:00:00+00:00", "2016-03-01T00:00:00+00:00"]
        );
    }

    #[test]
    fn countries_merge_both_providers() {
        let mut output = with_attention(json!({
            "demographics": {"geo": {"twitter": {"US": 2, "DE": 1}}}
        }));
        output.mendeley_raw = Some(json!({
            "reader_count": 10,
            "reader_count_by_country": {"United States": 3, "Germany": 4},
            "reader_count_by_academic_status": {"Ph.D. Student": 2, "Doctoral Student": 1, "Bard": 1},
            "reader_count_by_subdiscipline": {"Biology": {"Genetics": 4, "Ecology": 2}},
            "mendeley_url": "https://www.mendeley.com/catalogue/x"
        }));
        let derived = normalizer().normalize(&output);
        assert_eq!(derived.country_counts["United States"], 5);
        assert_eq!(derived.country_counts["Germany"], 5);
        assert_eq!(derived.job_title_counts["PhD Student"], 3);
        assert_eq!(derived.job_title_counts["Bard"], 1);
        assert_eq!(derived.discipline_counts["Biology"], 6);
        assert_eq!(derived.mendeley_readers, 10);
        assert_eq!(
            derived.mendeley_url.as_deref(),
            Some("https://www.mendeley.com/catalogue/x")
        );
    }

    #[test]
    fn language_examples_need_length_confidence_and_non_default_language() {
        let output = with_attention(json!({
            "posts": {"twitter": [
                {"url": "https://t/1", "summary": "hola amigos este es un articulo muy interesante"},
                {"url": "https://t/2", "summary": "hola corto"},
                {"url": "https://t/3", "summary": "bonjour mes amis voici un article assez intéressant"},
                {"url": "https://t/4", "summary": "this is an english post about a nice paper"}
            ]}
        }));
        let derived = normalizer().normalize(&output);
        assert_eq!(
            derived.language_examples,
            BTreeMap::from([("Spanish".to_string(), "https://t/1".to_string())])
        );
    }

    #[test]
    fn normalizing_twice_is_identical() {
        let output = with_attention(json!({
            "score": 3,
            "counts": {"twitter": {"posts_count": 2, "unique_users_count": 2}},
            "posts": {"twitter": [
                {"posted_on": "2016-01-01T00:00:00+00:00", "summary": "a"},
                {"posted_on": "2016-01-01T00:00:00+00:00", "summary": "b"}
            ]}
        }));
        let normalizer = normalizer();
        let first = normalizer.normalize(&output);
        let second = normalizer.normalize(&output);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn genre_uses_output_fields() {
        let mut output = with_attention(json!({}));
        output.doi = Some("10.1101/2020.01.01".to_string());
        output.work_type = Some("journal-article".to_string());
        assert_eq!(normalizer().normalize(&output).genre, "preprint");
    }
}
