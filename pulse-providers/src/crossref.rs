//! DOI backfill through the bibliographic registry's XML query servlet.
//!
//! Only outputs without a doi are looked up, by exact title and first author
//! family name. Every failure is a skip; nothing is ever recorded as an error.

use std::time::Duration;

use async_trait::async_trait;
use pulse_catalog::types::Output;

use crate::config::ProviderConfig;
use crate::types::{Payload, PhaseOutcome, Provider, SourceFetcher};

pub const BACKFILL_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_PID: &str = "pulse@localhost";

/// Looks up a missing DOI from title and first author.
#[derive(Debug, Clone)]
pub struct CrossrefFetcher {
    http: reqwest::Client,
    base_url: String,
    pid: String,
    timeout: Duration,
}

impl CrossrefFetcher {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            http,
            base_url: config.crossref_url.trim_end_matches('/').to_string(),
            pid: config
                .contact_email
                .clone()
                .unwrap_or_else(|| DEFAULT_PID.to_string()),
            timeout: BACKFILL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn call(&self, title: &str, author: &str) -> Result<(u16, String), reqwest::Error> {
        let qdata = query_document(title, author);
        let resp = self
            .http
            .get(format!("{}/servlet/query", self.base_url))
            .query(&[("pid", self.pid.as_str()), ("qdata", qdata.as_str())])
            .timeout(self.timeout)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl SourceFetcher for CrossrefFetcher {
    fn provider(&self) -> Provider {
        Provider::Crossref
    }

    async fn fetch(&self, output: &Output) -> PhaseOutcome {
        if output.doi.is_some() {
            return PhaseOutcome::Skipped;
        }
        let (Some(title), Some(author)) = (
            output.title().filter(|t| !t.trim().is_empty()),
            output.first_author_family_name(),
        ) else {
            return PhaseOutcome::Skipped;
        };

        match self.call(title, author).await {
            Ok((status, body)) => match parse_backfill_response(status, &body) {
                Some(doi) => {
                    log::info!("Found doi {doi} for output {}", output.id);
                    PhaseOutcome::Success(Payload::Doi(doi))
                }
                None => PhaseOutcome::Skipped,
            },
            Err(e) if e.is_timeout() => {
                log::debug!("DOI lookup for {} timed out", output.id);
                PhaseOutcome::Skipped
            }
            Err(e) => {
                log::debug!("DOI lookup for {} failed: {e}", output.id);
                PhaseOutcome::Skipped
            }
        }
    }
}

/// Pull a DOI out of the pipe-delimited query answer.
///
/// The last field is accepted only when it starts with `10.`.
pub fn parse_backfill_response(status: u16, body: &str) -> Option<String> {
    if status != 200 || !body.contains('|') {
        return None;
    }
    let (_, last) = body.rsplit_once('|')?;
    if !last.starts_with("10.") {
        return None;
    }
    let doi = last.trim();
    if doi.is_empty() { None } else { Some(doi.to_string()) }
}

fn query_document(title: &str, author: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0"?>"#,
            r#"<query_batch version="2.0" xmlns="http://www.crossref.org/qschema/2.0""#,
            r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#,
            r#" xsi:schemaLocation="http://www.crossref.org/qschema/2.0 http://www.crossref.org/qschema/crossref_query_input2.0.xsd">"#,
            "<head><doi_batch_id>pulse</doi_batch_id></head>",
            r#"<body><query enable-multiple-hits="true" secondary-query="author-title-multiple-hits">"#,
            r#"<article_title match="exact">{}</article_title>"#,
            r#"<author search-all-authors="true" match="exact">{}</author>"#,
            "</query></body></query_batch>"
        ),
        xml_escape(title),
        xml_escape(author)
    )
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_field_is_the_doi() {
        let body = "Nature|Curie|1|||Radioactive Substances|10.1038/radium\n";
        assert_eq!(
            parse_backfill_response(200, body).as_deref(),
            Some("10.1038/radium")
        );
    }

    #[test]
    fn non_doi_last_field_is_rejected() {
        assert_eq!(parse_backfill_response(200, "a|b|NOT_FOUND"), None);
        assert_eq!(parse_backfill_response(200, "a|b| 10.1/leading-space"), None);
    }

    #[test]
    fn no_pipe_or_bad_status_is_rejected() {
        assert_eq!(parse_backfill_response(200, "10.1/x"), None);
        assert_eq!(parse_backfill_response(500, "a|10.1/x"), None);
    }

    #[test]
    fn query_escapes_markup() {
        let doc = query_document("Cats & <Dogs>", "O'Brien");
        assert!(doc.contains("Cats &amp; &lt;Dogs&gt;"));
        assert!(doc.contains("O&apos;Brien"));
    }

    #[tokio::test]
    async fn outputs_with_doi_or_without_author_are_skipped() {
        let fetcher = CrossrefFetcher::new(reqwest::Client::new(), &ProviderConfig::default());

        let mut with_doi = Output::new(Some("Has doi".to_string()));
        with_doi.doi = Some("10.1/x".to_string());
        with_doi.authors = Some("Curie".to_string());
        assert!(matches!(fetcher.fetch(&with_doi).await, PhaseOutcome::Skipped));

        let no_author = Output::new(Some("No author".to_string()));
        assert!(matches!(fetcher.fetch(&no_author).await, PhaseOutcome::Skipped));
    }
}
