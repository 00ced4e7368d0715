//! Open-access resolver client.

use std::time::Duration;

use async_trait::async_trait;
use pulse_catalog::types::{OpenAccessRecord, Output};
use serde::Deserialize;
use serde_json::json;

use crate::client::DEFAULT_TIMEOUT;
use crate::config::ProviderConfig;
use crate::error::FetchError;
use crate::types::{Payload, PhaseOutcome, Provider, SourceFetcher};

const PROVIDER: &str = "oadoi";

#[derive(Debug, Deserialize)]
struct ResolverResponse {
    #[serde(default)]
    results: Vec<ResolverResult>,
}

#[derive(Debug, Deserialize)]
struct ResolverResult {
    #[serde(default)]
    free_fulltext_url: Option<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    evidence: Option<String>,
}

/// Asks the resolver for a free fulltext location, by doi or else by title.
#[derive(Debug, Clone)]
pub struct OpenAccessFetcher {
    http: reqwest::Client,
    base_url: String,
    email: Option<String>,
    timeout: Duration,
}

impl OpenAccessFetcher {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            http,
            base_url: config.oadoi_url.trim_end_matches('/').to_string(),
            email: config.contact_email.clone(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn call(&self, output: &Output) -> Result<(u16, String), FetchError> {
        let body = json!({ "biblios": [output.biblio_for_open_access()] });
        let mut request = self
            .http
            .post(format!("{}/v1/publications", self.base_url))
            .json(&body)
            .timeout(self.timeout);
        if let Some(ref email) = self.email {
            request = request.query(&[("email", email)]);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;
        Ok((status, text))
    }
}

#[async_trait]
impl SourceFetcher for OpenAccessFetcher {
    fn provider(&self) -> Provider {
        Provider::OpenAccess
    }

    async fn fetch(&self, output: &Output) -> PhaseOutcome {
        let outcome = match self.call(output).await {
            Ok((status, body)) => classify_open_access_response(status, &body),
            Err(e) => PhaseOutcome::Retryable(e),
        };
        match &outcome {
            PhaseOutcome::Skipped => {
                log::info!("Open-access lookup for {} got a bad status code, skipping", output.id);
            }
            PhaseOutcome::Success(Payload::OpenAccess(record)) => {
                if let Some(ref url) = record.fulltext_url {
                    log::info!(
                        "Open fulltext for {}: {} ({})",
                        output.id,
                        url,
                        record.license.as_deref().unwrap_or("no license")
                    );
                }
            }
            other => {
                if let Some(err) = other.error() {
                    log::warn!("Open-access lookup for {}: {err}", output.id);
                }
            }
        }
        outcome
    }
}

/// Map a resolver response to a phase outcome.
///
/// Non-200 answers are skipped rather than recorded as errors.
pub fn classify_open_access_response(status: u16, body: &str) -> PhaseOutcome {
    if status != 200 {
        return PhaseOutcome::Skipped;
    }
    let response: ResolverResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => return PhaseOutcome::Retryable(e.into()),
    };
    match response.results.into_iter().next() {
        Some(result) => PhaseOutcome::Success(Payload::OpenAccess(OpenAccessRecord {
            fulltext_url: result.free_fulltext_url,
            license: result.license,
            evidence: result.evidence,
        })),
        None => PhaseOutcome::Retryable(FetchError::EmptyResponse { provider: PROVIDER }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_result_is_used() {
        let body = r#"{"results": [
            {"free_fulltext_url": "https://repo.example/paper.pdf", "license": "cc-by", "evidence": "oa repository"},
            {"free_fulltext_url": "https://other.example/x.pdf"}
        ]}"#;
        let PhaseOutcome::Success(Payload::OpenAccess(record)) =
            classify_open_access_response(200, body)
        else {
            panic!("expected open-access record");
        };
        assert_eq!(record.fulltext_url.as_deref(), Some("https://repo.example/paper.pdf"));
        assert_eq!(record.license.as_deref(), Some("cc-by"));
        assert_eq!(record.evidence.as_deref(), Some("oa repository"));
    }

    #[test]
    fn closed_result_clears_fields() {
        let body = r#"{"results": [{"free_fulltext_url": null, "license": null, "evidence": "closed"}]}"#;
        let PhaseOutcome::Success(Payload::OpenAccess(record)) =
            classify_open_access_response(200, body)
        else {
            panic!("expected open-access record");
        };
        assert_eq!(record.fulltext_url, None);
        assert_eq!(record.evidence.as_deref(), Some("closed"));
    }

    #[test]
    fn empty_results_are_structural_errors() {
        assert!(matches!(
            classify_open_access_response(200, r#"{"results": []}"#),
            PhaseOutcome::Retryable(FetchError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn bad_status_is_skipped() {
        assert!(matches!(
            classify_open_access_response(500, "oops"),
            PhaseOutcome::Skipped
        ));
    }
}
