//! Reference-manager readership provider client.
//!
//! Authenticates with OAuth2 client credentials; the access token is cached
//! until shortly before it expires and shared by every lookup.

use std::time::Duration;

use async_trait::async_trait;
use pulse_catalog::title::clean_doi;
use pulse_catalog::types::Output;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::client::DEFAULT_TIMEOUT;
use crate::config::ProviderConfig;
use crate::error::FetchError;
use crate::types::{Payload, PhaseOutcome, Provider, SourceFetcher, sentinel};

const PROVIDER: &str = "mendeley";
const DOCUMENT_MEDIA_TYPE: &str = "application/vnd.mendeley-document.1+json";

/// Tokens are refreshed this long before the provider says they expire.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

/// Fields kept from a catalog document.
const KEPT_FIELDS: &[&str] = &[
    "reader_count",
    "reader_count_by_academic_status",
    "reader_count_by_subdiscipline",
    "reader_count_by_country",
    "abstract",
];

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Fetches readership statistics for an output's DOI.
pub struct MendeleyFetcher {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
    timeout: Duration,
    token: Mutex<Option<CachedToken>>,
}

impl MendeleyFetcher {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Self {
        let credentials = match (&config.mendeley_client_id, &config.mendeley_client_secret) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            _ => None,
        };
        Self {
            http,
            base_url: config.mendeley_url.trim_end_matches('/').to_string(),
            credentials,
            timeout: DEFAULT_TIMEOUT,
            token: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn access_token(&self) -> Result<String, FetchError> {
        let mut cached = self.token.lock().await;
        if let Some(ref token) = *cached {
            if Instant::now() < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        let Some((ref id, ref secret)) = self.credentials else {
            return Err(FetchError::NotConfigured {
                provider: PROVIDER,
                message: "client id and secret are required".to_string(),
            });
        };

        let resp = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .basic_auth(id, Some(secret))
            .form(&[("grant_type", "client_credentials"), ("scope", "all")])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Auth {
                provider: PROVIDER,
                message: format!("token request returned HTTP {}", status.as_u16()),
            });
        }
        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_MARGIN);
        log::debug!("Obtained readership token valid for {}s", lifetime.as_secs());
        *cached = Some(CachedToken {
            token: body.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(body.access_token)
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }

    async fn call(&self, doi: &str) -> Result<(u16, String), FetchError> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .get(format!("{}/catalog", self.base_url))
            .query(&[("doi", doi), ("view", "stats")])
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, DOCUMENT_MEDIA_TYPE)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;
        Ok((status, body))
    }
}

#[async_trait]
impl SourceFetcher for MendeleyFetcher {
    fn provider(&self) -> Provider {
        Provider::Mendeley
    }

    async fn fetch(&self, output: &Output) -> PhaseOutcome {
        let Some(doi) = output.doi.as_deref().and_then(clean_doi) else {
            return PhaseOutcome::Skipped;
        };
        if !self.is_configured() {
            log::debug!("Readership lookup skipped for {}: no credentials", output.id);
            return PhaseOutcome::Skipped;
        }

        let outcome = match self.call(&doi).await {
            Ok((status, body)) => classify_catalog_response(status, &body),
            Err(e) => PhaseOutcome::Retryable(e),
        };

        if matches!(outcome, PhaseOutcome::Retryable(FetchError::Auth { .. })) {
            self.forget_token().await;
        }
        if let Some(err) = outcome.error() {
            log::warn!("Readership for {doi} (output {}): {err}", output.id);
        }
        outcome
    }
}

/// Map a catalog lookup response to a phase outcome.
pub fn classify_catalog_response(status: u16, body: &str) -> PhaseOutcome {
    match status {
        200 => match serde_json::from_str::<Vec<Value>>(body) {
            Ok(docs) => match docs.first() {
                Some(doc) => PhaseOutcome::Success(Payload::Mendeley(readership_payload(doc))),
                None => PhaseOutcome::Sentinel(Payload::Mendeley(sentinel("404"))),
            },
            Err(e) => PhaseOutcome::Retryable(e.into()),
        },
        404 => PhaseOutcome::Sentinel(Payload::Mendeley(sentinel("404"))),
        401 => PhaseOutcome::Retryable(FetchError::Auth {
            provider: PROVIDER,
            message: "access token rejected".to_string(),
        }),
        403 => PhaseOutcome::Retryable(FetchError::Forbidden { provider: PROVIDER }),
        status => PhaseOutcome::Retryable(FetchError::UnexpectedStatus {
            provider: PROVIDER,
            status,
        }),
    }
}

/// Reduce a catalog document to the readership fields we store.
pub fn readership_payload(doc: &Value) -> Value {
    let mut payload = Map::new();
    for field in KEPT_FIELDS {
        if let Some(value) = doc.get(*field) {
            payload.insert(field.to_string(), value.clone());
        }
    }
    if let Some(link) = doc.get("link") {
        payload.insert("mendeley_url".to_string(), link.clone());
    }
    Value::Object(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_document_is_reduced() {
        let body = json!([
            {
                "title": "Ignored",
                "link": "https://www.mendeley.com/catalogue/abc",
                "reader_count": 12,
                "reader_count_by_academic_status": {"Professor": 2},
                "reader_count_by_country": {"Germany": 3},
                "reader_count_by_subdiscipline": {"Biology": {"Genetics": 4}},
                "abstract": "We study things."
            },
            {"reader_count": 999}
        ])
        .to_string();

        let PhaseOutcome::Success(Payload::Mendeley(payload)) = classify_catalog_response(200, &body)
        else {
            panic!("expected readership payload");
        };
        assert_eq!(payload["reader_count"], json!(12));
        assert_eq!(payload["mendeley_url"], json!("https://www.mendeley.com/catalogue/abc"));
        assert!(payload.get("title").is_none());
    }

    #[test]
    fn empty_result_is_sentinel() {
        let outcome = classify_catalog_response(200, "[]");
        assert!(matches!(
            outcome,
            PhaseOutcome::Sentinel(Payload::Mendeley(ref v)) if *v == json!({"error": "404"})
        ));
    }

    #[test]
    fn rejected_token_is_auth_error() {
        assert!(matches!(
            classify_catalog_response(401, ""),
            PhaseOutcome::Retryable(FetchError::Auth { .. })
        ));
    }

    #[tokio::test]
    async fn unconfigured_fetcher_skips() {
        let fetcher = MendeleyFetcher::new(reqwest::Client::new(), &ProviderConfig::default());
        let mut output = Output::new(Some("Readers".to_string()));
        output.doi = Some("10.1000/readers".to_string());
        assert!(matches!(fetcher.fetch(&output).await, PhaseOutcome::Skipped));
    }
}
