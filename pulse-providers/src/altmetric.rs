//! Attention-metrics provider client.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use pulse_catalog::title::clean_doi;
use pulse_catalog::types::Output;
use reqwest::header::HeaderMap;

use crate::client::{HardStopGate, Throttle};
use crate::config::ProviderConfig;
use crate::error::FetchError;
use crate::types::{Payload, PhaseOutcome, Provider, SourceFetcher, sentinel};

const PROVIDER: &str = "altmetric";

pub const ATTENTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of the 403 sent for DOIs the provider refuses without a commercial
/// license (typically DOIs containing `#`).
pub const COMMERCIAL_LICENSE_MESSAGE: &str =
    "You must have a commercial license key to use this call.";

const HOURLY_ALLOWANCE: i64 = 3600;
const REMAINING_HEADER: &str = "x-hourlyratelimit-remaining";

/// Fetches the attention document for an output's DOI.
#[derive(Debug, Clone)]
pub struct AltmetricFetcher {
    http: reqwest::Client,
    base_url: String,
    key: Option<String>,
    timeout: Duration,
    throttle: Throttle,
    gate: HardStopGate,
}

impl AltmetricFetcher {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Self {
        let per_second = NonZeroU32::new(config.altmetric_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            http,
            base_url: config.altmetric_url.trim_end_matches('/').to_string(),
            key: config.altmetric_key.clone(),
            timeout: ATTENTION_TIMEOUT,
            throttle: Throttle::per_second(per_second),
            gate: HardStopGate::new(Duration::from_secs(config.hard_stop_cooldown_secs)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Apply the side effects of a classified response. A hard rate limit
    /// closes the gate for every clone of this fetcher.
    fn settle(&self, outcome: PhaseOutcome) -> PhaseOutcome {
        if matches!(outcome, PhaseOutcome::Fatal(FetchError::HardRateLimit { .. })) {
            self.gate.trip();
        }
        outcome
    }

    /// The gate a 420 response closes.
    pub fn gate(&self) -> &HardStopGate {
        &self.gate
    }

    async fn call(&self, doi: &str) -> Result<(u16, String), FetchError> {
        let mut request = self
            .http
            .get(format!("{}/v1/fetch/doi/{}", self.base_url, doi))
            .timeout(self.timeout);
        if let Some(ref key) = self.key {
            request = request.query(&[("key", key)]);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;
        log_remaining_allowance(resp.headers());

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(PROVIDER, e))?;
        Ok((status, body))
    }
}

#[async_trait]
impl SourceFetcher for AltmetricFetcher {
    fn provider(&self) -> Provider {
        Provider::Altmetric
    }

    async fn fetch(&self, output: &Output) -> PhaseOutcome {
        let Some(doi) = output.doi.as_deref().and_then(clean_doi) else {
            return PhaseOutcome::Skipped;
        };
        if !self.gate.is_open() {
            return PhaseOutcome::Fatal(FetchError::Halted { provider: PROVIDER });
        }

        self.throttle.ready().await;
        let outcome = self.settle(match self.call(&doi).await {
            Ok((status, body)) => classify_attention_response(status, &body),
            Err(e) => PhaseOutcome::Retryable(e),
        });
        if let Some(err) = outcome.error() {
            log::warn!("Attention metrics for {doi} (output {}): {err}", output.id);
        }
        outcome
    }
}

/// Map an attention-provider response to a phase outcome.
pub fn classify_attention_response(status: u16, body: &str) -> PhaseOutcome {
    match status {
        200 => match serde_json::from_str(body) {
            Ok(doc) => PhaseOutcome::Success(Payload::Altmetric(doc)),
            Err(e) => PhaseOutcome::Retryable(e.into()),
        },
        404 => PhaseOutcome::Sentinel(Payload::Altmetric(sentinel("404"))),
        403 if body == COMMERCIAL_LICENSE_MESSAGE => {
            PhaseOutcome::Sentinel(Payload::Altmetric(sentinel("403")))
        }
        403 => PhaseOutcome::Retryable(FetchError::Forbidden { provider: PROVIDER }),
        420 => PhaseOutcome::Fatal(FetchError::HardRateLimit { provider: PROVIDER }),
        400 => PhaseOutcome::Sentinel(Payload::Altmetric(sentinel("400"))),
        status => PhaseOutcome::Retryable(FetchError::UnexpectedStatus {
            provider: PROVIDER,
            status,
        }),
    }
}

fn log_remaining_allowance(headers: &HeaderMap) {
    let remaining = headers
        .get(REMAINING_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok());
    if let Some(remaining) = remaining.filter(|r| *r < HOURLY_ALLOWANCE) {
        log::info!("Attention provider hourly allowance remaining: {remaining}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(outcome: &PhaseOutcome) -> serde_json::Value {
        match outcome.payload() {
            Some(Payload::Altmetric(v)) => v.clone(),
            other => panic!("expected attention payload, got {other:?}"),
        }
    }

    #[test]
    fn ok_response_is_full_payload() {
        let outcome = classify_attention_response(200, r#"{"score": 4.5, "altmetric_id": 99}"#);
        assert!(matches!(outcome, PhaseOutcome::Success(_)));
        assert_eq!(payload(&outcome)["score"], json!(4.5));
    }

    #[test]
    fn not_found_is_sentinel() {
        let outcome = classify_attention_response(404, "Not Found");
        assert!(matches!(outcome, PhaseOutcome::Sentinel(_)));
        assert_eq!(payload(&outcome), json!({"error": "404"}));
    }

    #[test]
    fn licensing_403_is_sentinel_but_other_403_is_error() {
        let outcome = classify_attention_response(403, COMMERCIAL_LICENSE_MESSAGE);
        assert_eq!(payload(&outcome), json!({"error": "403"}));

        let outcome = classify_attention_response(403, "Forbidden");
        assert!(matches!(
            outcome,
            PhaseOutcome::Retryable(FetchError::Forbidden { .. })
        ));
    }

    #[test]
    fn bad_doi_400_is_sentinel() {
        let outcome = classify_attention_response(400, "Bad request");
        assert_eq!(payload(&outcome), json!({"error": "400"}));
    }

    #[test]
    fn hard_stop_is_fatal() {
        let outcome = classify_attention_response(420, "");
        assert!(matches!(
            outcome,
            PhaseOutcome::Fatal(FetchError::HardRateLimit { .. })
        ));
    }

    #[test]
    fn other_statuses_are_unexpected() {
        let outcome = classify_attention_response(502, "");
        assert!(matches!(
            outcome,
            PhaseOutcome::Retryable(FetchError::UnexpectedStatus { status: 502, .. })
        ));
    }

    #[test]
    fn garbled_ok_body_is_an_error() {
        let outcome = classify_attention_response(200, "<html>");
        assert!(matches!(outcome, PhaseOutcome::Retryable(FetchError::Json(_))));
    }

    #[tokio::test]
    async fn output_without_doi_is_skipped() {
        let http = reqwest::Client::new();
        let fetcher = AltmetricFetcher::new(http, &ProviderConfig::default());
        let output = Output::new(Some("No identifier".to_string()));
        assert!(matches!(fetcher.fetch(&output).await, PhaseOutcome::Skipped));
    }

    #[tokio::test]
    async fn halted_gate_short_circuits() {
        let http = reqwest::Client::new();
        let fetcher = AltmetricFetcher::new(http, &ProviderConfig::default());
        fetcher.gate().trip();
        let mut output = Output::new(Some("Halted".to_string()));
        output.doi = Some("10.1000/halt".to_string());
        assert!(matches!(
            fetcher.fetch(&output).await,
            PhaseOutcome::Fatal(FetchError::Halted { .. })
        ));
    }

    #[tokio::test]
    async fn hard_stop_response_halts_later_calls() {
        let http = reqwest::Client::new();
        let fetcher = AltmetricFetcher::new(http, &ProviderConfig::default());
        let shared = fetcher.clone();
        assert!(fetcher.gate().is_open());

        let outcome = fetcher.settle(classify_attention_response(420, ""));
        assert!(matches!(
            outcome,
            PhaseOutcome::Fatal(FetchError::HardRateLimit { .. })
        ));
        assert!(!fetcher.gate().is_open());
        assert!(!shared.gate().is_open());

        let mut output = Output::new(Some("After the stop".to_string()));
        output.doi = Some("10.1000/after".to_string());
        assert!(matches!(
            shared.fetch(&output).await,
            PhaseOutcome::Fatal(FetchError::Halted { .. })
        ));
    }

    #[tokio::test]
    async fn ordinary_failures_leave_the_gate_open() {
        let fetcher = AltmetricFetcher::new(reqwest::Client::new(), &ProviderConfig::default());
        fetcher.settle(classify_attention_response(502, ""));
        fetcher.settle(classify_attention_response(404, ""));
        assert!(fetcher.gate().is_open());
    }
}
