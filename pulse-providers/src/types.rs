use async_trait::async_trait;
use pulse_catalog::types::{OpenAccessRecord, Output};
use serde_json::{Value, json};

use crate::error::FetchError;

/// Which provider a fetcher talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Altmetric,
    Mendeley,
    OpenAccess,
    Crossref,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::Altmetric => "altmetric",
            Provider::Mendeley => "mendeley",
            Provider::OpenAccess => "oadoi",
            Provider::Crossref => "crossref",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Data a fetcher hands back for its own slot on the output.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Altmetric(Value),
    Mendeley(Value),
    OpenAccess(OpenAccessRecord),
    Doi(String),
}

/// `{"error": "<code>"}`, the stored form of "no data for this identifier".
pub fn sentinel(code: &str) -> Value {
    json!({ "error": code })
}

/// Whether a stored raw payload is a sentinel rather than provider data.
pub fn is_sentinel(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.len() == 1 && obj.get("error").is_some_and(Value::is_string))
}

/// The result of one enrichment phase.
#[derive(Debug)]
pub enum PhaseOutcome {
    /// Preconditions not met; nothing was called.
    Skipped,
    /// Provider returned data.
    Success(Payload),
    /// Provider answered that it has no data for this identifier.
    Sentinel(Payload),
    /// The call failed; the next scheduled pass may succeed.
    Retryable(FetchError),
    /// The provider asked us to stop calling it.
    Fatal(FetchError),
}

impl PhaseOutcome {
    /// Payload to write, if any.
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            PhaseOutcome::Success(p) | PhaseOutcome::Sentinel(p) => Some(p),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            PhaseOutcome::Retryable(e) | PhaseOutcome::Fatal(e) => Some(e),
            _ => None,
        }
    }
}

/// One external provider call for one output.
///
/// Implementations never panic or return early with `?` past this boundary:
/// every failure becomes a [`PhaseOutcome`].
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    fn provider(&self) -> Provider;

    async fn fetch(&self, output: &Output) -> PhaseOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_recognized_but_error_bearing_payloads_are_not() {
        assert!(is_sentinel(&sentinel("404")));
        assert!(!is_sentinel(&json!({"error": "404", "score": 1})));
        assert!(!is_sentinel(&json!({"error": 404})));
        assert!(!is_sentinel(&json!({"score": 3.5})));
    }
}
