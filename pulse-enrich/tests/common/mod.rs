#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pulse_catalog::types::Output;
use pulse_enrich::{Detection, Enricher, FieldNormalizer, LanguageDetector};
use pulse_providers::{PhaseOutcome, Provider, SourceFetcher};

type Respond = dyn Fn(&Output) -> PhaseOutcome + Send + Sync;

/// Fetcher that answers from a closure and remembers which outputs it saw.
pub struct Scripted {
    provider: Provider,
    respond: Box<Respond>,
    calls: Mutex<Vec<String>>,
}

impl Scripted {
    pub fn new(
        provider: Provider,
        respond: impl Fn(&Output) -> PhaseOutcome + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn skipping(provider: Provider) -> Arc<Self> {
        Self::new(provider, |_| PhaseOutcome::Skipped)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceFetcher for Scripted {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn fetch(&self, output: &Output) -> PhaseOutcome {
        self.calls.lock().unwrap().push(output.id.clone());
        (self.respond)(output)
    }
}

/// Never reports a language, so derived fields do not depend on a model.
pub struct NoLanguages;

impl LanguageDetector for NoLanguages {
    fn detect(&self, _text: &str) -> Option<Detection> {
        None
    }
}

pub struct Fetchers {
    pub attention: Arc<Scripted>,
    pub readership: Arc<Scripted>,
    pub open_access: Arc<Scripted>,
    pub backfill: Arc<Scripted>,
}

impl Fetchers {
    pub fn skipping() -> Self {
        Self {
            attention: Scripted::skipping(Provider::Altmetric),
            readership: Scripted::skipping(Provider::Mendeley),
            open_access: Scripted::skipping(Provider::OpenAccess),
            backfill: Scripted::skipping(Provider::Crossref),
        }
    }

    pub fn enricher(&self) -> Enricher {
        Enricher::new(
            self.attention.clone(),
            self.readership.clone(),
            self.open_access.clone(),
            self.backfill.clone(),
        )
        .with_normalizer(FieldNormalizer::new(Box::new(NoLanguages)))
    }
}

pub fn output(title: &str, doi: Option<&str>) -> Output {
    let mut output = Output::new(Some(title.to_string()));
    output.doi = doi.map(str::to_string);
    output
}
