//! Per-output enrichment pass.
//!
//! Phases run in a fixed order: attention metrics, readership, normalize,
//! open access, DOI backfill. Each phase outcome is applied at its boundary;
//! a failed phase records the output's `error` and the next phase still runs.
//! Nothing written by an earlier phase is ever rolled back.

use std::sync::Arc;

use pulse_catalog::types::Output;
use pulse_db::{OperationError, doi_owner, find_output, save_output};
use pulse_providers::{
    AltmetricFetcher, CrossrefFetcher, FetchError, MendeleyFetcher, OpenAccessFetcher, Payload,
    PhaseOutcome, ProviderConfig, SourceFetcher, http_client,
};
use rusqlite::Connection;
use thiserror::Error;

use crate::normalize::FieldNormalizer;
use crate::shutdown::Shutdown;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Terminated by signal")]
    Terminated,
    #[error("Database error: {0}")]
    Db(#[from] OperationError),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Output not found: {0}")]
    NotFound(String),
    #[error("Provider setup failed: {0}")]
    Provider(#[from] FetchError),
}

// ── Jobs ────────────────────────────────────────────────────────────────────

/// What a pass over one output does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// Every phase, network included.
    Refresh,
    /// Recompute derived fields from the stored payloads only.
    Normalize,
}

impl Job {
    pub fn name(self) -> &'static str {
        match self {
            Job::Refresh => "refresh",
            Job::Normalize => "normalize",
        }
    }

    /// Parse a job name. Accepts the plain name or `Output.<name>`.
    pub fn from_name(name: &str) -> Option<Job> {
        let name = name.strip_prefix("Output.").unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "refresh" => Some(Job::Refresh),
            "normalize" => Some(Job::Normalize),
            _ => None,
        }
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AttentionMetrics,
    Readership,
    Normalize,
    OpenAccess,
    DoiBackfill,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::AttentionMetrics => "attention",
            Phase::Readership => "readership",
            Phase::Normalize => "normalize",
            Phase::OpenAccess => "open-access",
            Phase::DoiBackfill => "doi-backfill",
        }
    }
}

/// How one phase ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseStatus {
    Skipped,
    Updated,
    /// The provider has no data; its sentinel was stored.
    NoData,
    Failed(String),
    /// The provider is halted; nothing was called.
    Halted(String),
}

/// Outcome of one enrichment pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichReport {
    pub output_id: String,
    pub job: Job,
    pub phases: Vec<(Phase, PhaseStatus)>,
    /// DOI found by the backfill phase and kept.
    pub doi_backfilled: Option<String>,
}

impl EnrichReport {
    fn new(output_id: &str, job: Job) -> Self {
        Self {
            output_id: output_id.to_string(),
            job,
            phases: Vec::new(),
            doi_backfilled: None,
        }
    }

    pub fn status(&self, phase: Phase) -> Option<&PhaseStatus> {
        self.phases.iter().find(|(p, _)| *p == phase).map(|(_, s)| s)
    }

    pub fn has_failures(&self) -> bool {
        self.phases
            .iter()
            .any(|(_, s)| matches!(s, PhaseStatus::Failed(_) | PhaseStatus::Halted(_)))
    }

    pub fn updated_phases(&self) -> usize {
        self.phases
            .iter()
            .filter(|(_, s)| matches!(s, PhaseStatus::Updated | PhaseStatus::NoData))
            .count()
    }
}

// ── Enricher ────────────────────────────────────────────────────────────────

/// Runs enrichment passes with one fetcher per provider.
pub struct Enricher {
    attention: Arc<dyn SourceFetcher>,
    readership: Arc<dyn SourceFetcher>,
    open_access: Arc<dyn SourceFetcher>,
    doi_backfill: Arc<dyn SourceFetcher>,
    normalizer: FieldNormalizer,
    shutdown: Shutdown,
}

impl Enricher {
    pub fn new(
        attention: Arc<dyn SourceFetcher>,
        readership: Arc<dyn SourceFetcher>,
        open_access: Arc<dyn SourceFetcher>,
        doi_backfill: Arc<dyn SourceFetcher>,
    ) -> Self {
        Self {
            attention,
            readership,
            open_access,
            doi_backfill,
            normalizer: FieldNormalizer::default(),
            shutdown: Shutdown::never(),
        }
    }

    /// Build the real provider clients, sharing one HTTP client.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, EnrichError> {
        let http = http_client(config.contact_email.as_deref())?;
        Ok(Self::new(
            Arc::new(AltmetricFetcher::new(http.clone(), config)),
            Arc::new(MendeleyFetcher::new(http.clone(), config)),
            Arc::new(OpenAccessFetcher::new(http.clone(), config)),
            Arc::new(CrossrefFetcher::new(http, config)),
        ))
    }

    pub fn with_normalizer(mut self, normalizer: FieldNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Run one pass over an in-memory output.
    ///
    /// On [`EnrichError::Terminated`] the output may be partly updated and
    /// must not be saved.
    pub async fn enrich(&self, output: &mut Output, job: Job) -> Result<EnrichReport, EnrichError> {
        let mut report = EnrichReport::new(&output.id, job);

        if job == Job::Refresh {
            output.error = None;
            self.run_phase(Phase::AttentionMetrics, self.attention.as_ref(), output, &mut report)
                .await?;
            self.run_phase(Phase::Readership, self.readership.as_ref(), output, &mut report)
                .await?;
        }

        self.check_shutdown()?;
        output.set_derived(self.normalizer.normalize(output));
        report.phases.push((Phase::Normalize, PhaseStatus::Updated));

        if job == Job::Refresh {
            if output.user_supplied_fulltext_url.is_some() {
                report.phases.push((Phase::OpenAccess, PhaseStatus::Skipped));
            } else {
                self.run_phase(Phase::OpenAccess, self.open_access.as_ref(), output, &mut report)
                    .await?;
            }
            self.run_phase(Phase::DoiBackfill, self.doi_backfill.as_ref(), output, &mut report)
                .await?;
        }

        Ok(report)
    }

    /// Load, enrich, and save one stored output.
    ///
    /// The save happens in its own transaction. A backfilled DOI that another
    /// stored output already holds is dropped before saving.
    pub async fn enrich_stored(
        &self,
        conn: &Connection,
        output_id: &str,
        job: Job,
    ) -> Result<EnrichReport, EnrichError> {
        let mut output = find_output(conn, output_id)?
            .ok_or_else(|| EnrichError::NotFound(output_id.to_string()))?;

        let mut report = self.enrich(&mut output, job).await?;

        let tx = conn.unchecked_transaction()?;
        if let Some(doi) = report.doi_backfilled.clone() {
            if let Some(owner) = doi_owner(&tx, &doi, &output.id)? {
                log::warn!(
                    "Backfilled doi {doi} for {} already belongs to {owner}, not saving it",
                    output.id
                );
                output.doi = None;
                report.doi_backfilled = None;
                if let Some(entry) = report
                    .phases
                    .iter_mut()
                    .find(|(phase, _)| *phase == Phase::DoiBackfill)
                {
                    entry.1 = PhaseStatus::Skipped;
                }
            }
        }
        save_output(&tx, &output)?;
        tx.commit()?;

        if let Some(ref error) = output.error {
            log::info!("Enriched {} with error: {error}", output.id);
        } else {
            log::debug!("Enriched {} ({} phases updated)", output.id, report.updated_phases());
        }
        Ok(report)
    }

    fn check_shutdown(&self) -> Result<(), EnrichError> {
        if self.shutdown.is_triggered() {
            Err(EnrichError::Terminated)
        } else {
            Ok(())
        }
    }

    async fn run_phase(
        &self,
        phase: Phase,
        fetcher: &dyn SourceFetcher,
        output: &mut Output,
        report: &mut EnrichReport,
    ) -> Result<(), EnrichError> {
        self.check_shutdown()?;
        let outcome = tokio::select! {
            outcome = fetcher.fetch(output) => outcome,
            () = self.shutdown.triggered() => return Err(EnrichError::Terminated),
        };

        let status = match outcome {
            PhaseOutcome::Skipped => PhaseStatus::Skipped,
            PhaseOutcome::Success(payload) => {
                apply_payload(output, payload, report);
                PhaseStatus::Updated
            }
            PhaseOutcome::Sentinel(payload) => {
                apply_payload(output, payload, report);
                PhaseStatus::NoData
            }
            PhaseOutcome::Retryable(err) => {
                let message = err.to_string();
                log::debug!(
                    "{} phase ({}) failed for {}: {message}",
                    phase.name(),
                    fetcher.provider(),
                    output.id
                );
                output.error = Some(message.clone());
                PhaseStatus::Failed(message)
            }
            PhaseOutcome::Fatal(err) => {
                let message = err.to_string();
                log::warn!("{} halted for {}: {message}", fetcher.provider(), output.id);
                output.error = Some(message.clone());
                PhaseStatus::Halted(message)
            }
        };
        report.phases.push((phase, status));
        Ok(())
    }
}

/// Write a payload into the slot it belongs to. Each slot is replaced whole.
fn apply_payload(output: &mut Output, payload: Payload, report: &mut EnrichReport) {
    match payload {
        Payload::Altmetric(raw) => output.altmetric_raw = Some(raw),
        Payload::Mendeley(raw) => output.mendeley_raw = Some(raw),
        Payload::OpenAccess(record) => {
            output.fulltext_url = record.fulltext_url;
            output.license = record.license;
            output.evidence = record.evidence;
        }
        Payload::Doi(doi) => {
            output.doi = Some(doi.clone());
            report.doi_backfilled = Some(doi);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_names_round_trip() {
        for job in [Job::Refresh, Job::Normalize] {
            assert_eq!(Job::from_name(job.name()), Some(job));
        }
        assert_eq!(Job::from_name("Output.refresh"), Some(Job::Refresh));
        assert_eq!(Job::from_name("Person.refresh"), None);
        assert_eq!(Job::from_name("rebuild"), None);
    }

    #[test]
    fn report_failure_summary() {
        let mut report = EnrichReport::new("out", Job::Refresh);
        report.phases.push((Phase::AttentionMetrics, PhaseStatus::NoData));
        report.phases.push((Phase::Readership, PhaseStatus::Updated));
        assert!(!report.has_failures());
        assert_eq!(report.updated_phases(), 2);

        report
            .phases
            .push((Phase::OpenAccess, PhaseStatus::Failed("timeout".to_string())));
        assert!(report.has_failures());
        assert_eq!(report.status(Phase::DoiBackfill), None);
    }
}
