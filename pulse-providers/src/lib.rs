//! Clients for the external providers an output is enriched from.
//!
//! Every fetcher implements [`SourceFetcher`] and turns each call into a
//! [`PhaseOutcome`]; no provider failure escapes as an `Err`.

pub mod altmetric;
pub mod client;
pub mod config;
pub mod crossref;
pub mod error;
pub mod mendeley;
pub mod oadoi;
pub mod types;

pub use altmetric::{AltmetricFetcher, classify_attention_response};
pub use client::{HardStopGate, Throttle, http_client};
pub use config::{ConfigEntry, ConfigSource, ProviderConfig, config_path};
pub use crossref::{CrossrefFetcher, parse_backfill_response};
pub use error::{ConfigError, FetchError};
pub use mendeley::{MendeleyFetcher, classify_catalog_response};
pub use oadoi::{OpenAccessFetcher, classify_open_access_response};
pub use types::{Payload, PhaseOutcome, Provider, SourceFetcher, is_sentinel, sentinel};
