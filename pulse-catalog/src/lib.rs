//! Research-output data model, title/DOI normalization, and the static
//! lookup tables the enrichment pipeline relies on.
//!
//! This crate has no database or network dependencies. Consumers can use
//! these types directly for serialization, display, or passing to `pulse-db`
//! for persistence.

pub mod countries;
pub mod genre;
pub mod job_titles;
pub mod languages;
pub mod sources;
pub mod title;
pub mod types;

pub use genre::{genre_for, guess_genre};
pub use sources::{SOURCES, SourceMeta, SourceSummary, is_known_source, source_summaries};
pub use title::{clean_doi, normalize_title};
pub use types::*;
