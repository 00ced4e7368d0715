//! Enrichment pipeline for research outputs.
//!
//! This crate owns the pipeline logic: resolving duplicate candidates before
//! they are stored, running the per-output provider phases, computing derived
//! fields, and scheduling passes over the stored set either inline or through
//! the job queue.

pub mod enrich;
pub mod import;
pub mod normalize;
pub mod progress;
pub mod resolve;
pub mod schedule;
pub mod shutdown;
pub mod worker;

pub use enrich::{EnrichError, EnrichReport, Enricher, Job, Phase, PhaseStatus};
pub use import::{ImportError, ImportStats, import_candidates, read_candidates};
pub use normalize::{Detection, FieldNormalizer, LanguageDetector, WhatlangDetector};
pub use progress::{BatchProgress, LogProgress, SilentProgress};
pub use resolve::{Resolution, distinct_outputs, resolve};
pub use schedule::{
    BatchOptions, BatchStats, DEFAULT_CHUNK_SIZE, Executor, IdCursor, InlineExecutor, JobHandle,
    QueueExecutor, Scope, ScheduleError, run_batch,
};
pub use shutdown::{Shutdown, ShutdownTrigger, shutdown_channel};
pub use worker::{WorkerOptions, WorkerStats, run_worker};
