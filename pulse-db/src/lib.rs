//! SQLite persistence layer for research outputs.
//!
//! Provides schema creation, output reads and writes, and the enrichment
//! job queue, backed by SQLite (via rusqlite with bundled feature).

pub mod jobs;
pub mod operations;
pub mod queries;
pub mod schema;

pub use jobs::{
    JobCounts, JobStatus, QueuedJob, claim_next_job, enqueue_job, finish_job, job_counts,
    release_job, requeue_running_jobs,
};
pub use operations::{OperationError, adopt_identity, insert_output, save_output};
pub use queries::{
    doi_owner, find_output, find_output_by_doi, identity_set, output_count, output_ids_from,
};
pub use schema::{SchemaError, open_database, open_memory};
