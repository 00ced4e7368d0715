//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Enrich research outputs with attention and readership data", long_about = None)]
pub(crate) struct Cli {
    /// Database file (defaults to the user data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which outputs a batch covers.
#[derive(Args, Clone)]
pub(crate) struct ScopeArgs {
    /// Process only this output id
    #[arg(long, conflicts_with = "after")]
    pub id: Option<String>,

    /// Start at this output id (inclusive) and continue in id order
    #[arg(long)]
    pub after: Option<String>,

    /// Maximum number of outputs to process
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output ids read from the database at a time
    #[arg(long, default_value_t = pulse_enrich::DEFAULT_CHUNK_SIZE)]
    pub chunk: u32,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run an enrichment job over stored outputs (refresh, normalize)
    Update {
        /// Job to run
        job: String,

        #[command(flatten)]
        scope: ScopeArgs,

        /// Queue one job per output for `pulse worker` instead of running inline
        #[arg(long)]
        queue: bool,
    },

    /// Process queued enrichment jobs
    Worker {
        /// Stop after this many jobs
        #[arg(long)]
        max_jobs: Option<usize>,

        /// Seconds to wait between polls of an empty queue
        #[arg(long, default_value_t = 5)]
        poll_secs: u64,

        /// Exit as soon as the queue is empty
        #[arg(long)]
        exit_when_empty: bool,

        /// First put jobs left running by a crashed worker back on the queue
        #[arg(long)]
        requeue_stale: bool,
    },

    /// Import candidate outputs from a JSON file, skipping duplicates
    Import {
        /// JSON array of candidate outputs
        file: PathBuf,
    },

    /// Show one stored output and its derived fields
    Show {
        /// Output id
        id: String,
    },

    /// Manage provider configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show current settings and where each came from
    Show,
    /// Print the config file path
    Path,
}
