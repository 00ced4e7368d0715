mod cli_types;
mod commands;
mod error;
mod spinner;

use std::io::Write;

use clap::Parser;
use log::{Level, LevelFilter};

use cli_types::{Cli, Commands, ConfigAction};
pub(crate) use error::CliError;

/// Print an empty line through the logger so `--quiet` hides it too.
pub(crate) fn log_blank() {
    log::info!("");
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let env = env_logger::Env::default().default_filter_or(level);
    let mut builder = env_logger::Builder::from_env(env);
    builder
        .filter_module("hyper", LevelFilter::Warn)
        .filter_module("hyper_util", LevelFilter::Warn)
        .filter_module("rustls", LevelFilter::Warn)
        .filter_module("h2", LevelFilter::Warn)
        .target(env_logger::Target::Stdout);

    if verbose {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} [{}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    } else {
        builder.format(|buf, record| match record.level() {
            Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(buf, "{}: {}", level, record.args()),
        });
    }
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let db_path = cli.db.unwrap_or_else(commands::default_db_path);

    let result = match cli.command {
        Commands::Update { job, scope, queue } => {
            commands::update::run_update(&db_path, &job, scope, queue, cli.quiet)
        }
        Commands::Worker {
            max_jobs,
            poll_secs,
            exit_when_empty,
            requeue_stale,
        } => commands::worker::run_worker(
            &db_path,
            max_jobs,
            poll_secs,
            exit_when_empty,
            requeue_stale,
        ),
        Commands::Import { file } => commands::import::run_import(&db_path, &file, cli.quiet),
        Commands::Show { id } => commands::show::run_show(&db_path, &id),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(),
            ConfigAction::Path => commands::config::run_config_path(),
        },
    };

    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}
