use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use pulse_providers::{ProviderConfig, config_path};

use crate::CliError;

/// Show current provider settings and their sources.
pub(crate) fn run_config_show() -> Result<(), CliError> {
    let path = config_path();

    log::info!(
        "{}",
        "Provider Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    crate::log_blank();

    match &path {
        Some(p) if p.exists() => {
            log::info!(
                "  Config file: {} {}",
                p.display().if_supports_color(Stdout, |t| t.cyan()),
                "(exists)".if_supports_color(Stdout, |t| t.green()),
            );
        }
        Some(p) => {
            log::info!(
                "  Config file: {} {}",
                p.display().if_supports_color(Stdout, |t| t.cyan()),
                "(not found)".if_supports_color(Stdout, |t| t.dimmed()),
            );
        }
        None => {
            log::info!(
                "  Config file: {}",
                "could not determine path".if_supports_color(Stdout, |t| t.red()),
            );
        }
    }
    crate::log_blank();

    let (_, entries) =
        ProviderConfig::load_with_sources().map_err(|e| CliError::config(e.to_string()))?;

    for entry in &entries {
        let source_str = format!("({})", entry.source);
        let name = format!("{}:", entry.key);
        match &entry.value {
            Some(v) => {
                log::info!(
                    "  {} {} {}",
                    name.if_supports_color(Stdout, |t| t.cyan()),
                    v,
                    source_str.if_supports_color(Stdout, |t| t.dimmed()),
                );
            }
            None => {
                log::info!(
                    "  {} {} {}",
                    name.if_supports_color(Stdout, |t| t.cyan()),
                    "not set".if_supports_color(Stdout, |t| t.yellow()),
                    source_str.if_supports_color(Stdout, |t| t.dimmed()),
                );
            }
        }
    }
    Ok(())
}

/// Print the config file path.
pub(crate) fn run_config_path() -> Result<(), CliError> {
    match config_path() {
        Some(path) => {
            log::info!("{}", path.display());
            Ok(())
        }
        None => Err(CliError::config("Could not determine config directory")),
    }
}
