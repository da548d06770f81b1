//! Config subcommand handlers.

use std::path::PathBuf;

use mvikit_config::{Config, config_path, load_config_from, save_config_to};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{print_output, render_document};

/// The file `--config` points at, or the platform default.
pub fn resolve_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = resolve_path(global);
    match args.command {
        ConfigCommand::Show => {
            let cfg = load_config_from(&path)?;
            print_output(&render_document(global.output, &cfg)?);
        }

        ConfigCommand::Path => print_output(&path.display().to_string()),

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            save_config_to(&Config::default(), &path)?;
            tracing::info!(path = %path.display(), "config written");
            eprintln!("Wrote {}", path.display());
        }
    }
    Ok(())
}
