//! Config command implementation.

use std::path::Path;

use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::{settings_path, Overrides};
use crate::error::Result;

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the settings file cannot be located or parsed.
pub fn execute(command: ConfigCommands, config_path: Option<&Path>, json: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => show(config_path, json),
        ConfigCommands::Path => path(config_path, json),
    }
}

fn show(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = super::load_config(config_path, &Overrides::default())?;
    let redacted = config.redacted_json();

    if json {
        println!("{}", serde_json::to_string(&redacted)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&redacted)?);
        if let Err(e) = config.validate() {
            println!();
            println!("{} {e}", "Incomplete:".yellow().bold());
        }
    }
    Ok(())
}

fn path(config_path: Option<&Path>, json: bool) -> Result<()> {
    let path = settings_path(config_path)?;
    if json {
        println!("{}", serde_json::json!({ "path": path, "exists": path.exists() }));
    } else {
        println!("{}", path.display());
    }
    Ok(())
}
