//! Command implementations.

pub mod backup;
pub mod completions;
pub mod config;
pub mod run;
pub mod version;

use std::path::Path;

use crate::config::{load_settings, resolve_config, settings_path, EnvCredentials, Overrides, SyncConfig};
use crate::error::{Error, Result};

/// Resolve the configuration from flags, environment and the settings file.
fn load_config(explicit: Option<&Path>, overrides: &Overrides) -> Result<SyncConfig> {
    let path = settings_path(explicit)?;
    let settings = load_settings(&path)?;
    Ok(resolve_config(&settings, &EnvCredentials, overrides))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}
