//! Settings file management.
//!
//! Loads `~/.bzsync/config.json`. Every field is optional; missing
//! values fall back to environment variables and then to defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// On-disk settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub braze_rest_endpoint: Option<String>,
    pub braze_api_key: Option<String>,
    pub braze_page_size: Option<usize>,
    pub braze_request_interval_ms: Option<u64>,

    pub transifex_api_base_url: Option<String>,
    pub transifex_api_token: Option<String>,
    pub transifex_organization_slug: Option<String>,
    pub transifex_project_slug: Option<String>,
    pub verify_uploads: Option<bool>,

    pub backup_enabled: Option<bool>,
    pub backup_path: Option<PathBuf>,
    pub backup_fail_open: Option<bool>,
    pub backup_timeout_secs: Option<u64>,

    pub parallelism: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub max_pages: Option<usize>,
}

/// Root directory for bzsync's own files (`~/.bzsync`).
#[must_use]
pub fn bzsync_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".bzsync"))
}

/// Resolve the settings file location.
///
/// Priority:
/// 1. Explicit path (from `--config`)
/// 2. `BZSYNC_CONFIG` environment variable
/// 3. `~/.bzsync/config.json`
///
/// # Errors
///
/// Returns `Error::Config` if no home directory can be determined.
pub fn settings_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var("BZSYNC_CONFIG") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    bzsync_home()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load settings from `path`. A missing file yields defaults.
///
/// # Errors
///
/// Returns `Error::Config` if the file exists but cannot be read or parsed.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))
}
