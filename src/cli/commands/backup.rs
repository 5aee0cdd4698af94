//! Backup command implementation.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use serde_json::json;

use crate::cli::BackupArgs;
use crate::config::Overrides;
use crate::error::Result;
use crate::http::ReqwestTransport;
use crate::sync::CancelToken;
use crate::transifex::{transifex_client, BackupService};

/// Export the Transifex project as TMX, outside of a sync run.
///
/// # Errors
///
/// Returns an error if Transifex settings are missing or the export fails.
pub fn execute(args: &BackupArgs, config_path: Option<&Path>, json: bool, quiet: bool) -> Result<()> {
    let overrides = Overrides {
        backup_enabled: Some(true),
        backup_dir: args.backup_dir.clone(),
        ..Overrides::default()
    };
    let config = super::load_config(config_path, &overrides)?;
    config.validate_transifex()?;

    let transport = Arc::new(ReqwestTransport::new(config.http.timeout)?);
    let client = transifex_client(transport, &config.transifex, &config.http);
    let service = BackupService::new(client, &config.transifex, &config.backup);

    let rt = super::runtime()?;
    let artifact = rt.block_on(async {
        let cancel = CancelToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };
        let result = service.backup(&cancel).await;
        watcher.abort();
        result
    })?;

    if json {
        let output = json!({
            "project": config.transifex.project_id(),
            "backup": artifact,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !quiet {
        println!(
            "{} {} ({} bytes)",
            "Saved".green().bold(),
            artifact.path.display(),
            artifact.bytes
        );
        println!("  sha256: {}", artifact.sha256.dimmed());
    }

    Ok(())
}
