//! Run command implementation.

use std::path::Path;

use colored::Colorize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;

use crate::cli::RunArgs;
use crate::config::Overrides;
use crate::error::Result;
use crate::model::{BackupResult, Outcome, RunStatus, SyncReport};
use crate::sync::{event_channel, CancelToken, EventSink, Orchestrator, SyncEvent};

impl RunArgs {
    /// Command-line values that take precedence over the environment and file.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            backup_enabled: if self.no_backup {
                Some(false)
            } else {
                self.backup_enabled
            },
            backup_dir: self.backup_dir.clone(),
            fail_open: self.fail_open.then_some(true),
            parallelism: self.parallelism,
            verify_uploads: self.no_verify_uploads.then_some(false),
        }
    }
}

/// Execute a sync run. Returns the process exit code for the report.
///
/// # Errors
///
/// Returns an error if the configuration is incomplete or invalid.
pub fn execute(args: &RunArgs, config_path: Option<&Path>, json: bool, quiet: bool) -> Result<u8> {
    let config = super::load_config(config_path, &args.overrides())?;
    let orchestrator = Orchestrator::from_config(config)?;

    let rt = super::runtime()?;
    let report = rt.block_on(async {
        let cancel = CancelToken::new();
        let ctrl_c = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted; finishing in-flight items");
                    cancel.cancel();
                }
            })
        };

        let (events, printer) = if json || quiet {
            (EventSink::disabled(), None)
        } else {
            let (sink, rx) = event_channel();
            (sink, Some(tokio::spawn(print_progress(rx))))
        };

        let report = orchestrator.run(&cancel, &events).await;

        // Closing the sink lets the printer drain and exit.
        drop(events);
        if let Some(printer) = printer {
            let _ = printer.await;
        }
        ctrl_c.abort();
        report
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        print_summary(&report, orchestrator.config().transifex.project_id().as_str());
    }

    Ok(report.exit_code())
}

async fn print_progress(mut rx: UnboundedReceiver<SyncEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            SyncEvent::PhaseChanged(phase) if !phase.is_terminal() => {
                println!("{} {phase}", "==>".cyan().bold());
            }
            SyncEvent::ItemCompleted(item) => {
                let status = match &item.outcome {
                    Outcome::Created => "created".green(),
                    Outcome::Updated => "updated".blue(),
                    Outcome::Failed { .. } => "failed".red(),
                };
                print!("  {status:>8} {} {}", item.slug, item.name.dimmed());
                if let Outcome::Failed { reason } = &item.outcome {
                    print!(" ({reason})");
                }
                println!();
            }
            SyncEvent::ItemSkipped { kind, reason } => {
                println!("  {:>8} {kind}: {reason}", "skipped".yellow());
            }
            SyncEvent::Warning(message) => {
                println!("  {} {message}", "warning:".yellow().bold());
            }
            SyncEvent::PhaseChanged(_) | SyncEvent::RunFinished(_) => {}
        }
    }
}

fn print_summary(report: &SyncReport, project: &str) {
    let counts = &report.counts;
    let status = match report.status {
        RunStatus::Completed => "completed".green().bold(),
        RunStatus::Failed => "failed".red().bold(),
        RunStatus::Cancelled => "cancelled".yellow().bold(),
    };

    println!();
    println!("Sync {status} for {}", project.cyan());
    match &report.backup {
        BackupResult::Disabled => println!("  Backup:   {}", "disabled".dimmed()),
        BackupResult::Saved(artifact) => {
            println!("  Backup:   {} ({} bytes)", artifact.path.display(), artifact.bytes);
        }
        BackupResult::Failed { reason } => println!("  Backup:   {} {reason}", "failed".red()),
    }
    println!("  Created:  {}", counts.created);
    println!("  Updated:  {}", counts.updated);
    println!("  Failed:   {}", counts.failed);
    println!("  Skipped:  {}", counts.skipped);

    for failure in &report.fetch_failures {
        println!("  {} {}: {}", "Fetch failed".red(), failure.kind, failure.reason);
    }
    if let Some(error) = &report.error {
        println!("  {} {error}", "Error:".red().bold());
    }
}
