//! The sync run: backup, fetch, then upsert every item.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use crate::braze::{braze_client, BrazeFetcher};
use crate::config::{BackupPolicy, SyncConfig};
use crate::error::{Error, Result};
use crate::http::{ReqwestTransport, Transport};
use crate::model::{BackupResult, ItemOutcome, Outcome, RunStatus, SkippedItem, SourceItem, SyncReport};
use crate::transifex::{transifex_client, BackupService, ResourceManager};

use super::cancel::CancelToken;
use super::events::{EventSink, SyncEvent};
use super::state::{PhaseTracker, SyncPhase};

type WorkerResult = (usize, Result<ItemOutcome>);

/// Drives one sync run over a shared transport.
pub struct Orchestrator<T: Transport> {
    config: SyncConfig,
    transport: Arc<T>,
}

impl Orchestrator<ReqwestTransport> {
    /// Validate `config` and build an orchestrator over a fresh connection pool.
    ///
    /// # Errors
    ///
    /// Returns the validation error, or `Error::Config` if the HTTP client
    /// cannot be built.
    pub fn from_config(config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.http.timeout)?;
        Ok(Self::new(config, Arc::new(transport)))
    }
}

impl<T: Transport + 'static> Orchestrator<T> {
    #[must_use]
    pub fn new(config: SyncConfig, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run backup, fetch and sync, reporting progress on `events`.
    ///
    /// Never fails: fatal conditions end the run with status `Failed` and
    /// the reason in `SyncReport::error`. `RunFinished` is the last event.
    pub async fn run(&self, cancel: &CancelToken, events: &EventSink) -> SyncReport {
        let mut run = RunState {
            report: SyncReport::new(),
            phases: PhaseTracker::new(),
            events,
        };
        info!(run_id = %run.report.run_id, "Starting sync run");

        let status = match self.drive(&mut run, cancel).await {
            Ok(()) => RunStatus::Completed,
            Err(Error::Cancelled) => {
                warn!("Sync cancelled");
                RunStatus::Cancelled
            }
            Err(err) => {
                error!(error = %err, "Sync failed");
                run.report.error = Some(err.to_string());
                run.report.error_code = Some(err.error_code());
                RunStatus::Failed
            }
        };

        let terminal = match status {
            RunStatus::Completed => SyncPhase::Completed,
            RunStatus::Failed => SyncPhase::Failed,
            RunStatus::Cancelled => SyncPhase::Cancelled,
        };
        if let Err(err) = run.enter(terminal) {
            error!(error = %err, "Could not record final phase");
        }

        run.report.finalize(status);
        let counts = run.report.counts;
        info!(
            status = %status,
            created = counts.created,
            updated = counts.updated,
            failed = counts.failed,
            skipped = counts.skipped,
            "Sync run finished"
        );
        events.emit(SyncEvent::RunFinished(Box::new(run.report.clone())));
        run.report
    }

    async fn drive(&self, run: &mut RunState<'_>, cancel: &CancelToken) -> Result<()> {
        let config = &self.config;
        let transifex = transifex_client(Arc::clone(&self.transport), &config.transifex, &config.http);

        run.enter(SyncPhase::BackingUp)?;
        cancel.check()?;
        let backup = BackupService::new(transifex.clone(), &config.transifex, &config.backup);
        run.report.backup = match backup.backup_if_enabled(cancel).await {
            Ok(result) => result,
            Err(err @ Error::Auth { .. }) => {
                run.report.backup = BackupResult::Failed {
                    reason: err.to_string(),
                };
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        if let BackupResult::Failed { reason } = &run.report.backup {
            match config.backup.policy {
                BackupPolicy::FailClosed => return Err(Error::Backup(reason.clone())),
                BackupPolicy::FailOpen => {
                    let message = format!("TMX backup failed, continuing without it: {reason}");
                    run.warn(message);
                }
            }
        }

        run.enter(SyncPhase::Fetching)?;
        let braze = braze_client(Arc::clone(&self.transport), &config.braze, &config.http);
        let fetched = BrazeFetcher::new(braze, &config.braze, &config.http)
            .fetch_all(cancel)
            .await?;
        for skipped in fetched.skipped {
            run.skip(skipped);
        }
        for failure in fetched.kind_failures {
            run.warn(format!("Could not fetch all {}: {}", failure.kind.label(), failure.reason));
            run.report.fetch_failures.push(failure);
        }
        info!(items = fetched.items.len(), "Fetch complete");

        run.enter(SyncPhase::Syncing)?;
        let manager = Arc::new(ResourceManager::new(transifex, &config.transifex, &config.http));
        self.sync_items(run, manager, fetched.items, cancel).await
    }

    async fn sync_items(
        &self,
        run: &mut RunState<'_>,
        manager: Arc<ResourceManager<T>>,
        items: Vec<SourceItem>,
        cancel: &CancelToken,
    ) -> Result<()> {
        let mut results: Vec<Option<ItemOutcome>> = vec![None; items.len()];
        let mut dispatched = vec![false; items.len()];

        for (index, outcome) in collisions(&items) {
            run.complete(&outcome);
            results[index] = Some(outcome);
        }

        let parallelism = self.config.parallelism.max(1);
        let mut workers: JoinSet<WorkerResult> = JoinSet::new();
        let mut fatal: Option<Error> = None;
        let mut cancelled = false;

        for (index, item) in items.iter().enumerate() {
            if results[index].is_some() {
                continue;
            }
            while workers.len() >= parallelism {
                if let Some(joined) = workers.join_next().await {
                    collect(run, &items, &mut results, &mut fatal, joined);
                }
            }
            if fatal.is_some() {
                break;
            }
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let manager = Arc::clone(&manager);
            let item = item.clone();
            workers.spawn(async move {
                let outcome = manager.upsert(&item).await;
                (index, outcome)
            });
            dispatched[index] = true;
        }

        while let Some(joined) = workers.join_next().await {
            collect(run, &items, &mut results, &mut fatal, joined);
        }

        for (index, slot) in results.iter_mut().enumerate() {
            if dispatched[index] && slot.is_none() {
                error!(slug = %items[index].slug(), "Worker ended without a result");
                let outcome = ItemOutcome::for_item(&items[index], Outcome::failed("worker task aborted"));
                run.complete(&outcome);
                *slot = Some(outcome);
            }
        }
        run.report.items = results.into_iter().flatten().collect();

        if let Some(err) = fatal {
            return Err(err);
        }
        if cancelled {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Fail every item whose slug an earlier item already claimed.
fn collisions(items: &[SourceItem]) -> Vec<(usize, ItemOutcome)> {
    let mut owners: HashMap<String, usize> = HashMap::new();
    let mut failed = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let slug = item.slug();
        match owners.get(&slug) {
            Some(&owner) => {
                let err = Error::SlugCollision {
                    slug: slug.clone(),
                    existing: items[owner].describe(),
                    incoming: item.describe(),
                };
                warn!(slug = %slug, "{err}");
                failed.push((index, ItemOutcome::for_item(item, Outcome::failed(err.to_string()))));
            }
            None => {
                owners.insert(slug, index);
            }
        }
    }
    failed
}

fn collect(
    run: &mut RunState<'_>,
    items: &[SourceItem],
    results: &mut [Option<ItemOutcome>],
    fatal: &mut Option<Error>,
    joined: std::result::Result<WorkerResult, JoinError>,
) {
    match joined {
        Ok((index, Ok(outcome))) => {
            run.complete(&outcome);
            results[index] = Some(outcome);
        }
        Ok((index, Err(err))) => {
            error!(slug = %items[index].slug(), error = %err, "Stopping dispatch");
            let outcome = ItemOutcome::for_item(&items[index], Outcome::failed(err.to_string()));
            run.complete(&outcome);
            results[index] = Some(outcome);
            if fatal.is_none() {
                *fatal = Some(err);
            }
        }
        Err(err) => error!(error = %err, "Worker task failed"),
    }
}

/// Per-run bookkeeping owned by the orchestrator task.
struct RunState<'e> {
    report: SyncReport,
    phases: PhaseTracker,
    events: &'e EventSink,
}

impl RunState<'_> {
    fn enter(&mut self, phase: SyncPhase) -> Result<()> {
        self.phases.advance(phase)?;
        info!(phase = %phase, "Phase changed");
        self.events.emit(SyncEvent::PhaseChanged(phase));
        Ok(())
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.events.emit(SyncEvent::Warning(message.clone()));
        self.report.warnings.push(message);
    }

    fn skip(&mut self, skipped: SkippedItem) {
        self.events.emit(SyncEvent::ItemSkipped {
            kind: skipped.kind,
            reason: skipped.reason.clone(),
        });
        self.report.skipped.push(skipped);
    }

    fn complete(&self, outcome: &ItemOutcome) {
        self.events.emit(SyncEvent::ItemCompleted(outcome.clone()));
    }
}
