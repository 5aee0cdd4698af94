//! Braze → Transifex sync runs.
//!
//! A run moves through [`SyncPhase`]s:
//!
//! 1. **Backing up**: export the project TMX (skipped when disabled)
//! 2. **Fetching**: list Braze email templates and content blocks
//! 3. **Syncing**: upsert one Transifex resource per item, several at a time
//!
//! Individual item failures are recorded and the run carries on; only an
//! authorization error, a fail-closed backup failure or cancellation end it
//! early.
//!
//! # Example
//!
//! ```ignore
//! use bzsync::sync::{event_channel, run_sync, CancelToken};
//!
//! let (events, mut rx) = event_channel();
//! let report = run_sync(config, &CancelToken::new(), &events).await?;
//! println!("{} created, {} failed", report.counts.created, report.counts.failed);
//! ```

mod cancel;
mod events;
mod orchestrator;
mod state;

pub use cancel::CancelToken;
pub use events::{event_channel, EventSink, SyncEvent};
pub use orchestrator::Orchestrator;
pub use state::{PhaseTracker, SyncPhase};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::model::SyncReport;

/// Validate `config` and perform one run over the network.
///
/// # Errors
///
/// Only configuration problems are errors; everything that happens during
/// the run is described by the returned report.
pub async fn run_sync(config: SyncConfig, cancel: &CancelToken, events: &EventSink) -> Result<SyncReport> {
    let orchestrator = Orchestrator::from_config(config)?;
    Ok(orchestrator.run(cancel, events).await)
}
