//! Run report types.
//!
//! The orchestrator owns one [`SyncReport`] per run and is its only writer.
//! Everything here serializes to JSON for `bzsync run --json`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ErrorCode;

use super::item::{ContentKind, SourceItem};

/// Result of upserting one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The resource did not exist and was created.
    Created,
    /// The resource already existed.
    Updated,
    /// The item could not be synced.
    Failed { reason: String },
}

impl Outcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Per-item record in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub kind: ContentKind,
    pub source_id: String,
    pub slug: String,
    pub name: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Whether the resource display name was changed this run.
    pub renamed: bool,
    /// Number of source strings uploaded.
    pub strings: usize,
    /// Annotation such as "no content".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ItemOutcome {
    /// Start a record for `item`; the outcome is filled in by the caller.
    #[must_use]
    pub fn for_item(item: &SourceItem, outcome: Outcome) -> Self {
        Self {
            kind: item.kind,
            source_id: item.id.clone(),
            slug: item.slug(),
            name: item.name.clone(),
            outcome,
            renamed: false,
            strings: 0,
            note: None,
        }
    }
}

/// An upstream entry dropped during fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub kind: ContentKind,
    /// Whatever identified the entry upstream, if anything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    pub reason: String,
}

/// A content kind whose fetch was abandoned after retries ran out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindFailure {
    pub kind: ContentKind,
    pub reason: String,
}

/// The TMX file written before sync mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupArtifact {
    pub path: PathBuf,
    pub bytes: u64,
    /// Hex SHA-256 of the file content.
    pub sha256: String,
}

/// What the backup phase produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackupResult {
    /// Backup is turned off in configuration.
    Disabled,
    Saved(BackupArtifact),
    Failed { reason: String },
}

impl BackupResult {
    /// True unless the backup was attempted and failed.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Item counts, derived from the item list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportCounts {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ReportCounts {
    /// Items that reached Transifex successfully.
    #[must_use]
    pub const fn succeeded(&self) -> usize {
        self.created + self.updated
    }

    /// Every item the run attempted.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.created + self.updated + self.failed
    }
}

/// Aggregate result of one sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub backup: BackupResult,
    /// Outcomes in fetch order.
    pub items: Vec<ItemOutcome>,
    pub skipped: Vec<SkippedItem>,
    pub fetch_failures: Vec<KindFailure>,
    pub warnings: Vec<String>,
    /// The fatal condition that ended the run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    pub counts: ReportCounts,
}

impl SyncReport {
    /// A fresh report for a run that has not started any phase.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            status: RunStatus::Completed,
            started_at: Utc::now(),
            finished_at: None,
            backup: BackupResult::Disabled,
            items: Vec::new(),
            skipped: Vec::new(),
            fetch_failures: Vec::new(),
            warnings: Vec::new(),
            error: None,
            error_code: None,
            counts: ReportCounts::default(),
        }
    }

    /// Whether the pre-flight backup succeeded (or was not required).
    #[must_use]
    pub const fn backup_succeeded(&self) -> bool {
        self.backup.succeeded()
    }

    /// Process exit code for this report: 0 for a completed run, even with
    /// failed items.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self.status {
            RunStatus::Completed => 0,
            RunStatus::Cancelled => ErrorCode::Cancelled.exit_code(),
            RunStatus::Failed => self
                .error_code
                .map_or(ErrorCode::InternalError.exit_code(), |code| code.exit_code()),
        }
    }

    /// Recompute counts and stamp the finish time.
    pub fn finalize(&mut self, status: RunStatus) {
        self.status = status;
        self.counts = self.compute_counts();
        self.finished_at = Some(Utc::now());
    }

    fn compute_counts(&self) -> ReportCounts {
        let mut counts = ReportCounts {
            skipped: self.skipped.len(),
            ..ReportCounts::default()
        };
        for item in &self.items {
            match item.outcome {
                Outcome::Created => counts.created += 1,
                Outcome::Updated => counts.updated += 1,
                Outcome::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }
}

impl Default for SyncReport {
    fn default() -> Self {
        Self::new()
    }
}
