//! Data models for bzsync.
//!
//! This module contains the domain models shared by every phase of a run:
//! - SourceItem / ContentKind (what Braze gives us)
//! - ItemOutcome / SyncReport (what a run produces)

pub mod item;
pub mod report;

pub use item::{slugify, ContentKind, SourceFields, SourceItem, MAX_SLUG_LEN};
pub use report::{
    BackupArtifact, BackupResult, ItemOutcome, KindFailure, Outcome, ReportCounts, RunStatus,
    SkippedItem, SyncReport,
};
