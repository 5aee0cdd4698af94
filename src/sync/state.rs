//! Run phase state machine.
//!
//! ```text
//! Idle ─▶ BackingUp ─▶ Fetching ─▶ Syncing ─▶ Completed
//!            │  │          │  │        │  │
//!            │  └──────────┴──┴────────┴──┴──▶ Failed
//!            └─────────────┴───────────┴─────▶ Cancelled
//! ```

use serde::Serialize;

use crate::error::{Error, Result};

/// Phase of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    BackingUp,
    Fetching,
    Syncing,
    Completed,
    Failed,
    Cancelled,
}

impl SyncPhase {
    /// Whether the run has ended.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (Self::Idle, Self::BackingUp)
            | (Self::BackingUp, Self::Fetching)
            | (Self::Fetching, Self::Syncing)
            | (Self::Syncing, Self::Completed) => true,
            (Self::BackingUp | Self::Fetching | Self::Syncing, Self::Failed | Self::Cancelled) => {
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::BackingUp => "backing up",
            Self::Fetching => "fetching",
            Self::Syncing => "syncing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Tracks the current phase and rejects illegal moves.
#[derive(Debug)]
pub struct PhaseTracker {
    current: SyncPhase,
}

impl PhaseTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: SyncPhase::Idle,
        }
    }

    #[must_use]
    pub const fn current(&self) -> SyncPhase {
        self.current
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the move is not allowed.
    pub fn advance(&mut self, next: SyncPhase) -> Result<()> {
        if !self.current.can_transition_to(next) {
            return Err(Error::InvalidStateTransition {
                from: self.current.to_string(),
                to: next.to_string(),
            });
        }
        self.current = next;
        Ok(())
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
