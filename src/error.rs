//! Error types for bzsync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=auth, 3=network, 4=validation, etc.)
//! - Run-level classification (which errors abort a sync run)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bzsync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Auth (exit 2)
    AuthError,

    // Network (exit 3)
    TransientError,

    // Validation (exit 4)
    ClientError,
    ValidationError,
    SlugCollision,

    // Backup (exit 5)
    BackupError,

    // Sync state (exit 6)
    InvalidStateTransition,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Cancelled (exit 130)
    Cancelled,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::AuthError => "AUTH_ERROR",
            Self::TransientError => "TRANSIENT_ERROR",
            Self::ClientError => "CLIENT_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::SlugCollision => "SLUG_COLLISION",
            Self::BackupError => "BACKUP_ERROR",
            Self::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::AuthError => 2,
            Self::TransientError => 3,
            Self::ClientError | Self::ValidationError | Self::SlugCollision => 4,
            Self::BackupError => 5,
            Self::InvalidStateTransition => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
            Self::Cancelled => 130,
        }
    }

    /// Whether running the same command again may succeed unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientError | Self::BackupError | Self::Cancelled)
    }
}

impl serde::Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur while syncing Braze content into Transifex.
#[derive(Error, Debug)]
pub enum Error {
    /// 401/403 from either platform. Fatal for the run.
    #[error("{service} rejected the credentials (HTTP {status}): {message}")]
    Auth {
        service: String,
        status: u16,
        message: String,
    },

    /// Connection failure, timeout, 429 or 5xx that outlived the retry budget.
    #[error("{service} request failed after {attempts} attempt(s): {message}")]
    Transient {
        service: String,
        attempts: u32,
        message: String,
    },

    /// Any other 4xx. Fails the current item only.
    #[error("{service} returned HTTP {status}: {message}")]
    Client {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Slug '{slug}' is already used by {existing}; refusing to overwrite it with {incoming}")]
    SlugCollision {
        slug: String,
        existing: String,
        incoming: String,
    },

    #[error("Backup failed: {0}")]
    Backup(String),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing setting {setting} (set {env_var} or add it to the config file)")]
    MissingSetting {
        setting: &'static str,
        env_var: &'static str,
    },

    #[error("IO error at {}: {source}", path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Auth { .. } => ErrorCode::AuthError,
            Self::Transient { .. } => ErrorCode::TransientError,
            Self::Client { .. } => ErrorCode::ClientError,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::SlugCollision { .. } => ErrorCode::SlugCollision,
            Self::Backup(_) => ErrorCode::BackupError,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::InvalidStateTransition { .. } => ErrorCode::InvalidStateTransition,
            Self::Config(_) | Self::MissingSetting { .. } => ErrorCode::ConfigError,
            Self::FileIo { .. } => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Whether this error aborts the whole run rather than a single item.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::Cancelled)
    }

    /// True for a client error carrying HTTP 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Client { status: 404, .. })
    }

    /// Context-aware recovery hint for humans and scripts.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Auth { service, .. } if service == "Braze" => Some(
                "Check BRAZE_API_KEY and that the key has the templates.email.* and \
                 content_blocks.* permissions."
                    .to_string(),
            ),
            Self::Auth { .. } => Some(
                "Check TRANSIFEX_API_TOKEN and that the token can manage the configured project."
                    .to_string(),
            ),

            Self::Transient { .. } => Some(
                "The service is unreachable or overloaded. Check your network and retry later."
                    .to_string(),
            ),

            Self::MissingSetting { env_var, .. } => Some(format!(
                "Export {env_var}=... or run `bzsync config path` to locate the config file."
            )),

            Self::SlugCollision { .. } => Some(
                "Two Braze items map to the same Transifex slug. Rename or delete one of them in Braze."
                    .to_string(),
            ),

            Self::Backup(_) => Some(
                "Re-run with --fail-open to sync without a backup, or --no-backup to skip it."
                    .to_string(),
            ),

            Self::Cancelled => Some("Re-run `bzsync run` to finish the remaining items.".to_string()),

            Self::Client { .. }
            | Self::Validation(_)
            | Self::InvalidStateTransition { .. }
            | Self::Config(_)
            | Self::FileIo { .. }
            | Self::Json(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
