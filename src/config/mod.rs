//! Configuration management.
//!
//! The sync engine takes one explicit [`SyncConfig`] value and never reads
//! environment variables or files on its own. The CLI builds that value with
//! [`resolve_config`], layering sources in this order:
//!
//! 1. Command-line flags ([`Overrides`])
//! 2. The credential store (environment variables by default)
//! 3. The settings file (`~/.bzsync/config.json`)
//! 4. Built-in defaults

mod credentials;
mod settings;

pub use credentials::{CredentialKey, CredentialSource, EnvCredentials, Secret, StaticCredentials};
pub use settings::{bzsync_home, load_settings, settings_path, Settings};

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::http::{RetryPolicy, DEFAULT_MAX_PAGES};
use crate::transifex::PollSchedule;

/// Default Braze REST endpoint (US-01 cluster).
pub const DEFAULT_BRAZE_REST_ENDPOINT: &str = "https://rest.iad-01.braze.com";
/// Transifex API v3 base URL.
pub const DEFAULT_TRANSIFEX_API_BASE_URL: &str = "https://rest.api.transifex.com";
pub const DEFAULT_PARALLELISM: usize = 4;
pub const MAX_PARALLELISM: usize = 16;
pub const DEFAULT_BRAZE_PAGE_SIZE: usize = 100;
pub const DEFAULT_BRAZE_REQUEST_INTERVAL: Duration = Duration::from_millis(200);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BACKUP_TIMEOUT: Duration = Duration::from_secs(300);

/// Braze connection settings.
#[derive(Debug, Clone)]
pub struct BrazeConfig {
    pub base_url: String,
    pub api_key: Secret,
    /// Items requested per list page.
    pub page_size: usize,
    /// Pause before each Braze call. Zero disables throttling.
    pub request_interval: Duration,
}

/// Transifex connection settings.
#[derive(Debug, Clone)]
pub struct TransifexConfig {
    pub base_url: String,
    pub api_token: Secret,
    pub organization: String,
    pub project: String,
    /// Wait for each source upload job to finish and check its result.
    pub verify_uploads: bool,
    pub upload_poll: PollSchedule,
}

impl TransifexConfig {
    /// JSON:API id of the project, `o:{org}:p:{project}`.
    #[must_use]
    pub fn project_id(&self) -> String {
        format!("o:{}:p:{}", self.organization, self.project)
    }
}

/// What to do when the pre-flight backup fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackupPolicy {
    /// Abort the run before any remote mutation.
    #[default]
    FailClosed,
    /// Record a warning and sync anyway.
    FailOpen,
}

/// TMX backup settings.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    pub policy: BackupPolicy,
    pub poll: PollSchedule,
}

/// Transport-level settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub max_pages: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Everything one sync run needs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub braze: BrazeConfig,
    pub transifex: TransifexConfig,
    pub backup: BackupConfig,
    pub http: HttpConfig,
    /// Concurrent item upserts.
    pub parallelism: usize,
}

impl SyncConfig {
    /// Check invariants the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingSetting` for empty credentials or slugs, and
    /// `Error::Config` for malformed URLs or out-of-range numbers.
    pub fn validate(&self) -> Result<()> {
        require(self.braze.api_key.is_empty(), CredentialKey::BrazeApiKey)?;
        self.validate_transifex()?;
        require_http_url("Braze REST endpoint", &self.braze.base_url)?;

        if !(1..=MAX_PARALLELISM).contains(&self.parallelism) {
            return Err(Error::Config(format!(
                "parallelism must be between 1 and {MAX_PARALLELISM}, got {}",
                self.parallelism
            )));
        }
        if self.braze.page_size == 0 {
            return Err(Error::Config("braze_page_size must be at least 1".into()));
        }

        Ok(())
    }

    /// The subset of [`validate`](Self::validate) a backup-only run needs.
    ///
    /// # Errors
    ///
    /// Same as [`validate`](Self::validate), for the Transifex settings.
    pub fn validate_transifex(&self) -> Result<()> {
        require(self.transifex.api_token.is_empty(), CredentialKey::TransifexApiToken)?;
        require(self.transifex.organization.is_empty(), CredentialKey::TransifexOrganizationSlug)?;
        require(self.transifex.project.is_empty(), CredentialKey::TransifexProjectSlug)?;
        require_http_url("Transifex API base URL", &self.transifex.base_url)
    }

    /// Resolved settings with secrets masked, for `bzsync config show`.
    #[must_use]
    pub fn redacted_json(&self) -> serde_json::Value {
        let mask = |s: &Secret| {
            if s.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::Value::String("[REDACTED]".into())
            }
        };
        serde_json::json!({
            "braze": {
                "rest_endpoint": self.braze.base_url,
                "api_key": mask(&self.braze.api_key),
                "page_size": self.braze.page_size,
                "request_interval_ms": duration_ms(self.braze.request_interval),
            },
            "transifex": {
                "api_base_url": self.transifex.base_url,
                "api_token": mask(&self.transifex.api_token),
                "organization_slug": self.transifex.organization,
                "project_slug": self.transifex.project,
                "verify_uploads": self.transifex.verify_uploads,
            },
            "backup": {
                "enabled": self.backup.enabled,
                "directory": self.backup.directory.display().to_string(),
                "fail_open": self.backup.policy == BackupPolicy::FailOpen,
                "timeout_secs": self.backup.poll.timeout.as_secs(),
            },
            "http": {
                "timeout_secs": self.http.timeout.as_secs(),
                "max_attempts": self.http.retry.max_attempts,
                "max_pages": self.http.max_pages,
            },
            "parallelism": self.parallelism,
        })
    }
}

fn require(missing: bool, key: CredentialKey) -> Result<()> {
    if missing {
        return Err(Error::MissingSetting {
            setting: key.setting(),
            env_var: key.env_var(),
        });
    }
    Ok(())
}

fn require_http_url(name: &str, url: &str) -> Result<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{name} must start with http:// or https://, got '{url}'"
        )))
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backup_enabled: Option<bool>,
    pub backup_dir: Option<PathBuf>,
    pub fail_open: Option<bool>,
    pub parallelism: Option<usize>,
    pub verify_uploads: Option<bool>,
}

/// Default backup directory: the user's Downloads folder, else `~/.bzsync/backups`.
#[must_use]
pub fn default_backup_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|u| u.download_dir().map(PathBuf::from))
        .or_else(|| bzsync_home().map(|h| h.join("backups")))
        .unwrap_or_else(|| PathBuf::from("backups"))
}

fn pick(
    creds: &dyn CredentialSource,
    key: CredentialKey,
    from_file: Option<&String>,
) -> Option<String> {
    creds
        .get(key)
        .or_else(|| from_file.map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}

/// Layer overrides, credentials, settings and defaults into a [`SyncConfig`].
///
/// The result is not validated; call [`SyncConfig::validate`] before a run.
#[must_use]
pub fn resolve_config(
    settings: &Settings,
    creds: &dyn CredentialSource,
    overrides: &Overrides,
) -> SyncConfig {
    let braze_url = pick(creds, CredentialKey::BrazeRestEndpoint, settings.braze_rest_endpoint.as_ref())
        .unwrap_or_else(|| DEFAULT_BRAZE_REST_ENDPOINT.to_string());
    let transifex_url = pick(creds, CredentialKey::TransifexApiBaseUrl, settings.transifex_api_base_url.as_ref())
        .unwrap_or_else(|| DEFAULT_TRANSIFEX_API_BASE_URL.to_string());

    let secret = |key, file: &Option<String>| {
        Secret::new(pick(creds, key, file.as_ref()).unwrap_or_default())
    };
    let plain = |key, file: &Option<String>| pick(creds, key, file.as_ref()).unwrap_or_default();

    let mut retry = RetryPolicy::default();
    if let Some(attempts) = settings.max_attempts {
        retry.max_attempts = attempts.max(1);
    }

    let backup_poll = PollSchedule {
        timeout: settings
            .backup_timeout_secs
            .map_or(DEFAULT_BACKUP_TIMEOUT, Duration::from_secs),
        ..PollSchedule::default()
    };

    let fail_open = overrides
        .fail_open
        .or(settings.backup_fail_open)
        .unwrap_or(false);

    SyncConfig {
        braze: BrazeConfig {
            base_url: braze_url.trim_end_matches('/').to_string(),
            api_key: secret(CredentialKey::BrazeApiKey, &settings.braze_api_key),
            page_size: settings.braze_page_size.unwrap_or(DEFAULT_BRAZE_PAGE_SIZE),
            request_interval: settings
                .braze_request_interval_ms
                .map_or(DEFAULT_BRAZE_REQUEST_INTERVAL, Duration::from_millis),
        },
        transifex: TransifexConfig {
            base_url: transifex_url.trim_end_matches('/').to_string(),
            api_token: secret(CredentialKey::TransifexApiToken, &settings.transifex_api_token),
            organization: plain(
                CredentialKey::TransifexOrganizationSlug,
                &settings.transifex_organization_slug,
            ),
            project: plain(CredentialKey::TransifexProjectSlug, &settings.transifex_project_slug),
            verify_uploads: overrides
                .verify_uploads
                .or(settings.verify_uploads)
                .unwrap_or(true),
            upload_poll: PollSchedule::default(),
        },
        backup: BackupConfig {
            enabled: overrides
                .backup_enabled
                .or(settings.backup_enabled)
                .unwrap_or(true),
            directory: overrides
                .backup_dir
                .clone()
                .or_else(|| settings.backup_path.clone())
                .unwrap_or_else(default_backup_dir),
            policy: if fail_open {
                BackupPolicy::FailOpen
            } else {
                BackupPolicy::FailClosed
            },
            poll: backup_poll,
        },
        http: HttpConfig {
            timeout: settings
                .request_timeout_secs
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs),
            retry,
            max_pages: settings.max_pages.unwrap_or(DEFAULT_MAX_PAGES),
        },
        parallelism: overrides
            .parallelism
            .or(settings.parallelism)
            .unwrap_or(DEFAULT_PARALLELISM),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_creds() -> StaticCredentials {
        StaticCredentials::new()
            .with(CredentialKey::BrazeApiKey, "braze-key")
            .with(CredentialKey::TransifexApiToken, "tx-token")
            .with(CredentialKey::TransifexOrganizationSlug, "acme")
            .with(CredentialKey::TransifexProjectSlug, "braze-testing")
    }

    #[test]
    fn test_defaults_apply() {
        let config = resolve_config(&Settings::default(), &full_creds(), &Overrides::default());

        assert_eq!(config.braze.base_url, DEFAULT_BRAZE_REST_ENDPOINT);
        assert_eq!(config.transifex.base_url, DEFAULT_TRANSIFEX_API_BASE_URL);
        assert!(config.backup.enabled);
        assert_eq!(config.backup.policy, BackupPolicy::FailClosed);
        assert_eq!(config.parallelism, DEFAULT_PARALLELISM);
        assert_eq!(config.http.retry.max_attempts, 3);
        assert!(config.transifex.verify_uploads);
        config.validate().unwrap();
    }

    #[test]
    fn test_credentials_beat_settings_file() {
        let settings = Settings {
            braze_api_key: Some("from-file".into()),
            braze_rest_endpoint: Some("https://rest.fra-01.braze.eu/".into()),
            ..Settings::default()
        };
        let config = resolve_config(&settings, &full_creds(), &Overrides::default());

        assert_eq!(config.braze.api_key.expose(), "braze-key");
        // Endpoint came from the file, trailing slash trimmed.
        assert_eq!(config.braze.base_url, "https://rest.fra-01.braze.eu");
    }

    #[test]
    fn test_overrides_beat_settings_file() {
        let settings = Settings {
            backup_enabled: Some(true),
            parallelism: Some(2),
            backup_fail_open: Some(false),
            ..Settings::default()
        };
        let overrides = Overrides {
            backup_enabled: Some(false),
            parallelism: Some(8),
            fail_open: Some(true),
            ..Overrides::default()
        };
        let config = resolve_config(&settings, &full_creds(), &overrides);

        assert!(!config.backup.enabled);
        assert_eq!(config.parallelism, 8);
        assert_eq!(config.backup.policy, BackupPolicy::FailOpen);
    }

    #[test]
    fn test_missing_credentials_fail_validation() {
        let creds = StaticCredentials::new().with(CredentialKey::BrazeApiKey, "k");
        let config = resolve_config(&Settings::default(), &creds, &Overrides::default());

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::MissingSetting {
                env_var: "TRANSIFEX_API_TOKEN",
                ..
            }
        ));
    }

    #[test]
    fn test_parallelism_bounds() {
        let overrides = Overrides {
            parallelism: Some(0),
            ..Overrides::default()
        };
        let config = resolve_config(&Settings::default(), &full_creds(), &overrides);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_url_fails_validation() {
        let creds = full_creds().with(CredentialKey::BrazeRestEndpoint, "rest.braze.com");
        let config = resolve_config(&Settings::default(), &creds, &Overrides::default());
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_redacted_json_hides_secrets() {
        let config = resolve_config(&Settings::default(), &full_creds(), &Overrides::default());
        let shown = config.redacted_json().to_string();
        assert!(!shown.contains("braze-key"));
        assert!(!shown.contains("tx-token"));
        assert!(shown.contains("braze-testing"));
    }

    #[test]
    fn test_project_id_format() {
        let config = resolve_config(&Settings::default(), &full_creds(), &Overrides::default());
        assert_eq!(config.transifex.project_id(), "o:acme:p:braze-testing");
    }
}
