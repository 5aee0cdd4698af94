//! Pre-flight TMX backup of the whole Transifex project.
//!
//! The export runs as an async job: request it, poll until it is ready,
//! download the document, then write it next to earlier backups without
//! ever replacing one.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::{BackupConfig, TransifexConfig};
use crate::error::{Error, Result};
use crate::http::{ApiClient, ApiRequest, Transport};
use crate::model::{BackupArtifact, BackupResult};
use crate::sync::CancelToken;

use super::jobs::{poll_until, JobState};
use super::payload;

/// Timestamp embedded in backup file names.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Exports the project TMX before a sync touches anything.
pub struct BackupService<T: Transport> {
    client: ApiClient<T>,
    project_id: String,
    project_slug: String,
    config: BackupConfig,
}

impl<T: Transport> BackupService<T> {
    #[must_use]
    pub fn new(client: ApiClient<T>, transifex: &TransifexConfig, config: &BackupConfig) -> Self {
        Self {
            client,
            project_id: transifex.project_id(),
            project_slug: transifex.project.clone(),
            config: config.clone(),
        }
    }

    /// Run the backup unless it is disabled.
    ///
    /// Export and write failures come back as `BackupResult::Failed`; the
    /// caller decides whether that stops the run.
    ///
    /// # Errors
    ///
    /// Returns `Error::Auth` if Transifex rejects the token, and
    /// `Error::Cancelled` if `cancel` fires while waiting for the export.
    pub async fn backup_if_enabled(&self, cancel: &CancelToken) -> Result<BackupResult> {
        if !self.config.enabled {
            info!("TMX backup disabled");
            return Ok(BackupResult::Disabled);
        }

        match self.backup(cancel).await {
            Ok(artifact) => Ok(BackupResult::Saved(artifact)),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(error = %err, "TMX backup failed");
                Ok(BackupResult::Failed {
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Export, download and save the TMX file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Backup` if Transifex reports the export failed,
    /// `Error::FileIo` if the file cannot be written, and any request error.
    pub async fn backup(&self, cancel: &CancelToken) -> Result<BackupArtifact> {
        info!(project = %self.project_id, "Requesting TMX export");
        let request = self
            .client
            .request(Method::POST, "/tmx_async_downloads")
            .json(payload::tmx_download(&self.project_id));
        let job = payload::data_id(&self.client.send_json(request).await?)?;
        info!(job = %job, "TMX export job started");

        let document = poll_until(&self.config.poll, Some(cancel), "TMX export", || {
            self.export_state(&job)
        })
        .await?;

        let artifact = write_backup(&self.config.directory, &self.project_slug, &document, Utc::now())?;
        info!(path = %artifact.path.display(), bytes = artifact.bytes, "Backup saved");
        Ok(artifact)
    }

    async fn export_state(&self, job: &str) -> Result<JobState<Vec<u8>>> {
        let request = self
            .client
            .request(Method::GET, &format!("/tmx_async_downloads/{job}"));
        let response = self.client.send(request).await?;

        if response.body.is_empty() {
            return Err(Error::Backup("export status response was empty".into()));
        }

        // Once the export is ready the status URL may serve the file itself.
        let Ok(doc) = serde_json::from_slice::<Value>(&response.body) else {
            info!("Status endpoint returned the TMX document");
            return Ok(JobState::Done(response.body));
        };

        match payload::job_status(&doc) {
            Some("completed") => {
                let link = doc["data"]["links"]["download"].as_str().ok_or_else(|| {
                    Error::Backup("completed export has no download link".into())
                })?;
                let file = self
                    .client
                    .send_unauthenticated(ApiRequest::get(link))
                    .await?;
                if file.body.is_empty() {
                    return Err(Error::Backup("downloaded TMX document is empty".into()));
                }
                Ok(JobState::Done(file.body))
            }
            Some("failed") => Err(Error::Backup(format!(
                "Transifex reported the TMX export failed: {}",
                payload::job_errors(&doc)
            ))),
            Some(status) => Ok(JobState::Pending(status.to_string())),
            None => Err(Error::Backup("export status response has no status".into())),
        }
    }
}

/// Reserve the first free `{slug}-{timestamp}.tmx` name in `dir`, adding
/// `-1`, `-2`, ... when earlier backups already took it.
///
/// The name is claimed by creating an empty file with `create_new`, so two
/// writers can never end up with the same path.
///
/// # Errors
///
/// Returns `Error::FileIo` if a candidate cannot be created for any reason
/// other than already existing.
pub fn claim_backup_path(dir: &Path, project_slug: &str, now: DateTime<Utc>) -> Result<PathBuf> {
    let stem = format!("{project_slug}-{}", now.format(BACKUP_TIMESTAMP_FORMAT));
    let mut n = 0;
    loop {
        let candidate = if n == 0 {
            dir.join(format!("{stem}.tmx"))
        } else {
            dir.join(format!("{stem}-{n}.tmx"))
        };
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(source) => {
                return Err(Error::FileIo {
                    path: candidate,
                    source,
                });
            }
        }
    }
}

/// Write `content` as a new backup file.
///
/// The data goes to a temporary sibling first, is synced to disk, then
/// renamed over the claimed name, so a partial file never carries the final
/// name. On failure neither file is left behind.
///
/// # Errors
///
/// Returns `Error::FileIo` if the directory or file cannot be written.
pub fn write_backup(
    dir: &Path,
    project_slug: &str,
    content: &[u8],
    now: DateTime<Utc>,
) -> Result<BackupArtifact> {
    fs::create_dir_all(dir).map_err(|source| Error::FileIo {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = claim_backup_path(dir, project_slug, now)?;
    let temp_path = path.with_extension("tmx.part");

    let written = write_synced(&temp_path, content).and_then(|()| {
        fs::rename(&temp_path, &path).map_err(|source| Error::FileIo {
            path: path.clone(),
            source,
        })
    });
    if let Err(err) = written {
        let _ = fs::remove_file(&temp_path);
        let _ = fs::remove_file(&path);
        return Err(err);
    }

    Ok(BackupArtifact {
        path,
        bytes: content.len() as u64,
        sha256: format!("{:x}", Sha256::digest(content)),
    })
}

fn write_synced(path: &Path, content: &[u8]) -> Result<()> {
    let io_err = |source: std::io::Error| Error::FileIo {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content).map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    writer.get_ref().sync_all().map_err(io_err)
}
