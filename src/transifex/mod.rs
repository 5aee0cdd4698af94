//! Transifex API v3: resources, source strings and TMX backups.

mod backup;
mod jobs;
pub mod payload;
mod resources;

use std::sync::Arc;

pub use backup::{claim_backup_path, write_backup, BackupService, BACKUP_TIMESTAMP_FORMAT};
pub use jobs::{poll_until, JobState, PollSchedule};
pub use resources::ResourceManager;

use crate::config::{HttpConfig, TransifexConfig};
use crate::http::{ApiClient, Transport};

/// An [`ApiClient`] carrying the Transifex token and JSON:API headers.
pub fn transifex_client<T: Transport>(
    transport: Arc<T>,
    config: &TransifexConfig,
    http: &HttpConfig,
) -> ApiClient<T> {
    ApiClient::new(transport, "Transifex", &config.base_url, http.retry.clone())
        .with_bearer(config.api_token.expose())
        .with_header("Content-Type", payload::JSON_API)
        .with_header("Accept", payload::JSON_API)
}
