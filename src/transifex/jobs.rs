//! Polling for Transifex async jobs (source uploads, TMX exports).

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};
use crate::sync::CancelToken;

/// Poll interval growth and overall deadline for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedule {
    /// Wait after the first poll.
    pub initial_interval: Duration,
    /// Intervals double up to this value.
    pub max_interval: Duration,
    /// Give up once this much time has passed since the first poll.
    pub timeout: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

impl PollSchedule {
    /// Wait after poll number `poll` (0-based).
    #[must_use]
    pub fn interval_after(&self, poll: u32) -> Duration {
        let factor = 2u32.saturating_pow(poll.min(16));
        self.initial_interval
            .saturating_mul(factor)
            .min(self.max_interval)
    }
}

/// What one status check found.
#[derive(Debug)]
pub enum JobState<T> {
    /// Still running; carries the reported status for logging.
    Pending(String),
    Done(T),
}

/// Call `check` until it reports `Done`, sleeping per `schedule` in between.
///
/// `cancel` is consulted before every check.
///
/// # Errors
///
/// - Whatever `check` returns
/// - `Error::Cancelled` if the token fires
/// - `Error::Transient` when the deadline passes
pub async fn poll_until<T, F, Fut>(
    schedule: &PollSchedule,
    cancel: Option<&CancelToken>,
    job: &str,
    mut check: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobState<T>>>,
{
    let started = Instant::now();
    let mut poll: u32 = 0;

    loop {
        if let Some(cancel) = cancel {
            cancel.check()?;
        }

        let status = match check().await? {
            JobState::Done(value) => return Ok(value),
            JobState::Pending(status) => status,
        };

        if started.elapsed() >= schedule.timeout {
            return Err(Error::Transient {
                service: "Transifex".into(),
                attempts: poll + 1,
                message: format!(
                    "{job} still '{status}' after {}s",
                    schedule.timeout.as_secs()
                ),
            });
        }

        let wait = schedule.interval_after(poll);
        debug!(job, status = %status, wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX), "Job not finished yet");
        crate::http::client::sleep_if_needed(wait).await;
        poll += 1;
    }
}
