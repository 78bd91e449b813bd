//! Submit-then-poll driver for job-based backends
//!
//! The poller submits a job, then sleeps and queries on a fixed interval
//! until the job reaches a terminal state or the timeout elapses. Transport
//! errors during a poll are logged and retried; everything else ends the
//! loop. Time is measured with `tokio::time::Instant` so tests can run on a
//! paused clock.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use shared::logging::Component;
use shared::{component_warn, CancellationToken, ProgressReporter};
use crate::error::{ProviderError, ProviderResult};
use crate::job::{JobPayload, JobStatus, ProviderJob};
use crate::traits::JobBackend;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);

/// Progress band reported while polling
const PROGRESS_BASE: u8 = 30;
const PROGRESS_SPAN: u8 = 60;

/// A job that finished with output
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedJob {
    pub job: ProviderJob,
    pub outputs: Vec<String>,
    pub polls: u32,
    pub elapsed: Duration,
}

/// Fixed-interval poller
#[derive(Debug, Clone)]
pub struct AsyncPoller {
    interval: Duration,
    timeout: Duration,
    cancel: Option<CancellationToken>,
}

impl Default for AsyncPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT)
    }
}

impl AsyncPoller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            cancel: None,
        }
    }

    /// Stop waiting when the token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Submit a job and wait for it to finish
    pub async fn run<B: JobBackend + ?Sized>(
        &self,
        backend: &B,
        payload: &JobPayload,
        progress: &ProgressReporter,
    ) -> ProviderResult<CompletedJob> {
        let job_id = backend.submit(payload).await?;
        debug!("📋 {} job {} submitted", backend.provider(), job_id);
        self.wait(backend, ProviderJob::submitted(job_id), progress).await
    }

    /// Poll an already-submitted job until it reaches a terminal state
    pub async fn wait<B: JobBackend + ?Sized>(
        &self,
        backend: &B,
        mut job: ProviderJob,
        progress: &ProgressReporter,
    ) -> ProviderResult<CompletedJob> {
        let provider = backend.provider();
        let start = Instant::now();
        let mut polls: u32 = 0;

        loop {
            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                return Err(ProviderError::Timeout {
                    provider: provider.to_string(),
                    job_id: job.id.clone(),
                    elapsed,
                });
            }

            self.sleep(&job).await?;
            polls += 1;

            let response = match backend.query(&job.id).await {
                Ok(response) => response,
                Err(e) if e.is_transient() => {
                    component_warn!(
                        Component::Provider(provider),
                        "Poll #{} for job {} failed, retrying: {}",
                        polls,
                        job.id,
                        e
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };

            let status = response.job_status();
            debug!("{} poll #{} for job {}: {}", provider, polls, job.id, response.status);

            match status {
                JobStatus::Completed => {
                    job.apply(JobStatus::Completed, None);
                    let outputs = response.output.unwrap_or_default();
                    if outputs.is_empty() {
                        return Err(ProviderError::data_integrity(
                            provider,
                            format!("job {} completed without output", job.id),
                        ));
                    }
                    return Ok(CompletedJob {
                        job,
                        outputs,
                        polls,
                        elapsed: start.elapsed(),
                    });
                }
                JobStatus::Failed => {
                    let message = response
                        .error_message()
                        .unwrap_or_else(|| "job failed without a message".to_string());
                    job.apply(JobStatus::Failed, Some(message.clone()));
                    return Err(ProviderError::backend(provider, message));
                }
                JobStatus::Submitted | JobStatus::Processing => {
                    job.apply(JobStatus::Processing, None);
                }
            }

            progress.report(
                &format!("Processing ({})", response.status),
                Self::progress_for(start.elapsed(), self.timeout),
            );
        }
    }

    async fn sleep(&self, job: &ProviderJob) -> ProviderResult<()> {
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => Ok(()),
                    _ = token.cancelled() => Err(ProviderError::Cancelled { job_id: job.id.clone() }),
                }
            }
            None => {
                tokio::time::sleep(self.interval).await;
                Ok(())
            }
        }
    }

    /// `30 + min(60, 60 * elapsed / timeout)`
    pub fn progress_for(elapsed: Duration, timeout: Duration) -> u8 {
        if timeout.is_zero() {
            return PROGRESS_BASE + PROGRESS_SPAN;
        }
        let ratio = elapsed.as_secs_f64() / timeout.as_secs_f64();
        let step = (ratio * PROGRESS_SPAN as f64).min(PROGRESS_SPAN as f64) as u8;
        PROGRESS_BASE + step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_band() {
        let timeout = Duration::from_secs(300);
        assert_eq!(AsyncPoller::progress_for(Duration::ZERO, timeout), 30);
        assert_eq!(AsyncPoller::progress_for(Duration::from_secs(150), timeout), 60);
        assert_eq!(AsyncPoller::progress_for(Duration::from_secs(900), timeout), 90);
    }

    #[test]
    fn test_defaults() {
        let poller = AsyncPoller::default();
        assert_eq!(poller.interval(), Duration::from_secs(5));
        assert_eq!(poller.timeout(), Duration::from_secs(300));
    }
}
