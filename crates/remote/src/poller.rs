//! Fixed-interval status polling with a wall-clock deadline.
//!
//! The poller never gives up on a job because of a failed status read:
//! network errors, 5xx responses and even "not found" right after
//! submission are logged and the next tick is awaited. Only the deadline
//! ends a non-terminal wait, and a status read that never answers is cut
//! off at the deadline too. Hitting the deadline does not cancel the
//! remote job.

use std::sync::Arc;
use std::time::Duration;

use genvid_core::job::{ArtifactRef, Job, JobStatus};
use tokio::time::Instant;

use crate::backend::JobBackend;
use crate::error::LifecycleError;
use crate::output::OutputDescriptor;

/// Log an unchanged status every this many polls.
const HEARTBEAT_EVERY: u32 = 6;

/// Queue time after which a cold-start hint is logged.
const COLD_START_HINT_AFTER: Duration = Duration::from_secs(300);

/// Timing for [`JobPoller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between consecutive status queries.
    pub interval: Duration,
    /// Total time to wait for a terminal status, measured from the first poll.
    pub deadline: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            deadline: Duration::from_secs(1200),
        }
    }
}

/// A job the remote end reported as completed, with its payload.
#[derive(Debug, Clone)]
pub struct CompletedJob {
    pub job: Job,
    pub output: OutputDescriptor,
    /// Number of status queries issued.
    pub polls: u32,
    pub elapsed: Duration,
}

pub struct JobPoller<B: ?Sized> {
    backend: Arc<B>,
    config: PollConfig,
}

impl<B: JobBackend + ?Sized> JobPoller<B> {
    pub fn new(backend: Arc<B>, config: PollConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Poll until the job is terminal or the deadline passes.
    ///
    /// The first query is issued immediately. Completion whose payload
    /// reports an error is returned as [`LifecycleError::RemoteExecution`].
    pub async fn wait(&self, mut job: Job) -> Result<CompletedJob, LifecycleError> {
        let started = Instant::now();
        let mut polls: u32 = 0;
        let mut last_label: Option<String> = None;
        let mut cold_start_hinted = false;

        loop {
            polls += 1;
            let remaining = self.config.deadline.saturating_sub(started.elapsed());
            match tokio::time::timeout(remaining, self.backend.status(&job.id)).await {
                Ok(Ok(report)) => {
                    let elapsed = started.elapsed();
                    let changed = last_label.as_deref() != Some(report.label.as_str());
                    if changed || polls % HEARTBEAT_EVERY == 0 {
                        tracing::info!(
                            job_id = %job.id,
                            status = %report.label,
                            elapsed_secs = elapsed.as_secs(),
                            polls,
                            "Job status",
                        );
                    }
                    last_label = Some(report.label.clone());

                    match report.status() {
                        Some(JobStatus::Completed) => {
                            let output = OutputDescriptor::parse(report.output.as_ref());
                            if let OutputDescriptor::Failed(message) = output {
                                record(&mut job, JobStatus::Failed, None, Some(message.clone()));
                                return Err(LifecycleError::RemoteExecution {
                                    job_id: job.id,
                                    message,
                                });
                            }
                            let artifact = match &output {
                                OutputDescriptor::Reference { locator, .. } => {
                                    Some(ArtifactRef::Remote {
                                        locator: locator.clone(),
                                    })
                                }
                                _ => None,
                            };
                            record(&mut job, JobStatus::Completed, artifact, None);
                            return Ok(CompletedJob {
                                job,
                                output,
                                polls,
                                elapsed,
                            });
                        }
                        Some(JobStatus::Failed) => {
                            let message = report
                                .error
                                .clone()
                                .or_else(|| {
                                    match OutputDescriptor::parse(report.output.as_ref()) {
                                        OutputDescriptor::Failed(m) => Some(m),
                                        _ => None,
                                    }
                                })
                                .unwrap_or_else(|| "Unknown error".to_string());
                            record(&mut job, JobStatus::Failed, None, Some(message.clone()));
                            return Err(LifecycleError::RemoteExecution {
                                job_id: job.id,
                                message,
                            });
                        }
                        Some(status) => {
                            if status != job.status {
                                record(&mut job, status, None, None);
                            }
                            if status == JobStatus::Queued
                                && !cold_start_hinted
                                && elapsed >= COLD_START_HINT_AFTER
                            {
                                cold_start_hinted = true;
                                tracing::info!(
                                    job_id = %job.id,
                                    elapsed_secs = elapsed.as_secs(),
                                    "Still queued; the endpoint is probably cold starting a worker",
                                );
                            }
                        }
                        None => {
                            tracing::debug!(
                                job_id = %job.id,
                                status = %report.label,
                                "Unrecognised status, treating as pending",
                            );
                        }
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        job_id = %job.id,
                        error = %e,
                        polls,
                        "Status query failed, will retry",
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        job_id = %job.id,
                        polls,
                        "Status query still unanswered at the deadline",
                    );
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.config.deadline {
                tracing::warn!(
                    job_id = %job.id,
                    elapsed_secs = elapsed.as_secs(),
                    "Gave up waiting; remote job left running",
                );
                return Err(LifecycleError::Timeout {
                    job_id: job.id,
                    elapsed,
                    last_status: last_label,
                });
            }

            let remaining = self.config.deadline - elapsed;
            tokio::time::sleep(self.config.interval.min(remaining)).await;
        }
    }
}

fn record(job: &mut Job, status: JobStatus, artifact: Option<ArtifactRef>, error: Option<String>) {
    if let Err(e) = job.observe(status, artifact, error) {
        tracing::debug!(job_id = %job.id, error = %e, "Ignored status after terminal state");
    }
}
