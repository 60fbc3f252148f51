//! Submit, wait and fetch composed into one call.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use genvid_core::job::{ArtifactRef, Job};
use genvid_core::request::GenerationRequest;
use genvid_core::types::JobId;

use crate::backend::JobBackend;
use crate::error::LifecycleError;
use crate::fetcher::ArtifactFetcher;
use crate::poller::{JobPoller, PollConfig};
use crate::submitter::JobSubmitter;

/// Outcome of a successful end-to-end run.
#[derive(Debug, Clone)]
pub struct GeneratedVideo {
    pub job_id: JobId,
    /// The completed job, with its artifact pointing at `path`.
    pub job: Job,
    pub path: PathBuf,
    pub bytes: u64,
    pub polls: u32,
    /// Time from first poll to the terminal status.
    pub elapsed: Duration,
}

pub struct JobLifecycle<B: ?Sized> {
    submitter: JobSubmitter<B>,
    poller: JobPoller<B>,
    fetcher: ArtifactFetcher<B>,
}

impl<B: JobBackend + ?Sized> JobLifecycle<B> {
    pub fn new(backend: Arc<B>, poll: PollConfig) -> Self {
        Self {
            submitter: JobSubmitter::new(Arc::clone(&backend)),
            poller: JobPoller::new(Arc::clone(&backend), poll),
            fetcher: ArtifactFetcher::new(backend),
        }
    }

    pub fn submitter(&self) -> &JobSubmitter<B> {
        &self.submitter
    }

    pub fn poller(&self) -> &JobPoller<B> {
        &self.poller
    }

    pub fn fetcher(&self) -> &ArtifactFetcher<B> {
        &self.fetcher
    }

    /// Run one request to completion and save the video under `dest_dir`.
    ///
    /// Dropping the returned future abandons the wait locally; the remote
    /// job is not cancelled.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        dest_dir: &Path,
    ) -> Result<GeneratedVideo, LifecycleError> {
        let job = self.submitter.submit(request).await?;
        self.complete(job, dest_dir).await
    }

    /// Wait for an already submitted job and save its video under `dest_dir`.
    ///
    /// The returned job record points at the local file.
    pub async fn complete(&self, job: Job, dest_dir: &Path) -> Result<GeneratedVideo, LifecycleError> {
        let completed = self.poller.wait(job).await?;
        let saved = self
            .fetcher
            .fetch(&completed.job.id, &completed.output, dest_dir)
            .await?;

        let mut job = completed.job;
        if let Err(e) = job.attach_artifact(ArtifactRef::Local {
            path: saved.path.to_string_lossy().into_owned(),
        }) {
            tracing::debug!(job_id = %job.id, error = %e, "Artifact not recorded on job");
        }

        Ok(GeneratedVideo {
            job_id: job.id.clone(),
            job,
            path: saved.path,
            bytes: saved.bytes,
            polls: completed.polls,
            elapsed: completed.elapsed,
        })
    }
}
