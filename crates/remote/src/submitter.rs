use std::sync::Arc;

use genvid_core::job::Job;
use genvid_core::request::GenerationRequest;

use crate::backend::JobBackend;
use crate::error::LifecycleError;

/// Validates a request and hands it to a backend.
///
/// A request that fails validation produces no network traffic. A valid
/// request is sent exactly once; a failed submission is reported to the
/// caller and never retried here.
pub struct JobSubmitter<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: JobBackend + ?Sized> JobSubmitter<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn submit(&self, request: &GenerationRequest) -> Result<Job, LifecycleError> {
        request.validate().map_err(LifecycleError::Validation)?;

        let job_id = self
            .backend
            .submit(request)
            .await
            .map_err(LifecycleError::Submission)?;

        tracing::info!(
            job_id = %job_id,
            backend = self.backend.name(),
            task = %request.task,
            size = %request.size,
            steps = request.steps,
            "Job submitted",
        );

        Ok(Job::submitted(job_id))
    }
}
