//! The seam between the lifecycle logic and a concrete remote endpoint.

use async_trait::async_trait;
use genvid_core::job::JobStatus;
use genvid_core::request::GenerationRequest;
use genvid_core::types::JobId;
use tokio::io::AsyncWrite;

use crate::error::BackendError;

/// One status read for a job, as the endpoint reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub id: JobId,
    /// The endpoint's own spelling of the status.
    pub label: String,
    /// Endpoint-specific output payload, present once the job finished.
    pub output: Option<serde_json::Value>,
    /// Failure text, if the endpoint supplied one.
    pub error: Option<String>,
}

impl StatusReport {
    pub fn new(id: impl Into<JobId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            output: None,
            error: None,
        }
    }

    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Canonical class of [`label`](Self::label), `None` if unrecognised.
    pub fn status(&self) -> Option<JobStatus> {
        JobStatus::classify(&self.label)
    }
}

/// A remote endpoint that accepts generation jobs.
///
/// Implementations issue exactly one request per call and never retry;
/// retry policy belongs to the caller.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Submit a (pre-validated) request and return the assigned job id.
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId, BackendError>;

    /// Read the current status of a job.
    async fn status(&self, job_id: &str) -> Result<StatusReport, BackendError>;

    /// Retrieve a referenced artifact and stream it into `sink`.
    ///
    /// Returns the number of bytes written.
    async fn fetch_reference(
        &self,
        job_id: &str,
        locator: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, BackendError>;
}
