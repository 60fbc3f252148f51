//! Error types for the remote job lifecycle.

use std::time::Duration;

use genvid_core::error::CoreError;
use genvid_core::types::JobId;

/// Errors from a single call to a job backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, body decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint returned a non-2xx status code.
    #[error("Endpoint error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The endpoint answered 2xx but the body lacked a required field.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// The requested job or artifact does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local I/O while copying a referenced artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The five ways a job lifecycle can fail, plus local write failures.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The request was rejected locally; nothing was sent.
    #[error("ValidationError: {0}")]
    Validation(#[source] CoreError),

    /// The submission call failed. Never retried automatically.
    #[error("SubmissionError: {0}")]
    Submission(#[source] BackendError),

    /// The remote worker reported failure.
    #[error("RemoteExecutionError: job {job_id} failed: {message}")]
    RemoteExecution { job_id: JobId, message: String },

    /// Local patience ran out. The remote job is left running.
    #[error(
        "TimeoutError: job {job_id} not finished after {}s (last status: {})",
        .elapsed.as_secs(),
        .last_status.as_deref().unwrap_or("unknown")
    )]
    Timeout {
        job_id: JobId,
        elapsed: Duration,
        last_status: Option<String>,
    },

    /// The remote end reported success but delivered no usable output.
    #[error("ArtifactNotFoundError: job {job_id}: {detail}")]
    ArtifactNotFound { job_id: JobId, detail: String },

    /// Writing the artifact to the local destination failed.
    #[error("IoError: failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}

impl LifecycleError {
    /// Short category name for user-facing reports and exit summaries.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Submission(_) => "SubmissionError",
            Self::RemoteExecution { .. } => "RemoteExecutionError",
            Self::Timeout { .. } => "TimeoutError",
            Self::ArtifactNotFound { .. } => "ArtifactNotFoundError",
            Self::Io(_) => "IoError",
        }
    }
}
