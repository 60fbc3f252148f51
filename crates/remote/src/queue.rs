//! Client for the local job-queue front-end (`genvid-api`).

use std::time::Duration;

use async_trait::async_trait;
use genvid_core::job::JobStatus;
use genvid_core::request::GenerationRequest;
use genvid_core::types::JobId;
use serde::Deserialize;
use tokio::io::AsyncWrite;

use crate::backend::{JobBackend, StatusReport};
use crate::error::BackendError;
use crate::http::{parse_response, stream_body};

/// Default address of a locally running front-end.
pub const DEFAULT_QUEUE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Deserialize)]
struct AcceptedResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for a `genvid-api` instance.
///
/// Submission and status reads carry per-request timeouts; downloads do
/// not, since a video body may take arbitrarily long to stream.
pub struct QueueBackend {
    client: reqwest::Client,
    base_url: String,
    submit_timeout: Duration,
    status_timeout: Duration,
}

impl QueueBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            submit_timeout: Duration::from_secs(30),
            status_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeouts(mut self, submit: Duration, status: Duration) -> Self {
        self.submit_timeout = submit;
        self.status_timeout = status;
        self
    }
}

fn not_found_or(err: BackendError, what: String) -> BackendError {
    match err {
        BackendError::Api { status: 404, .. } => BackendError::NotFound(what),
        other => other,
    }
}

#[async_trait]
impl JobBackend for QueueBackend {
    fn name(&self) -> &'static str {
        "queue"
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<JobId, BackendError> {
        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .timeout(self.submit_timeout)
            .json(request)
            .send()
            .await?;

        let accepted: AcceptedResponse = parse_response(response).await?;
        Ok(accepted.job_id)
    }

    async fn status(&self, job_id: &str) -> Result<StatusReport, BackendError> {
        let response = self
            .client
            .get(format!("{}/status/{job_id}", self.base_url))
            .timeout(self.status_timeout)
            .send()
            .await?;

        let raw: QueueStatus = parse_response(response)
            .await
            .map_err(|e| not_found_or(e, format!("Job {job_id}")))?;

        // A completed queue job always serves its video from /download.
        let mut report = StatusReport::new(raw.id, raw.status);
        if report.status() == Some(JobStatus::Completed) {
            report.output = Some(serde_json::json!({
                "status": "success",
                "download_url": format!("{}/download/{job_id}", self.base_url),
                "video_filename": raw.output
                    .as_deref()
                    .and_then(|p| std::path::Path::new(p).file_name())
                    .map(|n| n.to_string_lossy().into_owned()),
            }));
        }
        report.error = raw.error;
        Ok(report)
    }

    async fn fetch_reference(
        &self,
        job_id: &str,
        locator: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, BackendError> {
        let response = self.client.get(locator).send().await?;
        stream_body(response, sink)
            .await
            .map_err(|e| not_found_or(e, format!("Video for job {job_id}")))
    }
}
