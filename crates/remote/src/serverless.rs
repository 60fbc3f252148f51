//! Client for a serverless GPU endpoint (RunPod v2 API).
//!
//! Jobs are submitted to `POST {base}/{endpoint}/run` and observed via
//! `GET {base}/{endpoint}/status/{id}`. The endpoint queues the job, cold
//! starts a worker if none is warm, and reports the handler's return
//! value as the job's `output` once it finishes.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use genvid_core::request::GenerationRequest;
use genvid_core::types::JobId;
use serde::Deserialize;
use tokio::io::AsyncWrite;

use crate::backend::{JobBackend, StatusReport};
use crate::error::BackendError;
use crate::http::{is_url, parse_response, stream_body};

/// Default RunPod API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.runpod.ai/v2";

/// Connection settings for one serverless endpoint.
#[derive(Debug, Clone)]
pub struct ServerlessConfig {
    pub base_url: String,
    pub endpoint_id: String,
    pub api_key: String,
    /// Per-request timeout for submission.
    pub submit_timeout: Duration,
    /// Per-request timeout for status and health reads.
    pub status_timeout: Duration,
}

impl ServerlessConfig {
    pub fn new(endpoint_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            endpoint_id: endpoint_id.into(),
            api_key: api_key.into(),
            submit_timeout: Duration::from_secs(30),
            status_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Raw status response. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    /// Milliseconds spent queued, reported by the endpoint.
    #[serde(default)]
    delay_time: Option<u64>,
    /// Milliseconds spent executing.
    #[serde(default)]
    execution_time: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    #[serde(default)]
    id: Option<String>,
}

/// Job counters reported by the endpoint health check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCounts {
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub in_progress: u64,
    #[serde(default)]
    pub in_queue: u64,
    #[serde(default)]
    pub retried: u64,
}

/// Worker counters reported by the endpoint health check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerCounts {
    #[serde(default)]
    pub idle: u64,
    #[serde(default)]
    pub running: u64,
    #[serde(default)]
    pub initializing: u64,
    #[serde(default)]
    pub ready: u64,
    #[serde(default)]
    pub throttled: u64,
    #[serde(default)]
    pub unhealthy: u64,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EndpointHealth {
    #[serde(default)]
    pub jobs: JobCounts,
    #[serde(default)]
    pub workers: WorkerCounts,
}

impl EndpointHealth {
    /// True when no worker is up, so the next job pays a cold start.
    pub fn is_cold(&self) -> bool {
        self.workers.idle == 0 && self.workers.running == 0 && self.workers.ready == 0
    }
}

/// HTTP client for one serverless endpoint.
pub struct ServerlessBackend {
    client: reqwest::Client,
    config: ServerlessConfig,
}

impl ServerlessBackend {
    pub fn new(config: ServerlessConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, config: ServerlessConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ServerlessConfig {
        &self.config
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.endpoint_id,
            path
        )
    }

    /// Query worker and queue counters for the endpoint.
    pub async fn health(&self) -> Result<EndpointHealth, BackendError> {
        let response = self
            .client
            .get(self.endpoint_url("health"))
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.status_timeout)
            .send()
            .await?;

        parse_response(response).await
    }
}

#[async_trait]
impl JobBackend for ServerlessBackend {
    fn name(&self) -> &'static str {
        "serverless"
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<JobId, BackendError> {
        let body = serde_json::json!({ "input": request });

        let response = self
            .client
            .post(self.endpoint_url("run"))
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.submit_timeout)
            .json(&body)
            .send()
            .await?;

        let run: RunResponse = parse_response(response).await?;
        run.id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BackendError::Decode("run response has no job id".to_string()))
    }

    async fn status(&self, job_id: &str) -> Result<StatusReport, BackendError> {
        let response = self
            .client
            .get(self.endpoint_url(&format!("status/{job_id}")))
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.status_timeout)
            .send()
            .await?;

        let raw: StatusResponse = parse_response(response).await?;
        let label = raw
            .status
            .ok_or_else(|| BackendError::Decode("status response has no status".to_string()))?;

        tracing::trace!(
            job_id,
            status = %label,
            delay_ms = raw.delay_time,
            execution_ms = raw.execution_time,
            "Serverless status read",
        );

        let mut report = StatusReport::new(raw.id.unwrap_or_else(|| job_id.to_string()), label);
        report.output = raw.output;
        report.error = raw.error.filter(|e| !e.is_null()).map(|e| match e {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        Ok(report)
    }

    async fn fetch_reference(
        &self,
        job_id: &str,
        locator: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, BackendError> {
        if is_url(locator) {
            // Artifact URLs are pre-signed; the API key is not sent.
            let response = self.client.get(locator).send().await?;
            return stream_body(response, sink).await;
        }

        let path = Path::new(locator);
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(BackendError::NotFound(format!(
                "Video for job {job_id} is at '{locator}', which is neither a URL nor a readable path"
            )));
        }

        let mut file = tokio::fs::File::open(path).await?;
        let copied = tokio::io::copy(&mut file, sink).await?;
        Ok(copied)
    }
}
