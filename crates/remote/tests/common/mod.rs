#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use genvid_core::request::GenerationRequest;
use genvid_core::types::JobId;
use genvid_remote::backend::{JobBackend, StatusReport};
use genvid_remote::error::BackendError;
use serde_json::json;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const JOB_ID: &str = "job-e1";

/// One scripted answer to a status query.
pub enum Step {
    Status(StatusReport),
    /// The status request itself fails (connection refused).
    Transient,
    /// The status request is never answered.
    Hang,
}

/// In-memory backend that replays a fixed status script.
///
/// When the script runs out, the last step is repeated.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Option<StatusReport>>,
    submit_result: Mutex<Option<Result<JobId, BackendError>>>,
    references: HashMap<String, Vec<u8>>,
    pub submits: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub fetches: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            submit_result: Mutex::new(None),
            references: HashMap::new(),
            submits: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing_submit(self, err: BackendError) -> Self {
        *self.submit_result.lock().unwrap() = Some(Err(err));
        self
    }

    pub fn with_reference(mut self, locator: &str, bytes: &[u8]) -> Self {
        self.references.insert(locator.to_string(), bytes.to_vec());
        self
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn submit(&self, _request: &GenerationRequest) -> Result<JobId, BackendError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        match self.submit_result.lock().unwrap().take() {
            Some(result) => result,
            None => Ok(JOB_ID.to_string()),
        }
    }

    async fn status(&self, _job_id: &str) -> Result<StatusReport, BackendError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Status(report)) => {
                *self.last.lock().unwrap() = Some(report.clone());
                Ok(report)
            }
            Some(Step::Transient) => Err(BackendError::Api {
                status: 503,
                body: "connection refused".into(),
            }),
            Some(Step::Hang) => std::future::pending().await,
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| BackendError::NotFound(JOB_ID.into())),
        }
    }

    async fn fetch_reference(
        &self,
        _job_id: &str,
        locator: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, BackendError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let bytes = self
            .references
            .get(locator)
            .ok_or_else(|| BackendError::NotFound(locator.to_string()))?;
        sink.write_all(bytes).await?;
        Ok(bytes.len() as u64)
    }
}

pub fn status(label: &str) -> Step {
    Step::Status(StatusReport::new(JOB_ID, label))
}

pub fn completed_inline(bytes: &[u8]) -> Step {
    Step::Status(StatusReport::new(JOB_ID, "COMPLETED").with_output(json!({
        "status": "success",
        "video_data": STANDARD.encode(bytes),
        "video_filename": "clip.mp4",
    })))
}

pub fn completed_with(output: serde_json::Value) -> Step {
    Step::Status(StatusReport::new(JOB_ID, "COMPLETED").with_output(output))
}

pub fn failed(error: &str) -> Step {
    Step::Status(StatusReport::new(JOB_ID, "FAILED").with_error(error))
}
