//! In-memory job records with one writer per job.
//!
//! Every record lives in a `watch` channel. The store keeps only the
//! receiving half, so handlers can read a consistent snapshot at any time
//! but cannot modify it. The sending half is wrapped in a [`JobWriter`],
//! handed to the task that runs the job, and consumed by the terminal
//! transition.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use genvid_core::job::JobStatus;
use genvid_core::request::GenerationRequest;
use genvid_core::resolution::Resolution;
use genvid_core::task::Task;
use genvid_core::types::{JobId, Timestamp};
use serde::Serialize;
use tokio::sync::{watch, RwLock};

/// Snapshot of one job as reported by `GET /status/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    pub prompt: String,
    pub task: Task,
    pub size: Resolution,
    pub steps: u32,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    /// Running time so far, or total running time once finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
    /// Path of the produced video.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    fn queued(id: JobId, request: &GenerationRequest) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            prompt: request.prompt.clone(),
            task: request.task,
            size: request.size,
            steps: request.steps,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            elapsed_seconds: None,
            output: None,
            error: None,
        }
    }

    fn with_elapsed(mut self, now: Timestamp) -> Self {
        if let Some(started) = self.started_at {
            let end = self.completed_at.unwrap_or(now);
            self.elapsed_seconds = Some((end - started).num_milliseconds() as f64 / 1000.0);
        }
        self
    }
}

/// Finished jobs kept by default before the oldest are forgotten.
pub const DEFAULT_RETAINED_JOBS: usize = 500;

/// All jobs known to this server process.
///
/// Queued and running jobs are always kept. Of the finished ones only the
/// most recent `retain_finished` are; older records are dropped on insert.
#[derive(Debug)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, watch::Receiver<JobRecord>>>,
    retain_finished: usize,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETAINED_JOBS)
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retain_finished: usize) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            retain_finished,
        }
    }

    /// Register a new QUEUED job and return its only writer.
    pub async fn insert(&self, id: JobId, request: &GenerationRequest) -> JobWriter {
        let (tx, rx) = watch::channel(JobRecord::queued(id.clone(), request));
        let mut jobs = self.jobs.write().await;
        jobs.insert(id, rx);
        self.evict_finished(&mut jobs);
        JobWriter {
            tx,
            finished: false,
        }
    }

    fn evict_finished(&self, jobs: &mut HashMap<JobId, watch::Receiver<JobRecord>>) {
        let mut finished: Vec<(Timestamp, JobId)> = jobs
            .values()
            .filter_map(|rx| {
                let record = rx.borrow();
                record
                    .status
                    .is_terminal()
                    .then(|| (record.completed_at.unwrap_or(record.created_at), record.id.clone()))
            })
            .collect();
        if finished.len() <= self.retain_finished {
            return;
        }

        finished.sort();
        let excess = finished.len() - self.retain_finished;
        for (_, id) in finished.into_iter().take(excess) {
            jobs.remove(&id);
        }
        tracing::debug!(evicted = excess, "Forgot oldest finished jobs");
    }

    pub async fn get(&self, id: &str) -> Option<JobRecord> {
        let jobs = self.jobs.read().await;
        let rx = jobs.get(id)?;
        let record = rx.borrow().clone();
        Some(record.with_elapsed(Utc::now()))
    }

    /// Receiver that observes every update of one job.
    #[cfg(test)]
    pub async fn subscribe(&self, id: &str) -> Option<watch::Receiver<JobRecord>> {
        self.jobs.read().await.get(id).cloned()
    }

    /// All jobs, newest first.
    pub async fn list(&self) -> Vec<JobRecord> {
        let now = Utc::now();
        let mut records: Vec<JobRecord> = self
            .jobs
            .read()
            .await
            .values()
            .map(|rx| rx.borrow().clone().with_elapsed(now))
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Number of jobs that are queued or running.
    pub async fn active_count(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|rx| rx.borrow().status.is_active())
            .count()
    }
}

/// Exclusive write access to one job record.
///
/// Not `Clone`. [`complete`](Self::complete) and [`fail`](Self::fail)
/// consume the writer, so a terminal record cannot be changed again. A
/// writer dropped before either is called marks the job failed.
#[derive(Debug)]
pub struct JobWriter {
    tx: watch::Sender<JobRecord>,
    finished: bool,
}

impl JobWriter {
    pub fn id(&self) -> JobId {
        self.tx.borrow().id.clone()
    }

    pub fn mark_running(&mut self) {
        self.tx.send_modify(|r| {
            r.status = JobStatus::Running;
            r.started_at = Some(Utc::now());
        });
    }

    pub fn complete(mut self, output: PathBuf) {
        self.finish(JobStatus::Completed, Some(output.display().to_string()), None);
    }

    pub fn fail(mut self, error: impl Into<String>) {
        self.finish(JobStatus::Failed, None, Some(error.into()));
    }

    fn finish(&mut self, status: JobStatus, output: Option<String>, error: Option<String>) {
        self.finished = true;
        self.tx.send_modify(|r| {
            r.status = status;
            r.completed_at = Some(Utc::now());
            r.output = output;
            r.error = error;
        });
    }
}

impl Drop for JobWriter {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(
                JobStatus::Failed,
                None,
                Some("Job task ended before reporting a result".to_string()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest::new("a paper boat", Task::TextImageToVideo)
    }

    #[tokio::test]
    async fn new_job_is_queued() {
        let store = JobStore::new();
        let _writer = store.insert("j1".into(), &request()).await;

        let record = store.get("j1").await.unwrap();
        assert_eq!(record.status, JobStatus::Queued);
        assert_eq!(record.task, Task::TextImageToVideo);
        assert!(record.elapsed_seconds.is_none());
        assert_eq!(store.active_count().await, 1);
    }

    #[tokio::test]
    async fn writer_updates_are_visible_to_readers() {
        let store = JobStore::new();
        let mut writer = store.insert("j1".into(), &request()).await;
        let mut rx = store.subscribe("j1").await.unwrap();

        writer.mark_running();
        assert_eq!(store.get("j1").await.unwrap().status, JobStatus::Running);

        writer.complete(PathBuf::from("/out/j1.mp4"));
        rx.changed().await.unwrap();
        let record = rx.borrow().clone();
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.output.as_deref(), Some("/out/j1.mp4"));
        assert!(record.completed_at.is_some());
        assert_eq!(store.active_count().await, 0);
    }

    #[tokio::test]
    async fn dropped_writer_fails_the_job() {
        let store = JobStore::new();
        let writer = store.insert("j1".into(), &request()).await;
        drop(writer);

        let record = store.get("j1").await.unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.error.is_some());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = JobStore::new();
        let _a = store.insert("a".into(), &request()).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let _b = store.insert("b".into(), &request()).await;

        let ids: Vec<_> = store.list().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn oldest_finished_jobs_are_evicted() {
        let store = JobStore::with_retention(2);
        for id in ["a", "b", "c"] {
            let writer = store.insert(id.into(), &request()).await;
            writer.complete(PathBuf::from(format!("/out/{id}.mp4")));
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let _running = store.insert("d".into(), &request()).await;

        assert!(store.get("a").await.is_none());
        assert!(store.get("b").await.is_some());
        assert!(store.get("c").await.is_some());
        assert!(store.get("d").await.is_some());
    }

    #[tokio::test]
    async fn active_jobs_are_never_evicted() {
        let store = JobStore::with_retention(0);
        let _a = store.insert("a".into(), &request()).await;
        let _b = store.insert("b".into(), &request()).await;

        assert_eq!(store.active_count().await, 2);
    }

    #[tokio::test]
    async fn unknown_job_is_none() {
        assert!(JobStore::new().get("missing").await.is_none());
    }
}
