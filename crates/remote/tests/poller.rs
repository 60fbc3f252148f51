//! Poll loop behaviour against scripted status sequences.
//!
//! All tests run on paused tokio time, so sleeping through a 20-minute
//! deadline is instantaneous.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{completed_inline, completed_with, failed, status, ScriptedBackend, Step, JOB_ID};
use genvid_core::job::{ArtifactRef, Job, JobStatus};
use genvid_remote::error::LifecycleError;
use genvid_remote::output::OutputDescriptor;
use genvid_remote::poller::{JobPoller, PollConfig};
use serde_json::json;

fn poller(backend: &Arc<ScriptedBackend>) -> JobPoller<ScriptedBackend> {
    JobPoller::new(Arc::clone(backend), PollConfig::default())
}

// ---------------------------------------------------------------------------
// Successful completion
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn queued_running_completed_returns_inline_output() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        status("IN_QUEUE"),
        status("IN_PROGRESS"),
        status("IN_PROGRESS"),
        completed_inline(b"mp4-bytes"),
    ]));

    let done = poller(&backend).wait(Job::submitted(JOB_ID)).await.unwrap();

    assert_eq!(done.polls, 4);
    assert_eq!(backend.status_calls(), 4);
    assert!(done.elapsed >= Duration::from_secs(30));
    assert!(done.elapsed < Duration::from_secs(31));
    assert_eq!(done.job.status, JobStatus::Completed);
    assert_matches!(done.output, OutputDescriptor::Inline { .. });
}

#[tokio::test(start_paused = true)]
async fn completed_reference_is_recorded_on_the_job() {
    let backend = Arc::new(ScriptedBackend::new(vec![completed_with(json!({
        "status": "success",
        "video_url": "https://cdn.example.com/v.mp4",
    }))]));

    let done = poller(&backend).wait(Job::submitted(JOB_ID)).await.unwrap();

    assert_eq!(
        done.job.artifact,
        Some(ArtifactRef::Remote {
            locator: "https://cdn.example.com/v.mp4".into()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn unknown_labels_keep_polling() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        status("WARMING_UP"),
        status("THROTTLED"),
        completed_inline(b"x"),
    ]));

    let done = poller(&backend).wait(Job::submitted(JOB_ID)).await.unwrap();
    assert_eq!(done.polls, 3);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_counted_and_survived() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        Step::Transient,
        status("IN_QUEUE"),
        Step::Transient,
        Step::Transient,
        status("IN_PROGRESS"),
        completed_inline(b"x"),
    ]));

    let done = poller(&backend).wait(Job::submitted(JOB_ID)).await.unwrap();

    // 3 failed reads + 3 successful ones.
    assert_eq!(done.polls, 6);
    assert_eq!(backend.status_calls(), 6);
}

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn failed_status_stops_immediately() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        status("IN_QUEUE"),
        failed("CUDA out of memory"),
        status("IN_PROGRESS"),
        completed_inline(b"x"),
    ]));

    let err = poller(&backend).wait(Job::submitted(JOB_ID)).await.unwrap_err();

    assert_matches!(
        err,
        LifecycleError::RemoteExecution { ref message, .. } if message == "CUDA out of memory"
    );
    assert_eq!(backend.status_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_without_text_reports_unknown_error() {
    let backend = Arc::new(ScriptedBackend::new(vec![status("FAILED")]));

    let err = poller(&backend).wait(Job::submitted(JOB_ID)).await.unwrap_err();
    assert_matches!(
        err,
        LifecycleError::RemoteExecution { ref message, .. } if message == "Unknown error"
    );
}

#[tokio::test(start_paused = true)]
async fn completed_with_handler_error_is_remote_failure() {
    let backend = Arc::new(ScriptedBackend::new(vec![completed_with(json!({
        "error": "Video generation failed",
        "stderr": "Traceback ..."
    }))]));

    let err = poller(&backend).wait(Job::submitted(JOB_ID)).await.unwrap_err();
    assert_eq!(err.category(), "RemoteExecutionError");
    assert_eq!(backend.status_calls(), 1);
}

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn never_finishing_job_times_out_near_deadline() {
    let backend = Arc::new(ScriptedBackend::new(vec![status("IN_PROGRESS")]));
    let config = PollConfig {
        interval: Duration::from_secs(10),
        deadline: Duration::from_secs(95),
    };
    let poller = JobPoller::new(Arc::clone(&backend), config);

    let err = poller.wait(Job::submitted(JOB_ID)).await.unwrap_err();

    match err {
        LifecycleError::Timeout {
            job_id,
            elapsed,
            last_status,
        } => {
            assert_eq!(job_id, JOB_ID);
            assert!(elapsed >= config.deadline);
            assert!(elapsed < config.deadline + config.interval);
            assert_eq!(last_status.as_deref(), Some("IN_PROGRESS"));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    // Polls at 0, 10, ..., 90 and a final one at 95.
    assert_eq!(backend.status_calls(), 11);
}

#[tokio::test(start_paused = true)]
async fn transient_errors_until_deadline_time_out() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        Step::Transient,
        Step::Transient,
        Step::Transient,
        Step::Transient,
    ]));
    let config = PollConfig {
        interval: Duration::from_secs(10),
        deadline: Duration::from_secs(30),
    };

    let err = JobPoller::new(Arc::clone(&backend), config)
        .wait(Job::submitted(JOB_ID))
        .await
        .unwrap_err();

    assert_matches!(err, LifecycleError::Timeout { last_status: None, .. });
}

#[tokio::test(start_paused = true)]
async fn unanswered_status_query_is_cut_off_at_deadline() {
    let backend = Arc::new(ScriptedBackend::new(vec![Step::Hang]));
    let config = PollConfig {
        interval: Duration::from_secs(10),
        deadline: Duration::from_secs(30),
    };
    let poller = JobPoller::new(Arc::clone(&backend), config);

    let result = tokio::time::timeout(Duration::from_secs(3600), poller.wait(Job::submitted(JOB_ID)))
        .await
        .expect("wait must return on its own once the deadline passes");

    match result {
        Err(LifecycleError::Timeout {
            elapsed,
            last_status,
            ..
        }) => {
            assert!(elapsed >= config.deadline);
            assert!(elapsed < config.deadline + config.interval);
            assert_eq!(last_status, None);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(backend.status_calls(), 1);
}
