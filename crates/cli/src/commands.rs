use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use genvid_core::command::{CommandOptions, GenerateCommand};
use genvid_core::request::GenerationRequest;
use genvid_remote::backend::JobBackend;
use genvid_remote::lifecycle::JobLifecycle;
use genvid_remote::output::OutputDescriptor;

use crate::config::RemoteArgs;

/// Submit, wait and save. Ctrl-C stops waiting (exit 1) but leaves the job running.
pub async fn generate(
    remote: &RemoteArgs,
    request: &GenerationRequest,
    out: &Path,
) -> anyhow::Result<()> {
    let backend: Arc<dyn JobBackend> = remote.backend()?;
    let lifecycle = JobLifecycle::new(Arc::clone(&backend), remote.poll_config()?);

    let job = lifecycle.submitter().submit(request).await?;
    let job_id = job.id.clone();
    println!("Submitted job {job_id} ({} backend)", backend.name());

    let video = tokio::select! {
        result = lifecycle.complete(job, out) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(job_id = %job_id, "Interrupted; the remote job keeps running");
            anyhow::bail!("stopped waiting for job {job_id}; check later with `genvid status {job_id}`");
        }
    };

    println!(
        "Saved {} ({} bytes) after {}s and {} status checks",
        video.path.display(),
        video.bytes,
        video.elapsed.as_secs(),
        video.polls,
    );
    Ok(())
}

pub async fn status(remote: &RemoteArgs, job_id: &str) -> anyhow::Result<()> {
    let backend = remote.backend()?;
    let report = backend
        .status(job_id)
        .await
        .with_context(|| format!("Failed to query job {job_id}"))?;

    let class = report
        .status()
        .map(|s| s.as_str())
        .unwrap_or("UNKNOWN (still pending)");
    println!("Job:    {}", report.id);
    println!("Status: {} [{class}]", report.label);
    if let Some(error) = &report.error {
        println!("Error:  {error}");
    }
    match OutputDescriptor::parse(report.output.as_ref()) {
        OutputDescriptor::Inline { data, filename } => println!(
            "Output: inline video, {} base64 chars{}",
            data.len(),
            filename.map(|f| format!(" ({f})")).unwrap_or_default()
        ),
        OutputDescriptor::Reference { locator, .. } => println!("Output: {locator}"),
        OutputDescriptor::Failed(message) => println!("Output: handler error: {message}"),
        OutputDescriptor::Missing => {}
    }
    Ok(())
}

pub async fn health(remote: &RemoteArgs) -> anyhow::Result<()> {
    let backend = remote.serverless()?;
    let health = backend
        .health()
        .await
        .context("Failed to query endpoint health")?;

    println!("Endpoint {}", backend.config().endpoint_id);
    println!(
        "  jobs:    {} queued, {} in progress, {} completed, {} failed, {} retried",
        health.jobs.in_queue,
        health.jobs.in_progress,
        health.jobs.completed,
        health.jobs.failed,
        health.jobs.retried,
    );
    println!(
        "  workers: {} idle, {} running, {} initializing, {} throttled, {} unhealthy",
        health.workers.idle,
        health.workers.running,
        health.workers.initializing,
        health.workers.throttled,
        health.workers.unhealthy,
    );
    if health.is_cold() {
        println!("  no warm workers: the next job will wait for a cold start");
    }
    Ok(())
}

pub fn print_command(request: &GenerationRequest, options: &CommandOptions) -> anyhow::Result<()> {
    let command = GenerateCommand::new(request, options)?;
    println!("{command}");
    Ok(())
}
