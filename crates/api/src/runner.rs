//! One background task per accepted job.

use std::sync::Arc;

use genvid_core::request::GenerationRequest;
use genvid_worker::Generator;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::state::AppState;
use crate::store::JobWriter;

/// Start `request` in the background. The task owns `writer` and is the
/// only code that updates the job's record.
pub fn spawn_job(state: &AppState, request: GenerationRequest, writer: JobWriter) -> JoinHandle<()> {
    let generator = Arc::clone(&state.generator);
    let permits = Arc::clone(&state.permits);
    tokio::spawn(run_job(generator, permits, request, writer))
}

async fn run_job(
    generator: Arc<dyn Generator>,
    permits: Arc<Semaphore>,
    request: GenerationRequest,
    mut writer: JobWriter,
) {
    let job_id = writer.id();

    // Waiting for a permit leaves the job QUEUED.
    let _permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            writer.fail("Server is shutting down");
            return;
        }
    };

    writer.mark_running();
    tracing::info!(job_id = %job_id, task = %request.task, "Job running");

    match generator.generate(&request).await {
        Ok(path) => {
            tracing::info!(job_id = %job_id, path = %path.display(), "Job completed");
            writer.complete(path);
        }
        Err(e) => {
            tracing::warn!(job_id = %job_id, error = %e, "Job failed");
            writer.fail(e.to_string());
        }
    }
}
