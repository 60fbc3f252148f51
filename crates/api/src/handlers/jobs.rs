//! Handlers for the generation job routes.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use genvid_core::error::CoreError;
use genvid_core::job::JobStatus;
use genvid_core::request::{GenerationRequest, PromptExtension};
use genvid_core::resolution::Resolution;
use genvid_core::task::{Task, DEFAULT_TASK};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::runner;
use crate::state::AppState;
use crate::store::JobRecord;

/// Body of `POST /generate`. Only `prompt` is required; task, size and
/// steps fall back to the task defaults.
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub prompt: String,
    #[serde(default)]
    pub task: Option<Task>,
    #[serde(default)]
    pub size: Option<Resolution>,
    #[serde(default)]
    pub steps: Option<u32>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub pose_video: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub frame_num: Option<u32>,
    #[serde(default)]
    pub guide_scale: Option<f64>,
    #[serde(default)]
    pub prompt_extend: Option<PromptExtension>,
}

impl GenerateBody {
    pub fn into_request(self) -> GenerationRequest {
        let task = self.task.unwrap_or(DEFAULT_TASK);
        let mut request = GenerationRequest::new(self.prompt, task);
        if let Some(size) = self.size {
            request.size = size;
        }
        if let Some(steps) = self.steps {
            request.steps = steps;
        }
        request.image = self.image;
        request.audio = self.audio;
        request.pose_video = self.pose_video;
        request.seed = self.seed;
        request.frame_num = self.frame_num;
        request.guide_scale = self.guide_scale;
        request.prompt_extend = self.prompt_extend;
        request
    }
}

/// Response of `POST /generate`.
#[derive(Debug, Serialize)]
pub struct Accepted {
    pub job_id: String,
    pub status: JobStatus,
    pub message: &'static str,
}

fn job_not_found(id: &str) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Job",
        id: id.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /generate
///
/// Validate the request, register a QUEUED job and start it in the
/// background. Returns 202 with the new job id.
pub async fn generate(
    State(state): State<AppState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(body) = body?;
    let request = body.into_request();
    request.validate()?;

    let job_id = uuid::Uuid::new_v4().to_string();
    let writer = state.store.insert(job_id.clone(), &request).await;
    runner::spawn_job(&state, request, writer);

    tracing::info!(job_id = %job_id, "Job accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(Accepted {
            job_id,
            status: JobStatus::Queued,
            message: "Video generation started",
        }),
    ))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /status/{id}
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<JobRecord>> {
    let record = state.store.get(&id).await.ok_or_else(|| job_not_found(&id))?;
    Ok(Json(record))
}

/// GET /jobs
///
/// All jobs known to this process, newest first.
pub async fn list_jobs(State(state): State<AppState>) -> Json<DataResponse<Vec<JobRecord>>> {
    Json(DataResponse {
        data: state.store.list().await,
    })
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

/// GET /download/{id}
///
/// Streams the produced video as an `{id}.mp4` attachment. 400 if the job
/// has not completed; 404 if the job or its file is missing.
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let record = state.store.get(&id).await.ok_or_else(|| job_not_found(&id))?;

    if record.status != JobStatus::Completed {
        return Err(AppError::BadRequest(format!(
            "Job {id} is not completed (status: {})",
            record.status
        )));
    }

    let output = record.output.ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Video for job",
            id: id.clone(),
        })
    })?;
    let path = FsPath::new(&output);

    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Video file",
                id: output.clone(),
            }));
        }
        Err(e) => return Err(AppError::InternalError(e.to_string())),
    };
    let file_size = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, file_size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{id}.mp4\""),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}
