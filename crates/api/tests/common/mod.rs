#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use genvid_api::config::ServerConfig;
use genvid_api::routes;
use genvid_api::state::AppState;
use genvid_core::request::GenerationRequest;
use genvid_worker::{GenerationError, Generator, RunnerConfig};
use http_body_util::BodyExt;
use tokio::sync::Semaphore;
use tower::ServiceExt;

/// Bytes every successful fake generation writes.
pub const VIDEO_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42fake";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(output_dir: PathBuf, max_concurrent_jobs: usize) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: Vec::new(),
        request_timeout_secs: 30,
        max_concurrent_jobs,
        retained_jobs: 100,
        runner: RunnerConfig {
            workdir: output_dir.clone(),
            output_dir,
            ..Default::default()
        },
    }
}

/// Stand-in for the model. Each run waits for a permit on `gate`, then
/// writes a video named after the prompt, or fails if the prompt starts
/// with `fail:`.
pub struct FakeGenerator {
    pub output_dir: PathBuf,
    pub gate: Arc<Semaphore>,
    pub runs: AtomicUsize,
}

impl FakeGenerator {
    /// A generator that finishes immediately.
    pub fn open(output_dir: PathBuf) -> Self {
        Self::gated(output_dir, Arc::new(Semaphore::new(Semaphore::MAX_PERMITS)))
    }

    /// A generator that blocks until `gate` hands out a permit.
    pub fn gated(output_dir: PathBuf, gate: Arc<Semaphore>) -> Self {
        Self {
            output_dir,
            gate,
            runs: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<PathBuf, GenerationError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();

        if let Some(reason) = request.prompt.strip_prefix("fail:") {
            return Err(GenerationError::ExitFailure {
                exit_code: 1,
                stderr: reason.trim().to_string(),
            });
        }

        let path = self.output_dir.join(format!("{}.mp4", request.prompt.replace(' ', "_")));
        tokio::fs::write(&path, VIDEO_BYTES)
            .await
            .map_err(GenerationError::Spawn)?;
        Ok(path)
    }
}

/// Build the full application router around `generator`.
pub fn build_test_app(
    generator: Arc<dyn Generator>,
    output_dir: PathBuf,
    max_concurrent_jobs: usize,
) -> (Router, AppState) {
    let state = AppState::new(test_config(output_dir, max_concurrent_jobs), generator);
    (routes::build_app(state.clone()), state)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Submit `body` and return the new job id.
pub async fn submit(app: &Router, body: serde_json::Value) -> String {
    let response = post_json(app.clone(), "/generate", body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    body_json(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Poll `/status/{id}` until the status equals `want` (or panic after 5s).
pub async fn wait_for_status(app: &Router, id: &str, want: &str) -> serde_json::Value {
    for _ in 0..500 {
        let json = body_json(get(app.clone(), &format!("/status/{id}")).await).await;
        if json["status"] == want {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} never reached {want}");
}
