use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Job routes, mounted at the root.
///
/// ```text
/// POST   /generate          -> generate
/// GET    /status/{id}       -> get_status
/// GET    /download/{id}     -> download
/// GET    /jobs              -> list_jobs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(jobs::generate))
        .route("/status/{id}", get(jobs::get_status))
        .route("/download/{id}", get(jobs::download))
        .route("/jobs", get(jobs::list_jobs))
}
