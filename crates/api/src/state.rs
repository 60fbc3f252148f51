use std::sync::Arc;

use genvid_worker::Generator;
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::store::JobStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Job records, one writer per job.
    pub store: Arc<JobStore>,
    /// Runs one generation to completion.
    pub generator: Arc<dyn Generator>,
    /// Bounds how many generations run at once.
    pub permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: ServerConfig, generator: Arc<dyn Generator>) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let store = Arc::new(JobStore::with_retention(config.retained_jobs));
        Self {
            config: Arc::new(config),
            store,
            generator,
            permits,
        }
    }
}
