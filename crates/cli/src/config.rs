//! Connection settings, taken from flags or the environment.
//!
//! `.env` and `.runpod.env` in the working directory are loaded before
//! argument parsing, so every `env = ...` below can live in either file.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, ValueEnum};
use genvid_remote::backend::JobBackend;
use genvid_remote::poller::PollConfig;
use genvid_remote::queue::{QueueBackend, DEFAULT_QUEUE_URL};
use genvid_remote::serverless::{ServerlessBackend, ServerlessConfig, DEFAULT_API_BASE};

/// Load `.env` then `.runpod.env`. Variables already set in the process
/// environment win.
pub fn load_env_files() {
    dotenvy::dotenv().ok();
    dotenvy::from_filename(".runpod.env").ok();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Scale-to-zero serverless GPU endpoint.
    Serverless,
    /// A `genvid-api` job queue.
    Queue,
}

#[derive(Debug, Clone, Args)]
pub struct RemoteArgs {
    /// Where jobs are sent.
    #[arg(long, value_enum, default_value_t = BackendKind::Serverless, global = true)]
    pub backend: BackendKind,

    #[arg(long, env = "RUNPOD_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "RUNPOD_ENDPOINT_ID", global = true)]
    pub endpoint_id: Option<String>,

    #[arg(long, env = "RUNPOD_API_BASE", default_value = DEFAULT_API_BASE, global = true)]
    pub api_base: String,

    #[arg(long, env = "GENVID_QUEUE_URL", default_value = DEFAULT_QUEUE_URL, global = true)]
    pub queue_url: String,

    /// Seconds between status checks.
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 10, global = true)]
    pub poll_interval: u64,

    /// Seconds to wait for a job before giving up locally.
    #[arg(long, env = "JOB_DEADLINE_SECS", default_value_t = 1200, global = true)]
    pub deadline: u64,
}

impl RemoteArgs {
    pub fn poll_config(&self) -> anyhow::Result<PollConfig> {
        if self.poll_interval == 0 {
            bail!("POLL_INTERVAL_SECS must be at least 1");
        }
        Ok(PollConfig {
            interval: Duration::from_secs(self.poll_interval),
            deadline: Duration::from_secs(self.deadline),
        })
    }

    pub fn serverless(&self) -> anyhow::Result<ServerlessBackend> {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .context("RUNPOD_API_KEY is not set (flag, environment, or .runpod.env)")?;
        let endpoint_id = self
            .endpoint_id
            .clone()
            .filter(|e| !e.is_empty())
            .context("RUNPOD_ENDPOINT_ID is not set (flag, environment, or .runpod.env)")?;

        Ok(ServerlessBackend::new(
            ServerlessConfig::new(endpoint_id, api_key).with_base_url(&self.api_base),
        ))
    }

    pub fn backend(&self) -> anyhow::Result<Arc<dyn JobBackend>> {
        Ok(match self.backend {
            BackendKind::Serverless => Arc::new(self.serverless()?),
            BackendKind::Queue => Arc::new(QueueBackend::new(&self.queue_url)),
        })
    }
}
