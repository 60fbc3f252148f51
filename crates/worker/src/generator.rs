use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use genvid_core::command::{CommandOptions, GenerateCommand};
use genvid_core::request::GenerationRequest;
use tokio::process::Command;

use crate::error::GenerationError;
use crate::outputs::OutputSnapshot;
use crate::subprocess;

/// Anything that can turn a request into a video file on local disk.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Run one generation and return the path of the produced video.
    async fn generate(&self, request: &GenerationRequest) -> Result<PathBuf, GenerationError>;
}

/// Settings for [`LocalGenerator`].
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Working directory the process is started in (the model checkout).
    pub workdir: PathBuf,
    /// Directory the produced `.mp4` lands in.
    pub output_dir: PathBuf,
    /// Interpreter, script, checkpoint root and GPU count.
    pub command: CommandOptions,
    /// Wall-clock limit for one run.
    pub timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            command: CommandOptions::default(),
            timeout: Duration::from_secs(1200),
        }
    }
}

/// Runs `generate.py` on this host.
pub struct LocalGenerator {
    config: RunnerConfig,
}

impl LocalGenerator {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }
}

#[async_trait]
impl Generator for LocalGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<PathBuf, GenerationError> {
        let invocation = GenerateCommand::new(request, &self.config.command)?;
        let snapshot = OutputSnapshot::take(&self.config.output_dir)
            .await
            .map_err(GenerationError::Spawn)?;

        tracing::info!(
            task = %request.task,
            size = %request.size,
            steps = request.steps,
            gpus = self.config.command.gpus,
            command = %invocation,
            "Starting local generation",
        );

        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.args()).current_dir(&self.config.workdir);

        let output = subprocess::run(&mut cmd, self.config.timeout).await?;
        tracing::debug!(stdout_bytes = output.stdout.len(), "Generator stdout captured");

        let video = snapshot
            .newest_since(&self.config.output_dir)
            .await
            .map_err(GenerationError::Spawn)?
            .ok_or_else(|| GenerationError::NoOutput(self.config.output_dir.display().to_string()))?;

        tracing::info!(
            path = %video.display(),
            duration_secs = output.duration.as_secs(),
            "Local generation finished",
        );
        Ok(video)
    }
}
