use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use genvid_core::request::GenerationRequest;
use genvid_core::resolution::Resolution;
use genvid_core::task::{Task, DEFAULT_TASK};

use crate::config::RemoteArgs;

/// Submit video generation jobs and follow them to completion.
#[derive(Parser, Debug)]
#[command(name = "genvid", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub remote: RemoteArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a job, wait for it and save the video.
    Generate {
        #[command(flatten)]
        params: GenerationArgs,

        /// Directory the video is written to.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Show the current status of a job.
    Status {
        job_id: String,
    },
    /// Show worker and queue counters of the serverless endpoint.
    Health,
    /// Print the generate.py invocation for a request without running it.
    Command {
        #[command(flatten)]
        params: GenerationArgs,

        /// Python interpreter for single-GPU runs.
        #[arg(long, default_value = "python")]
        python: String,

        /// Directory holding the per-task checkpoint directories.
        #[arg(long, default_value = "./models")]
        ckpt_root: PathBuf,

        /// GPUs to spread the run across (torchrun when > 1).
        #[arg(long, default_value_t = 1)]
        gpus: u32,
    },
}

#[derive(Args, Debug, Clone)]
pub struct GenerationArgs {
    /// Text prompt describing the video.
    pub prompt: String,

    #[arg(long, default_value_t = DEFAULT_TASK)]
    pub task: Task,

    /// WIDTH*HEIGHT; defaults to the task's default size.
    #[arg(long)]
    pub size: Option<Resolution>,

    /// Sampling steps; defaults to the task's default.
    #[arg(long)]
    pub steps: Option<u32>,

    #[arg(long)]
    pub image: Option<String>,

    #[arg(long)]
    pub audio: Option<String>,

    #[arg(long)]
    pub pose_video: Option<String>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of frames (4n+1).
    #[arg(long)]
    pub frame_num: Option<u32>,

    #[arg(long)]
    pub guide_scale: Option<f64>,
}

impl GenerationArgs {
    pub fn to_request(&self) -> GenerationRequest {
        let mut request = GenerationRequest::new(self.prompt.clone(), self.task);
        if let Some(size) = self.size {
            request.size = size;
        }
        if let Some(steps) = self.steps {
            request.steps = steps;
        }
        request.image = self.image.clone();
        request.audio = self.audio.clone();
        request.pose_video = self.pose_video.clone();
        request.seed = self.seed;
        request.frame_num = self.frame_num;
        request.guide_scale = self.guide_scale;
        request
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::CommandFactory;

    use super::*;
    use crate::config::BackendKind;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_uses_task_defaults() {
        let cli = Cli::try_parse_from(["genvid", "generate", "a dragon", "--task", "t2v-A14B"]).unwrap();
        let Commands::Generate { params, out } = cli.command else {
            panic!("expected generate");
        };
        let req = params.to_request();
        assert_eq!(req.task, Task::TextToVideo);
        assert_eq!(req.size, Task::TextToVideo.default_size());
        assert_eq!(req.steps, 40);
        assert_eq!(out, PathBuf::from("."));
    }

    #[test]
    fn size_and_backend_flags_parse() {
        let cli = Cli::try_parse_from([
            "genvid",
            "generate",
            "waves",
            "--size",
            "704x1280",
            "--steps",
            "10",
            "--backend",
            "queue",
        ])
        .unwrap();
        assert_eq!(cli.remote.backend, BackendKind::Queue);
        let Commands::Generate { params, .. } = cli.command else {
            panic!("expected generate");
        };
        let req = params.to_request();
        assert_eq!(req.size, Resolution::new(704, 1280));
        assert_eq!(req.steps, 10);
    }

    #[test]
    fn unknown_task_is_a_usage_error() {
        let err = Cli::try_parse_from(["genvid", "generate", "x", "--task", "t2v-huge"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn status_takes_a_job_id() {
        let cli = Cli::try_parse_from(["genvid", "status", "abc-e1"]).unwrap();
        assert_matches!(cli.command, Commands::Status { ref job_id } if job_id == "abc-e1");
    }
}
