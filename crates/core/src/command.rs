//! Builder for the `generate.py` invocation.
//!
//! Single-GPU hosts run the script directly with CPU offloading enabled;
//! multi-GPU hosts go through `torchrun` with FSDP and sequence
//! parallelism sized to the GPU count.

use std::fmt;
use std::path::PathBuf;

use crate::error::CoreError;
use crate::request::GenerationRequest;

/// Host-specific settings that shape the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOptions {
    /// Python interpreter used for single-GPU runs.
    pub python: String,
    /// Entry point script, relative to the working directory.
    pub script: String,
    /// Directory holding one checkpoint directory per task.
    pub ckpt_root: PathBuf,
    /// Number of GPUs to spread the run across.
    pub gpus: u32,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            script: "generate.py".to_string(),
            ckpt_root: PathBuf::from("./models"),
            gpus: 1,
        }
    }
}

/// A fully resolved program + argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateCommand {
    program: String,
    args: Vec<String>,
}

impl GenerateCommand {
    /// Validate `request` and build its command line.
    pub fn new(request: &GenerationRequest, options: &CommandOptions) -> Result<Self, CoreError> {
        request.validate()?;
        if options.gpus == 0 {
            return Err(CoreError::Validation(
                "gpus must be at least 1".to_string(),
            ));
        }

        let ckpt_dir = options.ckpt_root.join(request.task.checkpoint_dir());
        let distributed = options.gpus > 1;

        let (program, mut args) = if distributed {
            (
                "torchrun".to_string(),
                vec![
                    format!("--nproc_per_node={}", options.gpus),
                    options.script.clone(),
                ],
            )
        } else {
            (options.python.clone(), vec![options.script.clone()])
        };

        push_flag(&mut args, "--task", request.task.as_str());
        push_flag(&mut args, "--size", request.size.to_string());
        push_flag(&mut args, "--ckpt_dir", ckpt_dir.to_string_lossy());
        push_flag(&mut args, "--sample_steps", request.steps.to_string());
        push_flag(&mut args, "--prompt", &request.prompt);

        if let Some(image) = &request.image {
            push_flag(&mut args, "--image", image);
        }
        if let Some(audio) = &request.audio {
            push_flag(&mut args, "--audio", audio);
        }
        if let Some(pose) = &request.pose_video {
            push_flag(&mut args, "--pose_video", pose);
        }
        if let Some(seed) = request.seed {
            push_flag(&mut args, "--base_seed", seed.to_string());
        }
        if let Some(frames) = request.frame_num {
            push_flag(&mut args, "--frame_num", frames.to_string());
        }
        if let Some(scale) = request.guide_scale {
            push_flag(&mut args, "--sample_guide_scale", scale.to_string());
        }

        if distributed {
            args.push("--dit_fsdp".to_string());
            args.push("--t5_fsdp".to_string());
            args.push(format!("--ulysses_size={}", options.gpus));
        } else {
            push_flag(&mut args, "--offload_model", "True");
            args.push("--convert_model_dtype".to_string());
            args.push("--t5_cpu".to_string());
        }

        if let Some(extend) = &request.prompt_extend {
            args.push("--use_prompt_extend".to_string());
            push_flag(&mut args, "--prompt_extend_method", extend.method.as_str());
            if let Some(model) = &extend.model {
                push_flag(&mut args, "--prompt_extend_model", model);
            }
            push_flag(
                &mut args,
                "--prompt_extend_target_lang",
                extend.target_lang.as_str(),
            );
        }

        Ok(Self { program, args })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Renders the command as a copy-pasteable shell line.
impl fmt::Display for GenerateCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            f.write_str(" ")?;
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || "'\"$`\\".contains(c)) {
                write!(f, "'{}'", arg.replace('\'', r"'\''"))?;
            } else {
                f.write_str(arg)?;
            }
        }
        Ok(())
    }
}

fn push_flag(args: &mut Vec<String>, flag: &str, value: impl AsRef<str>) {
    args.push(flag.to_string());
    args.push(value.as_ref().to_string());
}
