//! The immutable description of one video generation attempt.
//!
//! [`GenerationRequest::validate`] is the client-side gate that runs before
//! any network call or process spawn. A request that passes it is one the
//! model's entry point will accept: the size is in the task's allow-list
//! and the auxiliary inputs match the task's rules.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::resolution::Resolution;
use crate::task::{InputRule, Task};

/// Backend used to rewrite the prompt before generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptExtendMethod {
    #[serde(rename = "dashscope")]
    DashScope,
    LocalQwen,
}

impl PromptExtendMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DashScope => "dashscope",
            Self::LocalQwen => "local_qwen",
        }
    }
}

/// Language the extended prompt is written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLang {
    #[default]
    Zh,
    En,
}

impl TargetLang {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zh => "zh",
            Self::En => "en",
        }
    }
}

/// Optional prompt-extension settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptExtension {
    pub method: PromptExtendMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub target_lang: TargetLang,
}

/// Parameters for one generation, as sent to a remote endpoint or turned
/// into a local `generate.py` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GenerationRequest {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,
    pub task: Task,
    pub size: Resolution,
    #[validate(range(min = 1, message = "steps must be a positive integer"))]
    pub steps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose_video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Must be of the form `4n + 1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_num: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(exclusive_min = 0.0, message = "guide_scale must be positive"))]
    pub guide_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_extend: Option<PromptExtension>,
}

impl GenerationRequest {
    /// A request for `task` using the task's default size and step count.
    pub fn new(prompt: impl Into<String>, task: Task) -> Self {
        Self {
            prompt: prompt.into(),
            task,
            size: task.default_size(),
            steps: task.default_steps(),
            image: None,
            audio: None,
            pose_video: None,
            seed: None,
            frame_num: None,
            guide_scale: None,
            prompt_extend: None,
        }
    }

    pub fn with_size(mut self, size: Resolution) -> Self {
        self.size = size;
        self
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_image(mut self, path: impl Into<String>) -> Self {
        self.image = Some(path.into());
        self
    }

    pub fn with_audio(mut self, path: impl Into<String>) -> Self {
        self.audio = Some(path.into());
        self
    }

    pub fn with_pose_video(mut self, path: impl Into<String>) -> Self {
        self.pose_video = Some(path.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check every client-side invariant; the first violation wins.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.prompt.trim().is_empty() {
            return Err(CoreError::Validation(
                "prompt: prompt must not be empty".to_string(),
            ));
        }
        Validate::validate(self).map_err(|errors| first_field_error(&errors))?;

        self.size.check_supported(self.task)?;

        let rules = self.task.input_rules();
        check_input("image", self.image.as_deref(), rules.image, self.task)?;
        check_input("audio", self.audio.as_deref(), rules.audio, self.task)?;
        check_input(
            "pose_video",
            self.pose_video.as_deref(),
            rules.pose_video,
            self.task,
        )?;

        if let Some(frames) = self.frame_num {
            if frames % 4 != 1 {
                return Err(CoreError::Validation(format!(
                    "frame_num: must be of the form 4n+1 (got {frames})"
                )));
            }
        }
        Ok(())
    }
}

fn check_input(
    field: &str,
    value: Option<&str>,
    rule: InputRule,
    task: Task,
) -> Result<(), CoreError> {
    let present = value.is_some_and(|v| !v.trim().is_empty());
    match (rule, present) {
        (InputRule::Required, false) => Err(CoreError::Validation(format!(
            "{field}: required for task {task}"
        ))),
        (InputRule::Forbidden, true) => Err(CoreError::Validation(format!(
            "{field}: not accepted by task {task}"
        ))),
        _ => Ok(()),
    }
}

/// Flatten `validator` output into one deterministic message.
fn first_field_error(errors: &validator::ValidationErrors) -> CoreError {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.keys().collect();
    fields.sort();

    let message = fields
        .first()
        .and_then(|field| {
            field_errors.get(*field).and_then(|list| list.first()).map(|e| {
                let detail = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{field}: {detail}")
            })
        })
        .unwrap_or_else(|| errors.to_string());

    CoreError::Validation(message)
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
