//! Catalogue of the model variants the generation entry point exposes.
//!
//! Each [`Task`] carries its resolution allow-list, default sampling step
//! count, checkpoint directory and the rules for which auxiliary inputs
//! (reference image, audio track, pose video) it needs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::resolution::Resolution;

/* --------------------------------------------------------------------------
Resolution allow-lists
-------------------------------------------------------------------------- */

const SIZES_A14B: &[Resolution] = &[
    Resolution::new(720, 1280),
    Resolution::new(1280, 720),
    Resolution::new(480, 832),
    Resolution::new(832, 480),
];

const SIZES_TI2V_5B: &[Resolution] = &[Resolution::new(704, 1280), Resolution::new(1280, 704)];

const SIZES_S2V_14B: &[Resolution] = &[
    Resolution::new(720, 1280),
    Resolution::new(1280, 720),
    Resolution::new(480, 832),
    Resolution::new(832, 480),
    Resolution::new(1024, 704),
    Resolution::new(704, 1024),
    Resolution::new(704, 1280),
    Resolution::new(1280, 704),
];

const SIZES_ANIMATE_14B: &[Resolution] = &[Resolution::new(720, 1280), Resolution::new(1280, 720)];

/* --------------------------------------------------------------------------
Task
-------------------------------------------------------------------------- */

/// A selectable mode of the generative model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Task {
    /// Text-to-video, 14B mixture-of-experts.
    #[serde(rename = "t2v-A14B")]
    TextToVideo,
    /// Image-to-video, 14B mixture-of-experts.
    #[serde(rename = "i2v-A14B")]
    ImageToVideo,
    /// Combined text/image-to-video, 5B dense model.
    #[serde(rename = "ti2v-5B")]
    TextImageToVideo,
    /// Speech-to-video.
    #[serde(rename = "s2v-14B")]
    SpeechToVideo,
    /// Pose-driven character animation.
    #[serde(rename = "animate-14B")]
    Animate,
}

/// Every task, in catalogue order.
pub const ALL_TASKS: &[Task] = &[
    Task::TextToVideo,
    Task::ImageToVideo,
    Task::TextImageToVideo,
    Task::SpeechToVideo,
    Task::Animate,
];

/// Task used when a caller does not pick one.
pub const DEFAULT_TASK: Task = Task::TextImageToVideo;

/// Whether an auxiliary input must, may, or must not be supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRule {
    Required,
    Optional,
    Forbidden,
}

/// Auxiliary input rules for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRules {
    pub image: InputRule,
    pub audio: InputRule,
    pub pose_video: InputRule,
}

impl Task {
    /// Name used on the wire and on the `--task` flag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextToVideo => "t2v-A14B",
            Self::ImageToVideo => "i2v-A14B",
            Self::TextImageToVideo => "ti2v-5B",
            Self::SpeechToVideo => "s2v-14B",
            Self::Animate => "animate-14B",
        }
    }

    /// Resolutions the model accepts for this task.
    pub fn supported_sizes(self) -> &'static [Resolution] {
        match self {
            Self::TextToVideo | Self::ImageToVideo => SIZES_A14B,
            Self::TextImageToVideo => SIZES_TI2V_5B,
            Self::SpeechToVideo => SIZES_S2V_14B,
            Self::Animate => SIZES_ANIMATE_14B,
        }
    }

    /// Landscape 720p-class output where the task offers it.
    pub fn default_size(self) -> Resolution {
        match self {
            Self::TextImageToVideo => Resolution::new(1280, 704),
            Self::TextToVideo | Self::ImageToVideo | Self::SpeechToVideo | Self::Animate => {
                Resolution::new(1280, 720)
            }
        }
    }

    /// Sampling steps the model's own config uses when none are given.
    pub fn default_steps(self) -> u32 {
        match self {
            Self::TextToVideo | Self::ImageToVideo | Self::SpeechToVideo => 40,
            Self::TextImageToVideo => 50,
            Self::Animate => 20,
        }
    }

    /// Checkpoint directory name under the model root.
    pub fn checkpoint_dir(self) -> &'static str {
        match self {
            Self::TextToVideo => "Wan2.2-T2V-A14B",
            Self::ImageToVideo => "Wan2.2-I2V-A14B",
            Self::TextImageToVideo => "Wan2.2-TI2V-5B",
            Self::SpeechToVideo => "Wan2.2-S2V-14B",
            Self::Animate => "Wan2.2-Animate-14B",
        }
    }

    pub fn input_rules(self) -> InputRules {
        use InputRule::{Forbidden, Optional, Required};
        match self {
            Self::TextToVideo => InputRules {
                image: Forbidden,
                audio: Forbidden,
                pose_video: Forbidden,
            },
            Self::ImageToVideo => InputRules {
                image: Required,
                audio: Forbidden,
                pose_video: Forbidden,
            },
            Self::TextImageToVideo => InputRules {
                image: Optional,
                audio: Forbidden,
                pose_video: Forbidden,
            },
            Self::SpeechToVideo => InputRules {
                image: Required,
                audio: Required,
                pose_video: Optional,
            },
            Self::Animate => InputRules {
                image: Required,
                audio: Forbidden,
                pose_video: Required,
            },
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_TASKS
            .iter()
            .copied()
            .find(|task| task.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let valid: Vec<&str> = ALL_TASKS.iter().map(|t| t.as_str()).collect();
                CoreError::Validation(format!(
                    "Unknown task '{s}'. Valid tasks: {}",
                    valid.join(", ")
                ))
            })
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for task in ALL_TASKS {
            assert_eq!(task.as_str().parse::<Task>().unwrap(), *task);
        }
    }

    #[test]
    fn from_str_ignores_case() {
        assert_eq!("TI2V-5b".parse::<Task>().unwrap(), Task::TextImageToVideo);
    }

    #[test]
    fn unknown_task_rejected() {
        let err = "t2v-1.3B".parse::<Task>().unwrap_err();
        assert!(err.to_string().contains("Unknown task"));
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&Task::Animate).unwrap();
        assert_eq!(json, "\"animate-14B\"");
        let task: Task = serde_json::from_str("\"s2v-14B\"").unwrap();
        assert_eq!(task, Task::SpeechToVideo);
    }

    #[test]
    fn default_size_is_landscape() {
        for task in [Task::TextToVideo, Task::ImageToVideo, Task::SpeechToVideo, Task::Animate] {
            assert_eq!(task.default_size(), Resolution::new(1280, 720), "{task}");
        }
        assert_eq!(Task::TextImageToVideo.default_size(), Resolution::new(1280, 704));
    }

    #[test]
    fn default_size_is_supported_for_every_task() {
        for task in ALL_TASKS {
            assert!(
                task.supported_sizes().contains(&task.default_size()),
                "{task} default size not in allow-list"
            );
        }
    }

    #[test]
    fn ti2v_only_supports_704_class_sizes() {
        let sizes = Task::TextImageToVideo.supported_sizes();
        assert!(sizes.contains(&Resolution::new(1280, 704)));
        assert!(!sizes.contains(&Resolution::new(1280, 720)));
    }

    #[test]
    fn image_to_video_requires_image() {
        assert_eq!(Task::ImageToVideo.input_rules().image, InputRule::Required);
        assert_eq!(Task::TextToVideo.input_rules().image, InputRule::Forbidden);
    }
}
