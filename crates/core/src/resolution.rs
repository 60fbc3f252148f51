//! Output resolution parsing and allow-list checks.
//!
//! The generation entry point takes sizes as `WIDTH*HEIGHT`; that is the
//! only rendering this module produces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;
use crate::task::Task;

/// Width x height of the generated video, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Ensure this resolution is in `task`'s allow-list.
    pub fn check_supported(&self, task: Task) -> Result<(), CoreError> {
        let sizes = task.supported_sizes();
        if sizes.contains(self) {
            return Ok(());
        }
        let valid: Vec<String> = sizes.iter().map(ToString::to_string).collect();
        Err(CoreError::Validation(format!(
            "Unsupported size {self} for task {task}. Supported sizes: {}",
            valid.join(", ")
        )))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = CoreError;

    /// Accepts `1280*720` and, leniently, `1280x720`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            CoreError::Validation(format!(
                "Invalid size '{s}': expected WIDTH*HEIGHT, e.g. 1280*720"
            ))
        };

        let (w, h) = s
            .trim()
            .split_once(['*', 'x', 'X'])
            .ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;

        if width == 0 || height == 0 {
            return Err(CoreError::Validation(
                "Width and height must be greater than 0".to_string(),
            ));
        }
        Ok(Self { width, height })
    }
}

impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
