//! Job status vocabulary and the locally mirrored job record.
//!
//! Remote endpoints spell their states differently (`IN_QUEUE` vs
//! `QUEUED`, `IN_PROGRESS` vs `RUNNING`, ...). [`JobStatus::classify`]
//! folds every spelling we know onto four canonical classes; anything it
//! does not recognise is reported as `None` and treated as still pending.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

/// Canonical job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Map a remote status label onto a canonical class.
    ///
    /// Matching is case-insensitive and treats `-` and spaces as `_`.
    /// Cancellation and remote-side timeouts count as failures: the remote
    /// system will not produce an artifact for them.
    pub fn classify(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();

        match normalized.as_str() {
            "QUEUED" | "IN_QUEUE" | "PENDING" | "SUBMITTED" => Some(Self::Queued),
            "RUNNING" | "IN_PROGRESS" | "PROCESSING" | "STARTED" => Some(Self::Running),
            "COMPLETED" | "SUCCESS" | "SUCCEEDED" => Some(Self::Completed),
            "FAILED" | "ERROR" | "CANCELLED" | "CANCELED" | "TIMED_OUT" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a completed job's video can be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactRef {
    /// Decoded bytes were written to this local path.
    Local { path: String },
    /// A locator (URL or shared-storage path) not yet retrieved.
    Remote { locator: String },
}

/// One submitted generation attempt as seen from this side.
///
/// Only ever updated by mirroring what the remote end reports; once a
/// terminal status has been observed the record is frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub submitted_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    /// A freshly submitted job. Remote endpoints accept jobs into a queue,
    /// so the initial state is always `Queued`.
    pub fn submitted(id: impl Into<JobId>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            submitted_at: now,
            updated_at: now,
            artifact: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Mirror a status observation.
    ///
    /// Returns `Conflict` if the job already reached a terminal state.
    pub fn observe(
        &mut self,
        status: JobStatus,
        artifact: Option<ArtifactRef>,
        error: Option<String>,
    ) -> Result<(), CoreError> {
        if self.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "Job {} is already {} and cannot change to {status}",
                self.id, self.status
            )));
        }
        self.status = status;
        self.updated_at = Utc::now();
        if artifact.is_some() {
            self.artifact = artifact;
        }
        if error.is_some() {
            self.error = error;
        }
        Ok(())
    }

    /// Record where a completed job's video now lives.
    ///
    /// The status stays frozen; only the artifact location is replaced,
    /// e.g. a remote locator by the local file it was saved to.
    pub fn attach_artifact(&mut self, artifact: ArtifactRef) -> Result<(), CoreError> {
        if self.status != JobStatus::Completed {
            return Err(CoreError::Conflict(format!(
                "Job {} is {} and has no artifact to record",
                self.id, self.status
            )));
        }
        self.artifact = Some(artifact);
        self.updated_at = Utc::now();
        Ok(())
    }
}
