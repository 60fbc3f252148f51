use std::time::Duration;

use genvid_core::error::CoreError;

/// Errors from a local generation run.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The request could not be turned into a command line.
    #[error(transparent)]
    InvalidRequest(#[from] CoreError),

    /// The process could not be started, or waiting on it failed.
    #[error("Failed to run generator: {0}")]
    Spawn(#[source] std::io::Error),

    /// The process exited unsuccessfully.
    #[error("Generator exited with code {exit_code}: {stderr}")]
    ExitFailure {
        /// Process exit code (`-1` if killed by a signal).
        exit_code: i32,
        /// Tail of the captured stderr.
        stderr: String,
    },

    /// The process ran past its time limit and was killed.
    #[error("Generation timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// The process succeeded but no new video appeared.
    #[error("No output video found in {0}")]
    NoOutput(String),
}
