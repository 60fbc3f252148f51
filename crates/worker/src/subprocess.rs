//! Spawn + capture + timeout for the generator process.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::error::GenerationError;

/// Maximum stdout or stderr size captured per stream (4 MiB).
const MAX_OUTPUT_BYTES: u64 = 4 * 1024 * 1024;

/// Stderr bytes kept in [`GenerationError::ExitFailure`].
const STDERR_TAIL_BYTES: usize = 2000;

#[derive(Debug)]
pub(crate) struct RunOutput {
    pub stdout: String,
    pub duration: Duration,
}

/// Run `cmd` to completion, killing it if `timeout` elapses first.
pub(crate) async fn run(cmd: &mut Command, timeout: Duration) -> Result<RunOutput, GenerationError> {
    // `kill_on_drop(true)` kills the child when it is dropped on timeout.
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(GenerationError::Spawn)?;

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let stdout_bytes = stdout_task.await.unwrap_or_default();
            let stderr_bytes = stderr_task.await.unwrap_or_default();

            if !status.success() {
                return Err(GenerationError::ExitFailure {
                    exit_code: status.code().unwrap_or(-1),
                    stderr: tail(&String::from_utf8_lossy(&stderr_bytes), STDERR_TAIL_BYTES),
                });
            }

            Ok(RunOutput {
                stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                duration: start.elapsed(),
            })
        }
        Ok(Err(e)) => Err(GenerationError::Spawn(e)),
        Err(_elapsed) => Err(GenerationError::TimedOut(timeout)),
    }
}

async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h).take(MAX_OUTPUT_BYTES).read_to_end(&mut buf).await;
    }
    buf
}

/// Last `max` bytes of `s`, cut on a char boundary.
fn tail(s: &str, max: usize) -> String {
    let s = s.trim_end();
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_the_end() {
        assert_eq!(tail("abcdef\n", 3), "def");
        assert_eq!(tail("short", 100), "short");
    }

    #[test]
    fn tail_respects_char_boundaries() {
        let s = "ééé";
        let t = tail(s, 3);
        assert!(s.ends_with(&t));
        assert_eq!(t, "é");
    }
}
