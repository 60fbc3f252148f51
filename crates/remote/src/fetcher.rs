//! Writes a completed job's video to a local directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::io::AsyncWriteExt;

use crate::backend::JobBackend;
use crate::error::LifecycleError;
use crate::output::OutputDescriptor;

/// A video written to local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub path: PathBuf,
    pub bytes: u64,
}

pub struct ArtifactFetcher<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: JobBackend + ?Sized> ArtifactFetcher<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Materialise `output` under `dest_dir`, creating the directory if needed.
    ///
    /// Inline payloads are base64-decoded and written as-is. References
    /// are streamed into a `.part` file next to the destination and
    /// renamed into place when complete; the partial file is removed if the
    /// transfer breaks.
    pub async fn fetch(
        &self,
        job_id: &str,
        output: &OutputDescriptor,
        dest_dir: &Path,
    ) -> Result<SavedArtifact, LifecycleError> {
        match output {
            OutputDescriptor::Inline { data, filename } => {
                let bytes = STANDARD.decode(data.trim()).map_err(|e| {
                    LifecycleError::ArtifactNotFound {
                        job_id: job_id.to_string(),
                        detail: format!("inline video is not valid base64: {e}"),
                    }
                })?;

                tokio::fs::create_dir_all(dest_dir).await?;
                let path = dest_dir.join(target_name(job_id, filename.as_deref()));
                tokio::fs::write(&path, &bytes).await?;

                tracing::info!(
                    job_id,
                    path = %path.display(),
                    bytes = bytes.len(),
                    "Saved inline video",
                );
                Ok(SavedArtifact {
                    path,
                    bytes: bytes.len() as u64,
                })
            }
            OutputDescriptor::Reference { locator, filename } => {
                tokio::fs::create_dir_all(dest_dir).await?;
                let name = target_name(job_id, filename.as_deref());
                let path = dest_dir.join(&name);
                // The locator may be `path` itself on shared storage, so the
                // final name is only replaced once the copy is complete.
                let partial = dest_dir.join(format!(".{name}.part"));
                let mut file = tokio::fs::File::create(&partial).await?;

                match self.backend.fetch_reference(job_id, locator, &mut file).await {
                    Ok(bytes) => {
                        file.flush().await?;
                        drop(file);
                        tokio::fs::rename(&partial, &path).await?;
                        tracing::info!(
                            job_id,
                            locator = %locator,
                            path = %path.display(),
                            bytes,
                            "Downloaded video",
                        );
                        Ok(SavedArtifact { path, bytes })
                    }
                    Err(e) => {
                        drop(file);
                        if let Err(rm) = tokio::fs::remove_file(&partial).await {
                            tracing::debug!(path = %partial.display(), error = %rm, "Could not remove partial file");
                        }
                        Err(LifecycleError::ArtifactNotFound {
                            job_id: job_id.to_string(),
                            detail: format!("could not retrieve '{locator}': {e}"),
                        })
                    }
                }
            }
            OutputDescriptor::Missing => Err(LifecycleError::ArtifactNotFound {
                job_id: job_id.to_string(),
                detail: "job completed without video data or a video reference".to_string(),
            }),
            OutputDescriptor::Failed(message) => Err(LifecycleError::RemoteExecution {
                job_id: job_id.to_string(),
                message: message.clone(),
            }),
        }
    }
}

/// Only the final path component of a remote-supplied name is kept.
fn target_name(job_id: &str, filename: Option<&str>) -> String {
    filename
        .and_then(|f| Path::new(f).file_name())
        .map(|f| f.to_string_lossy().into_owned())
        .filter(|f| !f.is_empty() && f != "." && f != "..")
        .unwrap_or_else(|| format!("{job_id}.mp4"))
}
