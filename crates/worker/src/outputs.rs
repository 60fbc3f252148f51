//! Locating the video a run produced.
//!
//! `generate.py` picks its own file name, so the runner snapshots the
//! output directory before spawning and afterwards takes the newest
//! `.mp4` that is new or was rewritten.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Modification times of the `.mp4` files in a directory.
#[derive(Debug, Default, Clone)]
pub struct OutputSnapshot {
    seen: HashMap<PathBuf, SystemTime>,
}

impl OutputSnapshot {
    /// Record the current `.mp4` files in `dir`. A missing directory is empty.
    pub async fn take(dir: &Path) -> std::io::Result<Self> {
        Ok(Self {
            seen: list_videos(dir).await?.into_iter().collect(),
        })
    }

    /// The newest video that did not exist, or had a different mtime, when
    /// the snapshot was taken.
    pub async fn newest_since(&self, dir: &Path) -> std::io::Result<Option<PathBuf>> {
        let newest = list_videos(dir)
            .await?
            .into_iter()
            .filter(|(path, mtime)| self.seen.get(path) != Some(mtime))
            .max_by_key(|(_, mtime)| *mtime)
            .map(|(path, _)| path);
        Ok(newest)
    }
}

async fn list_videos(dir: &Path) -> std::io::Result<Vec<(PathBuf, SystemTime)>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut videos = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_mp4 = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"));
        if !is_mp4 {
            continue;
        }
        let meta = entry.metadata().await?;
        if meta.is_file() {
            videos.push((path, meta.modified()?));
        }
    }
    Ok(videos)
}
