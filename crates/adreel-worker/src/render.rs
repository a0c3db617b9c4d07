//! Final video composition.
//!
//! The final render is a local concat of per-scene clips in index
//! order. All scenes share one codec profile from generation, so the
//! ffmpeg concat demuxer stitches them without re-encoding.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EditError, EditResult};

/// Composes per-scene clips into the final campaign video.
#[async_trait]
pub trait Compositor: Send + Sync {
    /// Concatenate clips in the given order and return the result.
    async fn compose(&self, clips: &[Vec<u8>]) -> EditResult<Vec<u8>>;
}

/// ffmpeg-backed [`Compositor`] using the concat demuxer.
pub struct FfmpegCompositor {
    ffmpeg_path: String,
    work_dir: PathBuf,
}

impl FfmpegCompositor {
    pub fn new(ffmpeg_path: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            work_dir: work_dir.into(),
        }
    }
}

/// concat demuxer manifest, one clip file per line.
fn concat_manifest(clip_count: usize) -> String {
    (0..clip_count)
        .map(|i| format!("file 'clip_{i}.mp4'\n"))
        .collect()
}

#[async_trait]
impl Compositor for FfmpegCompositor {
    async fn compose(&self, clips: &[Vec<u8>]) -> EditResult<Vec<u8>> {
        if clips.is_empty() {
            return Err(EditError::render("no clips to compose"));
        }

        let dir = self.work_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;

        for (i, clip) in clips.iter().enumerate() {
            tokio::fs::write(dir.join(format!("clip_{i}.mp4")), clip).await?;
        }
        let manifest = dir.join("concat.txt");
        tokio::fs::write(&manifest, concat_manifest(clips.len())).await?;

        let output_path = dir.join("final.mp4");
        debug!("Composing {} clips in {}", clips.len(), dir.display());

        let output = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(&manifest)
            .arg("-c")
            .arg("copy")
            .arg(&output_path)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tokio::fs::remove_dir_all(&dir).await.ok();
            return Err(EditError::render(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let bytes = tokio::fs::read(&output_path).await?;
        tokio::fs::remove_dir_all(&dir).await.ok();

        info!("Composed final video ({} bytes)", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_lists_clips_in_order() {
        assert_eq!(
            concat_manifest(3),
            "file 'clip_0.mp4'\nfile 'clip_1.mp4'\nfile 'clip_2.mp4'\n"
        );
    }

    #[tokio::test]
    async fn test_empty_clip_list_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let compositor = FfmpegCompositor::new("ffmpeg", dir.path());
        let err = compositor.compose(&[]).await.unwrap_err();
        assert!(matches!(err, EditError::Render(_)));
    }
}
