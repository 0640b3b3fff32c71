use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use super::{CaptureError, FrameSource};

/// Pulls one PNG frame out of a stream with an external ffmpeg process.
///
/// The child is killed if the caller stops waiting, so an enclosing timeout never leaves a
/// decoder running.
#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    binary: PathBuf,
}

impl FfmpegFrameSource {
    pub fn new(binary: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn capture(&self, stream_url: &str) -> Result<Vec<u8>, CaptureError> {
        let output = Command::new(&self.binary)
            .args(["-loglevel", "error", "-i", stream_url])
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                CaptureError::CaptureFailed(format!(
                    "Unable to launch {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        // stderr echoes the input address, which may carry credentials
        trace!(stderr_bytes = output.stderr.len(), "ffmpeg finished");
        if !output.status.success() {
            return Err(CaptureError::CaptureFailed(format!(
                "ffmpeg exited with {}",
                output.status
            )));
        }
        if output.stdout.is_empty() {
            return Err(CaptureError::CaptureFailed(
                "ffmpeg produced no image data".into(),
            ));
        }
        Ok(output.stdout)
    }
}
