use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

use super::{CaptureError, Detector};
use crate::model::{Detection, DetectionResult};

/// What the detector script prints on stdout. Its own aggregates are ignored, counts are rebuilt
/// from the individual detections.
#[derive(Debug, Deserialize)]
struct DetectorOutput {
    // Absent when the script only reports an error
    #[serde(default)]
    detections: Vec<Detection>,
    #[serde(default)]
    error: Option<String>,
}

/// Runs an object detection script against a frame written to a scratch file
#[derive(Debug, Clone)]
pub struct ScriptDetector {
    interpreter: PathBuf,
    script: PathBuf,
    scratch_dir: PathBuf,
}

impl ScriptDetector {
    pub fn new(interpreter: impl AsRef<Path>, script: impl AsRef<Path>) -> Self {
        Self {
            interpreter: interpreter.as_ref().to_path_buf(),
            script: script.as_ref().to_path_buf(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn with_scratch_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.scratch_dir = dir.as_ref().to_path_buf();
        self
    }
}

/// Frame file that is removed however the detection ends, including a timeout dropping the future
struct ScratchFrame(PathBuf);

impl Drop for ScratchFrame {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

#[async_trait]
impl Detector for ScriptDetector {
    async fn detect(
        &self,
        image: &[u8],
        confidence_threshold: f32,
    ) -> Result<DetectionResult, CaptureError> {
        let frame = ScratchFrame(
            self.scratch_dir
                .join(format!("frame_{}.png", Uuid::new_v4().to_simple())),
        );
        tokio::fs::write(&frame.0, image).await.map_err(|e| {
            CaptureError::DetectionFailed(format!("Unable to write frame for detector: {}", e))
        })?;

        let output = Command::new(&self.interpreter)
            .arg(&self.script)
            .arg(&frame.0)
            .arg(confidence_threshold.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                CaptureError::DetectionFailed(format!(
                    "Unable to launch {}: {}",
                    self.interpreter.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::DetectionFailed(format!(
                "Detector exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        debug!(stdout_bytes = output.stdout.len(), "Detector finished");
        parse_detector_output(&output.stdout, confidence_threshold)
    }
}

/// Parses the detector's JSON report. A reported `error` is a failed detection even when the
/// process exited cleanly.
pub fn parse_detector_output(
    stdout: &[u8],
    confidence_threshold: f32,
) -> Result<DetectionResult, CaptureError> {
    let parsed: DetectorOutput = serde_json::from_slice(stdout)
        .map_err(|e| CaptureError::DetectionFailed(format!("Unparseable detector output: {}", e)))?;
    if let Some(error) = parsed.error {
        return Err(CaptureError::DetectionFailed(error));
    }
    Ok(DetectionResult::from_detections(
        parsed.detections,
        confidence_threshold,
    ))
}
