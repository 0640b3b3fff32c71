//! One detection attempt: grab a still frame from a camera stream and run it through a detector.
//!
//! Failures are classified into [`CaptureError`]. The scheduled path collapses them into an empty
//! [`DetectionResult`] in [`CapturePipeline::run_detection`], the manual path keeps them.

mod detector;
mod frame_source;
mod remote;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{config::ConfigProcessing, model::DetectionResult};

pub use detector::{parse_detector_output, ScriptDetector};
pub use frame_source::FfmpegFrameSource;

pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DETECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Grabs a single still image from a stream
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn capture(&self, stream_url: &str) -> Result<Vec<u8>, CaptureError>;
}

/// Turns an image into counts
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(
        &self,
        image: &[u8],
        confidence_threshold: f32,
    ) -> Result<DetectionResult, CaptureError>;
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApiProvider {
    Google,
    Aws,
    Azure,
}

impl Default for ApiProvider {
    fn default() -> Self {
        ApiProvider::Google
    }
}

/// Selects how a frame is analysed
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct PipelineConfig {
    pub use_local_processing: bool,
    pub api_provider: Option<ApiProvider>,
    pub confidence_threshold: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            use_local_processing: true,
            api_provider: None,
            confidence_threshold: 0.5,
        }
    }
}

impl From<&ConfigProcessing> for PipelineConfig {
    fn from(cfg: &ConfigProcessing) -> Self {
        Self {
            use_local_processing: cfg.use_local_processing,
            api_provider: cfg.api_provider,
            confidence_threshold: cfg.confidence_threshold,
        }
    }
}

#[derive(Clone)]
pub struct CapturePipeline {
    frame_source: Arc<dyn FrameSource>,
    detector: Arc<dyn Detector>,
    config: PipelineConfig,
    capture_timeout: Duration,
    detection_timeout: Duration,
}

impl CapturePipeline {
    pub fn new(
        frame_source: Arc<dyn FrameSource>,
        detector: Arc<dyn Detector>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            frame_source,
            detector,
            config,
            capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
            detection_timeout: DEFAULT_DETECTION_TIMEOUT,
        }
    }

    /// ffmpeg capture feeding the detector script, as configured
    pub fn from_config(cfg: &ConfigProcessing) -> Self {
        Self::new(
            Arc::new(FfmpegFrameSource::new(&cfg.ffmpeg_path)),
            Arc::new(ScriptDetector::new(
                &cfg.detector_interpreter,
                &cfg.detector_script,
            )),
            PipelineConfig::from(cfg),
        )
        .with_timeouts(
            Duration::from_secs(cfg.capture_timeout_seconds),
            Duration::from_secs(cfg.detection_timeout_seconds),
        )
    }

    pub fn with_timeouts(mut self, capture: Duration, detection: Duration) -> Self {
        self.capture_timeout = capture;
        self.detection_timeout = detection;
        self
    }

    /// Same capture and detector, different analysis settings
    pub fn with_config(&self, config: PipelineConfig) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one attempt and reports exactly why it failed
    pub async fn try_run_detection(&self, stream_url: &str) -> Result<DetectionResult, CaptureError> {
        let frame = self.capture_frame(stream_url).await?;
        debug!(bytes = frame.len(), "Frame captured");

        if self.config.use_local_processing {
            let detection = self
                .detector
                .detect(&frame, self.config.confidence_threshold);
            match timeout(self.detection_timeout, detection).await {
                Ok(result) => result,
                Err(_) => Err(CaptureError::DetectionTimeout(self.detection_timeout)),
            }
        } else {
            let provider = self.config.api_provider.unwrap_or_default();
            Ok(remote::detect_with_provider(provider, &frame))
        }
    }

    /// Runs one attempt. Any capture or detection failure is logged and replaced by an empty
    /// result so that a single bad frame never interrupts a schedule.
    pub async fn run_detection(&self, stream_url: &str) -> DetectionResult {
        match self.try_run_detection(stream_url).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Detection pass degraded to an empty result");
                DetectionResult::zero()
            }
        }
    }

    async fn capture_frame(&self, stream_url: &str) -> Result<Vec<u8>, CaptureError> {
        let frame = match timeout(self.capture_timeout, self.frame_source.capture(stream_url)).await
        {
            Ok(frame) => frame?,
            Err(_) => return Err(CaptureError::CaptureTimeout(self.capture_timeout)),
        };
        if frame.is_empty() {
            return Err(CaptureError::CaptureFailed(
                "Frame source produced no image data".into(),
            ));
        }
        Ok(frame)
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum CaptureError {
        CaptureTimeout(after: Duration) {
            display("No frame captured within {:?}", after)
        }
        CaptureFailed(reason: String) {
            display("Frame capture failed: {}", reason)
        }
        DetectionTimeout(after: Duration) {
            display("Detector produced no result within {:?}", after)
        }
        DetectionFailed(reason: String) {
            display("Detection failed: {}", reason)
        }
    }
}


#[cfg(test)]
mod test {
    use std::{
        sync::{atomic::Ordering, Arc},
        time::Duration,
    };

    use super::{
        fakes::{FakeDetector, FakeFrameSource, FrameBehavior},
        ApiProvider, CaptureError, CapturePipeline, PipelineConfig,
    };
    use crate::model::DetectionResult;

    fn busy_room() -> DetectionResult {
        DetectionResult {
            person_count: 4,
            chair_count: 5,
            occupancy_rate: 80,
            confidence: 0.77,
            detections: Vec::new(),
        }
    }

    fn pipeline(
        frames: FrameBehavior,
        detector: FakeDetector,
    ) -> (CapturePipeline, Arc<FakeFrameSource>, Arc<FakeDetector>) {
        let frames = Arc::new(FakeFrameSource::new(frames));
        let detector = Arc::new(detector);
        let pipeline =
            CapturePipeline::new(frames.clone(), detector.clone(), PipelineConfig::default());
        (pipeline, frames, detector)
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_detection() {
        let (pipeline, _, detector) = pipeline(
            FrameBehavior::Frame,
            FakeDetector::new(busy_room(), Duration::from_secs(2)),
        );
        let result = pipeline.run_detection("rtsp://cam/1").await;
        assert_eq!(result, busy_room());
        assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_failure_degrades_to_zero() {
        let (pipeline, _, detector) = pipeline(
            FrameBehavior::Fail,
            FakeDetector::new(busy_room(), Duration::ZERO),
        );
        assert!(matches!(
            pipeline.try_run_detection("rtsp://cam/1").await,
            Err(CaptureError::CaptureFailed(_))
        ));
        let result = pipeline.run_detection("rtsp://cam/1").await;
        assert_eq!(result, DetectionResult::zero());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_frame_is_failure() {
        let (pipeline, _, _) = pipeline(
            FrameBehavior::Empty,
            FakeDetector::new(busy_room(), Duration::ZERO),
        );
        assert!(matches!(
            pipeline.try_run_detection("rtsp://cam/1").await,
            Err(CaptureError::CaptureFailed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_timeout() {
        let (pipeline, _, _) = pipeline(
            FrameBehavior::Hang,
            FakeDetector::new(busy_room(), Duration::ZERO),
        );
        let started = tokio::time::Instant::now();
        let res = pipeline.try_run_detection("rtsp://cam/1").await;
        assert!(matches!(res, Err(CaptureError::CaptureTimeout(d)) if d == Duration::from_secs(10)));
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_detection_timeout() {
        let (pipeline, _, _) = pipeline(
            FrameBehavior::Frame,
            FakeDetector::new(busy_room(), Duration::from_secs(45)),
        );
        let res = pipeline.try_run_detection("rtsp://cam/1").await;
        assert!(matches!(res, Err(CaptureError::DetectionTimeout(d)) if d == Duration::from_secs(30)));
        assert_eq!(
            pipeline.run_detection("rtsp://cam/1").await,
            DetectionResult::zero()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_detector_failure() {
        let (pipeline, _, _) = pipeline(FrameBehavior::Frame, FakeDetector::failing());
        assert!(matches!(
            pipeline.try_run_detection("rtsp://cam/1").await,
            Err(CaptureError::DetectionFailed(_))
        ));
        assert_eq!(
            pipeline.run_detection("rtsp://cam/1").await,
            DetectionResult::zero()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_provider_stub() {
        let (pipeline, frames, detector) = pipeline(
            FrameBehavior::Frame,
            FakeDetector::new(busy_room(), Duration::ZERO),
        );
        let remote = pipeline.with_config(PipelineConfig {
            use_local_processing: false,
            api_provider: Some(ApiProvider::Azure),
            confidence_threshold: 0.5,
        });
        assert_eq!(
            remote.try_run_detection("rtsp://cam/1").await.unwrap(),
            DetectionResult::zero()
        );
        assert_eq!(frames.calls.load(Ordering::SeqCst), 1);
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
        assert!(pipeline.config().use_local_processing);
    }

    #[test]
    fn test_provider_names() {
        assert_eq!("aws".parse(), Ok(ApiProvider::Aws));
        assert_eq!(ApiProvider::Google.to_string(), "google");
        assert_eq!(ApiProvider::default(), ApiProvider::Google);
    }
}
