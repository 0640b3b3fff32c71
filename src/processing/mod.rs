//! Continuous monitoring: one scheduled loop per camera, the registry that owns them, and the
//! alert rules evaluated after every recorded detection.

mod alerts;
mod camera_loop;
mod supervisor;

use async_trait::async_trait;

use crate::{
    capture::CaptureError,
    model::{CameraId, DetectionResult},
    store::StoreError,
};

pub use alerts::{AlertEvaluator, DEFAULT_ALERT_COOLDOWN_MINUTES, MAX_ALERT_COOLDOWN_MINUTES};
pub use camera_loop::{CameraLoop, LoopState, DEFAULT_INTERVAL};
pub use supervisor::{CameraProcessingStatus, DetectionRecorder, ProcessingSupervisor};

/// Receives the outcome of every pass a camera loop completes
#[async_trait]
pub trait DetectionHandler: Send + Sync {
    async fn on_detection(
        &self,
        camera_id: CameraId,
        result: DetectionResult,
    ) -> Result<(), ProcessingError>;
}

quick_error! {
    #[derive(Debug)]
    pub enum ProcessingError {
        PersistenceUnavailable(error: StoreError) {
            from()
            display("Persistence unavailable: {}", error)
            source(error)
        }
        InvalidCameraReference(id: CameraId) {
            display("Camera {} does not exist", id)
        }
        InvalidConfidenceThreshold(value: f32) {
            display("Confidence threshold must be within [0, 1], got {}", value)
        }
        Capture(error: CaptureError) {
            from()
            display("{}", error)
            source(error)
        }
    }
}
