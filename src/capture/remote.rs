use tracing::info;

use super::ApiProvider;
use crate::model::DetectionResult;

/// Cloud vision providers are not wired up yet. Every provider answers with an empty result.
pub fn detect_with_provider(provider: ApiProvider, frame: &[u8]) -> DetectionResult {
    match provider {
        ApiProvider::Google | ApiProvider::Aws | ApiProvider::Azure => {
            info!(
                %provider,
                frame_bytes = frame.len(),
                "Remote detection provider not configured, recording an empty result"
            );
            DetectionResult::zero()
        }
    }
}
