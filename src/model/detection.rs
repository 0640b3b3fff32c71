use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CameraId, DetectionId};

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy, Default)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// A single object reported by the detector
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Detection {
    pub class: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub person_count: u32,
    pub chair_count: u32,
    /// Percentage, always within 0..=100
    pub occupancy_rate: u8,
    pub confidence: f32,
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    /// The result recorded when no frame or no detector output was available
    pub fn zero() -> Self {
        Self::default()
    }

    /// Builds the aggregates from raw detector output. Detections under `confidence_threshold`
    /// are dropped before anything is counted.
    pub fn from_detections(detections: Vec<Detection>, confidence_threshold: f32) -> Self {
        let detections: Vec<Detection> = detections
            .into_iter()
            .filter(|d| d.confidence >= confidence_threshold)
            .collect();
        let person_count = detections.iter().filter(|d| d.class == "person").count() as u32;
        let chair_count = detections.iter().filter(|d| d.class == "chair").count() as u32;
        let confidence = if detections.is_empty() {
            0.0
        } else {
            let mean =
                detections.iter().map(|d| d.confidence).sum::<f32>() / detections.len() as f32;
            (mean * 100.0).round() / 100.0
        };

        DetectionResult {
            person_count,
            chair_count,
            occupancy_rate: compute_occupancy(person_count, chair_count),
            confidence,
            detections,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.person_count == 0 && self.chair_count == 0 && self.detections.is_empty()
    }
}

/// People per seat as a percentage, clamped to 100. With no seats visible any person counts as full.
pub fn compute_occupancy(person_count: u32, chair_count: u32) -> u8 {
    if chair_count > 0 {
        let rate = u64::from(person_count) * 100 / u64::from(chair_count);
        rate.min(100) as u8
    } else if person_count > 0 {
        100
    } else {
        0
    }
}

/// Row handed to the store after each pass
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone)]
pub struct NewDetection {
    pub camera_id: CameraId,
    pub person_count: u32,
    pub chair_count: u32,
    pub occupancy_rate: u8,
    pub timestamp: DateTime<Utc>,
}

impl NewDetection {
    pub fn from_result(camera_id: CameraId, result: &DetectionResult, at: DateTime<Utc>) -> Self {
        Self {
            camera_id,
            person_count: result.person_count,
            chair_count: result.chair_count,
            occupancy_rate: result.occupancy_rate.min(100),
            timestamp: at,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone)]
pub struct DetectionRecord {
    pub id: DetectionId,
    pub camera_id: CameraId,
    pub person_count: u32,
    pub chair_count: u32,
    pub occupancy_rate: u8,
    pub timestamp: DateTime<Utc>,
}
