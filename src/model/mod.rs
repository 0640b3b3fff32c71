mod activity;
mod alert;
mod camera;
mod detection;

pub use activity::{actions, ActivityLogEntry, NewActivityLog};
pub use alert::{AlertRule, AlertType};
pub use camera::{embed_credentials, Camera, CameraStatus, Credentials};
pub use detection::{
    compute_occupancy, BoundingBox, Detection, DetectionRecord, DetectionResult, NewDetection,
};

pub type CameraId = i64;
pub type RoomId = i64;
pub type AlertRuleId = i64;
pub type DetectionId = i64;
pub type UserId = i64;
