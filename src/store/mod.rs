//! Persistence contract the engine depends on. The relational schema lives with the CRUD layer;
//! the engine only needs the handful of reads and writes below.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{
    AlertRule, AlertRuleId, Camera, CameraId, CameraStatus, DetectionId, NewActivityLog,
    NewDetection, RoomId,
};

pub use memory::MemoryStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// All cameras, optionally restricted to one status
    async fn list_cameras(&self, status: Option<CameraStatus>) -> Result<Vec<Camera>, StoreError>;

    async fn get_camera_by_id(&self, id: CameraId) -> Result<Option<Camera>, StoreError>;

    async fn create_detection(&self, detection: NewDetection) -> Result<DetectionId, StoreError>;

    /// Active rules scoped to the camera, or to its room when it has one
    async fn list_active_alert_rules(
        &self,
        camera_id: CameraId,
        room_id: Option<RoomId>,
    ) -> Result<Vec<AlertRule>, StoreError>;

    async fn touch_alert_trigger(
        &self,
        rule_id: AlertRuleId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn append_activity_log(&self, entry: NewActivityLog) -> Result<(), StoreError>;
}

quick_error! {
    #[derive(Debug)]
    pub enum StoreError {
        Unavailable(reason: String) {
            display("Store unavailable: {}", reason)
        }
        NotFound(entity: &'static str, id: i64) {
            display("No {} with id {}", entity, id)
        }
    }
}
