use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Store, StoreError};
use crate::model::{
    ActivityLogEntry, AlertRule, AlertRuleId, Camera, CameraId, CameraStatus, DetectionId,
    DetectionRecord, NewActivityLog, NewDetection, RoomId,
};

#[derive(Debug, Default)]
struct State {
    cameras: BTreeMap<CameraId, Camera>,
    rules: BTreeMap<AlertRuleId, AlertRule>,
    detections: Vec<DetectionRecord>,
    activity: Vec<ActivityLogEntry>,
}

/// Process-local store used by the daemon and by tests. Its availability can be switched off to
/// exercise the engine's persistence failure paths.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::default()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(cameras: Vec<Camera>, rules: Vec<AlertRule>) -> Self {
        let store = Self::default();
        for camera in cameras {
            store.insert_camera(camera);
        }
        for rule in rules {
            store.insert_alert_rule(rule);
        }
        store
    }

    pub fn insert_camera(&self, camera: Camera) {
        self.lock().cameras.insert(camera.id, camera);
    }

    pub fn insert_alert_rule(&self, rule: AlertRule) {
        self.lock().rules.insert(rule.id, rule);
    }

    pub fn alert_rule(&self, id: AlertRuleId) -> Option<AlertRule> {
        self.lock().rules.get(&id).cloned()
    }

    pub fn detections(&self) -> Vec<DetectionRecord> {
        self.lock().detections.clone()
    }

    pub fn activity_log(&self) -> Vec<ActivityLogEntry> {
        self.lock().activity.clone()
    }

    /// While unavailable every `Store` call fails with `StoreError::Unavailable`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn checked(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(self.lock())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_cameras(&self, status: Option<CameraStatus>) -> Result<Vec<Camera>, StoreError> {
        let state = self.checked()?;
        Ok(state
            .cameras
            .values()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect())
    }

    async fn get_camera_by_id(&self, id: CameraId) -> Result<Option<Camera>, StoreError> {
        Ok(self.checked()?.cameras.get(&id).cloned())
    }

    async fn create_detection(&self, detection: NewDetection) -> Result<DetectionId, StoreError> {
        let mut state = self.checked()?;
        let id = state.detections.len() as DetectionId + 1;
        state.detections.push(DetectionRecord {
            id,
            camera_id: detection.camera_id,
            person_count: detection.person_count,
            chair_count: detection.chair_count,
            occupancy_rate: detection.occupancy_rate,
            timestamp: detection.timestamp,
        });
        Ok(id)
    }

    async fn list_active_alert_rules(
        &self,
        camera_id: CameraId,
        room_id: Option<RoomId>,
    ) -> Result<Vec<AlertRule>, StoreError> {
        let state = self.checked()?;
        Ok(state
            .rules
            .values()
            .filter(|r| r.active && r.applies_to(camera_id, room_id))
            .cloned()
            .collect())
    }

    async fn touch_alert_trigger(
        &self,
        rule_id: AlertRuleId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.checked()?;
        let rule = state
            .rules
            .get_mut(&rule_id)
            .ok_or(StoreError::NotFound("alert rule", rule_id))?;
        rule.last_triggered = Some(at);
        Ok(())
    }

    async fn append_activity_log(&self, entry: NewActivityLog) -> Result<(), StoreError> {
        let mut state = self.checked()?;
        let id = state.activity.len() as i64 + 1;
        state.activity.push(ActivityLogEntry {
            id,
            action: entry.action,
            entity: entry.entity,
            entity_id: entry.entity_id,
            details: entry.details,
            actor_id: entry.actor_id,
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
