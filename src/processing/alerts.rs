use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, warn};

use crate::{
    model::{actions, AlertRule, AlertRuleId, CameraId, DetectionResult, NewActivityLog, RoomId},
    store::{Store, StoreError},
};

pub const DEFAULT_ALERT_COOLDOWN_MINUTES: i64 = 15;
/// One year
pub const MAX_ALERT_COOLDOWN_MINUTES: i64 = 365 * 24 * 60;

/// Decides which threshold rules fire for a fresh detection and records the triggers
#[derive(Clone)]
pub struct AlertEvaluator {
    store: Arc<dyn Store>,
    cooldown: Duration,
}

impl AlertEvaluator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            cooldown: Duration::minutes(DEFAULT_ALERT_COOLDOWN_MINUTES),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Evaluates every active rule scoped to the camera or its room. Returns the ids of the rules
    /// that fired. Rules are independent: a failed write for one is logged and the rest still
    /// run. Only failing to load the rules is an error.
    pub async fn evaluate(
        &self,
        camera_id: CameraId,
        room_id: Option<RoomId>,
        result: &DetectionResult,
        now: DateTime<Utc>,
    ) -> Result<Vec<AlertRuleId>, StoreError> {
        let rules = self
            .store
            .list_active_alert_rules(camera_id, room_id)
            .await?;
        let mut fired = Vec::new();
        for rule in rules {
            if !rule.should_fire(result.occupancy_rate) {
                continue;
            }
            if rule.in_cooldown(now, self.cooldown) {
                debug!(rule_id = rule.id, "Alert suppressed, still cooling down");
                continue;
            }
            match self
                .trigger(camera_id, &rule, result.occupancy_rate, now)
                .await
            {
                Ok(()) => fired.push(rule.id),
                Err(e) => error!(rule_id = rule.id, error = %e, "Unable to record alert trigger"),
            }
        }
        Ok(fired)
    }

    async fn trigger(
        &self,
        camera_id: CameraId,
        rule: &AlertRule,
        occupancy_rate: u8,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let details = rule.trigger_details(occupancy_rate);
        warn!(rule_id = rule.id, alert_type = %rule.alert_type, "{}", details);
        self.store
            .append_activity_log(
                NewActivityLog::new(actions::ALERT_TRIGGERED)
                    .entity("camera", camera_id)
                    .details(details),
            )
            .await?;
        self.store.touch_alert_trigger(rule.id, now).await
    }
}
