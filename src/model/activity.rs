use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Action names written by the engine
pub mod actions {
    pub const SYSTEM_START: &str = "system_start";
    pub const SYSTEM_STOP: &str = "system_stop";
    pub const ALERT_TRIGGERED: &str = "ALERT_TRIGGERED";
}

/// An entry about to be appended to the activity log
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone)]
pub struct NewActivityLog {
    pub action: String,
    pub entity: Option<String>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
    pub actor_id: Option<UserId>,
}

impl NewActivityLog {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            entity: None,
            entity_id: None,
            details: None,
            actor_id: None,
        }
    }

    pub fn entity(mut self, entity: impl Into<String>, id: i64) -> Self {
        self.entity = Some(entity.into());
        self.entity_id = Some(id);
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub action: String,
    pub entity: Option<String>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
    pub actor_id: Option<UserId>,
    pub timestamp: DateTime<Utc>,
}
