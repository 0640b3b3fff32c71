use std::{convert::TryFrom, fmt, str::FromStr, time::UNIX_EPOCH};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{AlertRuleId, CameraId, RoomId};

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize, Hash, Clone)]
#[serde(try_from = "String", into = "String")]
pub enum AlertType {
    HighOccupancy,
    LowOccupancy,
    /// Types created by the CRUD layer that this engine has no evaluation for
    Unknown(String),
}

impl AlertType {
    /// Whether an occupancy reading breaches `threshold` for this kind of rule
    pub fn breached(&self, occupancy_rate: u8, threshold: i32) -> bool {
        let rate = i32::from(occupancy_rate);
        match self {
            AlertType::HighOccupancy => rate >= threshold,
            AlertType::LowOccupancy => rate <= threshold,
            AlertType::Unknown(_) => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AlertType::HighOccupancy => "HIGH_OCCUPANCY",
            AlertType::LowOccupancy => "LOW_OCCUPANCY",
            AlertType::Unknown(s) => s,
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Exact match only, other spellings are kept verbatim and never fire
        Ok(match s {
            "HIGH_OCCUPANCY" => AlertType::HighOccupancy,
            "LOW_OCCUPANCY" => AlertType::LowOccupancy,
            _ => {
                if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    AlertType::Unknown(s.to_string())
                } else {
                    return Err(format!("Alert type is not a valid identifier: {:?}", s));
                }
            }
        })
    }
}

impl TryFrom<String> for AlertType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AlertType> for String {
    fn from(t: AlertType) -> Self {
        t.as_str().to_string()
    }
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize, Clone)]
pub struct AlertRule {
    pub id: AlertRuleId,
    pub camera_id: Option<CameraId>,
    pub room_id: Option<RoomId>,
    pub alert_type: AlertType,
    pub threshold: Option<i32>,
    pub message: Option<String>,
    pub active: bool,
    pub last_triggered: Option<DateTime<Utc>>,
}

impl AlertRule {
    /// True when the reading breaches the rule. A rule without a threshold never fires.
    pub fn should_fire(&self, occupancy_rate: u8) -> bool {
        match self.threshold {
            Some(threshold) => self.alert_type.breached(occupancy_rate, threshold),
            None => false,
        }
    }

    /// True while less than `cooldown` has passed since the last trigger. A rule that never
    /// triggered is measured from the epoch, so it is never cooling down.
    pub fn in_cooldown(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        let last = self
            .last_triggered
            .unwrap_or_else(|| DateTime::<Utc>::from(UNIX_EPOCH));
        now.signed_duration_since(last) < cooldown
    }

    /// Message recorded in the activity log when the rule fires
    pub fn trigger_details(&self, occupancy_rate: u8) -> String {
        let headline = match self.message.as_deref() {
            Some(m) if !m.trim().is_empty() => m.to_string(),
            _ => format!("Alert: {} detected", self.alert_type),
        };
        let threshold = self
            .threshold
            .map(|t| t.to_string())
            .unwrap_or_else(|| "none".to_string());
        format!(
            "{} (current value: {}%, threshold: {}%)",
            headline, occupancy_rate, threshold
        )
    }

    /// Scope check used by stores: camera-scoped rules match by camera, room-scoped rules only
    /// when the camera belongs to that room.
    pub fn applies_to(&self, camera_id: CameraId, room_id: Option<RoomId>) -> bool {
        self.camera_id == Some(camera_id) || (room_id.is_some() && self.room_id == room_id)
    }
}
