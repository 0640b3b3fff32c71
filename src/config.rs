use std::{collections::HashSet, path::Path};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{
    capture::ApiProvider,
    model::{AlertRule, AlertType, Camera, CameraStatus, Credentials},
    processing::{DEFAULT_ALERT_COOLDOWN_MINUTES, MAX_ALERT_COOLDOWN_MINUTES},
};

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub system: ConfigSystem,
    #[serde(default)]
    pub processing: ConfigProcessing,
    #[serde(default)]
    pub camera: Vec<ConfigCamera>,
    #[serde(default)]
    pub alert: Vec<ConfigAlert>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ConfigSystem {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for ConfigSystem {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            json_logs: false,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ConfigProcessing {
    pub interval_seconds: u64,
    pub confidence_threshold: f32,
    pub use_local_processing: bool,
    pub api_provider: Option<ApiProvider>,
    pub capture_timeout_seconds: u64,
    pub detection_timeout_seconds: u64,
    pub alert_cooldown_minutes: i64,
    pub ffmpeg_path: String,
    pub detector_interpreter: String,
    pub detector_script: String,
}

impl Default for ConfigProcessing {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            confidence_threshold: 0.5,
            use_local_processing: true,
            api_provider: None,
            capture_timeout_seconds: 10,
            detection_timeout_seconds: 30,
            alert_cooldown_minutes: DEFAULT_ALERT_COOLDOWN_MINUTES,
            ffmpeg_path: "ffmpeg".into(),
            detector_interpreter: "python3".into(),
            detector_script: "scripts/detect_objects.py".into(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigCamera {
    pub id: i64,
    pub name: String,
    pub stream_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub status: CameraStatus,
    pub room_id: Option<i64>,
}

impl ConfigCamera {
    pub fn to_camera(&self) -> Camera {
        Camera {
            id: self.id,
            name: self.name.clone(),
            stream_url: self.stream_url.clone(),
            credentials: Credentials {
                username: self.username.clone(),
                password: self.password.clone(),
            },
            status: self.status,
            room_id: self.room_id,
        }
    }
}

fn enabled() -> bool {
    true
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigAlert {
    pub id: i64,
    pub camera_id: Option<i64>,
    pub room_id: Option<i64>,
    pub alert_type: AlertType,
    pub threshold: Option<i32>,
    pub message: Option<String>,
    #[serde(default = "enabled")]
    pub active: bool,
}

impl ConfigAlert {
    pub fn to_rule(&self) -> AlertRule {
        AlertRule {
            id: self.id,
            camera_id: self.camera_id,
            room_id: self.room_id,
            alert_type: self.alert_type.clone(),
            threshold: self.threshold,
            message: self.message.clone(),
            active: self.active,
            last_triggered: None,
        }
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, String> {
    let figment = Figment::new()
        .merge(Env::prefixed("OCCUPANCY_WATCH_").split("__"))
        .merge(Toml::file(path));
    from_figment(figment)
}

fn from_figment(figment: Figment) -> Result<Config, String> {
    let cfg: Config = figment.extract().map_err(|e| e.to_string())?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), String> {
    if cfg.processing.interval_seconds == 0 {
        return Err("processing.interval_seconds must be greater than zero".into());
    }
    if cfg.processing.capture_timeout_seconds == 0 {
        return Err("processing.capture_timeout_seconds must be greater than zero".into());
    }
    if cfg.processing.detection_timeout_seconds == 0 {
        return Err("processing.detection_timeout_seconds must be greater than zero".into());
    }
    let cooldown = cfg.processing.alert_cooldown_minutes;
    if !(0..=MAX_ALERT_COOLDOWN_MINUTES).contains(&cooldown) {
        return Err(format!(
            "processing.alert_cooldown_minutes must be within [0, {}], got {}",
            MAX_ALERT_COOLDOWN_MINUTES, cooldown
        ));
    }
    let threshold = cfg.processing.confidence_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(format!(
            "processing.confidence_threshold must be within [0, 1], got {}",
            threshold
        ));
    }

    let mut ids = HashSet::new();
    for cam in &cfg.camera {
        if !ids.insert(cam.id) {
            return Err(format!("Camera {} has duplicate ID: {}", cam.name, cam.id));
        }
    }

    let mut ids = HashSet::new();
    for alert in &cfg.alert {
        if !ids.insert(alert.id) {
            return Err(format!("Alert rule has duplicate ID: {}", alert.id));
        }
        if alert.camera_id.is_none() && alert.room_id.is_none() {
            return Err(format!(
                "Alert rule {} must name a camera_id or a room_id",
                alert.id
            ));
        }
    }
    Ok(())
}
