use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;

use super::{CameraId, RoomId};

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CameraStatus {
    Active,
    Inactive,
    Error,
}

impl Default for CameraStatus {
    fn default() -> Self {
        CameraStatus::Active
    }
}

#[derive(PartialEq, Eq, Serialize, Deserialize, Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Both parts present and non-empty
    pub fn is_complete(&self) -> bool {
        matches!(
            (self.username.as_deref(), self.password.as_deref()),
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty()
        )
    }
}

// Passwords must never reach the logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone)]
pub struct Camera {
    pub id: CameraId,
    pub name: String,
    pub stream_url: String,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub status: CameraStatus,
    pub room_id: Option<RoomId>,
}

impl Camera {
    /// Stream address with the camera's credentials embedded, if it has any
    pub fn authenticated_url(&self) -> String {
        embed_credentials(&self.stream_url, &self.credentials)
    }
}

/// Inserts `user:pass@` right after the scheme separator.
///
/// Incomplete credentials leave the address untouched. So does an address that does not split
/// into exactly two parts around `://`, in which case capture proceeds with the original address.
pub fn embed_credentials(stream_url: &str, credentials: &Credentials) -> String {
    let (username, password) = match (&credentials.username, &credentials.password) {
        (Some(u), Some(p)) if credentials.is_complete() => (u, p),
        _ => return stream_url.to_string(),
    };
    let parts: Vec<&str> = stream_url.split("://").collect();
    if parts.len() != 2 {
        warn!(
            "Stream address has no usable scheme separator, credentials not embedded: {}",
            stream_url
        );
        return stream_url.to_string();
    }
    format!("{}://{}:{}@{}", parts[0], username, password, parts[1])
}
