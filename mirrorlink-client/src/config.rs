use mirrorlink_core::{Role, RoomId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Everything one room visit needs: where the relay is, which room, which
/// role, and how long to wait for the channel to open.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub url: String,
    pub room_id: RoomId,
    pub role: Role,
    pub open_timeout: Duration,
    pub ice_servers: Vec<IceServerConfig>,
}

impl SessionConfig {
    pub fn new(url: impl Into<String>, room_id: RoomId, role: Role) -> Self {
        Self {
            url: url.into(),
            room_id,
            role,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            ice_servers: vec![
                IceServerConfig::stun(DEFAULT_STUN_ADDR),
                IceServerConfig::stun(DEFAULT_STUN_ADDR_2),
            ],
        }
    }

    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServerConfig>) -> Self {
        self.ice_servers = ice_servers;
        self
    }
}
