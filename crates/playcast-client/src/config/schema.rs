use serde::Deserialize;

use playcast_core::error::{PlaycastError, Result};
use playcast_core::protocol::types::{DeviceClass, Role};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    pub coordinator: CoordinatorSection,

    #[serde(default)]
    pub ice: IceSection,

    #[serde(default)]
    pub session: SessionSection,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PlaycastError::UnsupportedVersion);
        }

        self.coordinator.validate()?;
        self.ice.validate()?;
        self.session.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinatorSection {
    pub ws_endpoint: String,

    /// Base URL of the discovery REST API. Discovery is disabled without it.
    #[serde(default)]
    pub api_endpoint: Option<String>,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl CoordinatorSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.ws_endpoint.starts_with("ws://") || self.ws_endpoint.starts_with("wss://")) {
            return Err(PlaycastError::Config(
                "coordinator.ws_endpoint must start with ws:// or wss://".into(),
            ));
        }
        if let Some(api) = &self.api_endpoint {
            if !(api.starts_with("http://") || api.starts_with("https://")) {
                return Err(PlaycastError::Config(
                    "coordinator.api_endpoint must start with http:// or https://".into(),
                ));
            }
        }
        if !(16..=65536).contains(&self.queue_capacity) {
            return Err(PlaycastError::Config(
                "coordinator.queue_capacity must be between 16 and 65536".into(),
            ));
        }
        Ok(())
    }
}

fn default_queue_capacity() -> usize {
    1024
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IceSection {
    #[serde(default = "default_stun_servers")]
    pub stun_servers: Vec<String>,

    #[serde(default)]
    pub turn_servers: Vec<TurnServer>,
}

impl Default for IceSection {
    fn default() -> Self {
        Self {
            stun_servers: default_stun_servers(),
            turn_servers: Vec::new(),
        }
    }
}

impl IceSection {
    pub fn validate(&self) -> Result<()> {
        if self.stun_servers.is_empty() {
            return Err(PlaycastError::Config("ice.stun_servers must not be empty".into()));
        }
        if self.turn_servers.iter().any(|t| t.urls.is_empty()) {
            return Err(PlaycastError::Config("ice.turn_servers[].urls must not be empty".into()));
        }
        Ok(())
    }
}

fn default_stun_servers() -> Vec<String> {
    vec!["stun:stun.l.google.com:19302".into()]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TurnServer {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub credential: String,
}

/// Whether a provider is picked explicitly before `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    #[default]
    Direct,
    Mediated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSetting {
    #[default]
    Auto,
    Pc,
    Mobile,
}

impl DeviceSetting {
    pub fn resolve(self) -> DeviceClass {
        match self {
            DeviceSetting::Auto => DeviceClass::detect(),
            DeviceSetting::Pc => DeviceClass::Pc,
            DeviceSetting::Mobile => DeviceClass::Mobile,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub topology: Topology,

    #[serde(default)]
    pub device: DeviceSetting,

    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    #[serde(default)]
    pub owner_id: Option<String>,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            role: Role::default(),
            topology: Topology::default(),
            device: DeviceSetting::default(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            owner_id: None,
        }
    }
}

impl SessionSection {
    pub fn validate(&self) -> Result<()> {
        if !(500..=60000).contains(&self.heartbeat_interval_ms) {
            return Err(PlaycastError::Config(
                "session.heartbeat_interval_ms must be between 500 and 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_heartbeat_interval_ms() -> u64 {
    2000
}
