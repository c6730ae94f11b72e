//! Data-model types shared by envelopes and the client runtime.

use serde::{Deserialize, Serialize};

/// Which side of the coordinator this client joins as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Player,
    Provider,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Player => "player",
            Role::Provider => "provider",
        }
    }
}

/// Client classification sent once in `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Pc,
    Mobile,
}

// Tablets count as mobile.
const TABLET_HINTS: [&str; 4] = ["tablet", "ipad", "playbook", "silk"];

const MOBILE_HINTS: [&str; 10] = [
    "mobile",
    "android",
    "iphone",
    "ipod",
    "blackberry",
    "kindle",
    "hpwos",
    "webos",
    "opera mobi",
    "opera mini",
];

impl DeviceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Pc => "pc",
            DeviceClass::Mobile => "mobile",
        }
    }

    /// Classify a browser user-agent string.
    pub fn from_user_agent(ua: &str) -> Self {
        let ua = ua.to_ascii_lowercase();
        if TABLET_HINTS.iter().chain(MOBILE_HINTS.iter()).any(|h| ua.contains(h)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Pc
        }
    }

    /// Classify the host this binary was built for.
    pub fn detect() -> Self {
        if cfg!(any(target_os = "android", target_os = "ios")) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Pc
        }
    }
}

/// `join` payload (plain JSON, not Base64).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinData {
    pub role: Role,
    #[serde(rename = "ownerID", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl JoinData {
    pub fn new(role: Role) -> Self {
        Self { role, owner_id: None }
    }
}

/// `start` payload (plain JSON, not Base64).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartData {
    #[serde(rename = "appID")]
    pub app_id: String,
    pub device: DeviceClass,
}

/// Session description type as it appears in the JSON `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// Session description as exchanged inside `sdp` envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self { sdp_type: SdpType::Offer, sdp: sdp.into() }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self { sdp_type: SdpType::Answer, sdp: sdp.into() }
    }
}

/// ICE candidate in its browser `RTCIceCandidateInit` JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateInit {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_mline_index: Option<u16>,
    #[serde(default)]
    pub username_fragment: Option<String>,
}
