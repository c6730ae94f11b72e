//! Coordinator envelope (JSON text frame).
//!
//! Wire shape: `{ "type": string, "receiverID"?: string, "data": string }`.
//! The coordinator adds `senderID` when relaying. `data` is plain JSON for
//! `join`/`start`, Base64 of JSON for `sdp`/`ice-candidate`, and a bare
//! owner ID for `accepted`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PlaycastError, Result};
use crate::protocol::transcoder::{decode_payload, encode_payload};
use crate::protocol::types::{IceCandidateInit, JoinData, SessionDescription, StartData};

/// Raw envelope as it travels over the control channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Set by the coordinator on relayed messages.
    #[serde(
        rename = "senderID",
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub sender_id: Option<String>,
    /// Addressed peer, in provider-mediated topologies.
    #[serde(
        rename = "receiverID",
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub receiver_id: Option<String>,
    /// Opaque payload string.
    #[serde(default)]
    pub data: String,
}

// The coordinator serializes absent IDs as "".
fn non_empty<'de, D>(de: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<String> = Option::deserialize(de)?;
    Ok(v.filter(|s| !s.is_empty()))
}

/// Known envelope types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Join,
    Start,
    Sdp,
    IceCandidate,
    Accepted,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Join => "join",
            MessageType::Start => "start",
            MessageType::Sdp => "sdp",
            MessageType::IceCandidate => "ice-candidate",
            MessageType::Accepted => "accepted",
        }
    }

    /// `None` for types this client does not understand.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "join" => Some(MessageType::Join),
            "start" => Some(MessageType::Start),
            "sdp" => Some(MessageType::Sdp),
            "ice-candidate" => Some(MessageType::IceCandidate),
            "accepted" => Some(MessageType::Accepted),
            _ => None,
        }
    }
}

/// Decoded envelope payload, one variant per known type.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Join(JoinData),
    Start(StartData),
    Sdp(SessionDescription),
    IceCandidate(IceCandidateInit),
    /// Owner ID assigned by the coordinator after a provider join.
    Accepted(String),
}

impl Signal {
    pub fn message_type(&self) -> MessageType {
        match self {
            Signal::Join(_) => MessageType::Join,
            Signal::Start(_) => MessageType::Start,
            Signal::Sdp(_) => MessageType::Sdp,
            Signal::IceCandidate(_) => MessageType::IceCandidate,
            Signal::Accepted(_) => MessageType::Accepted,
        }
    }

    /// Build the outbound envelope, optionally addressed to `receiver`.
    pub fn to_envelope(&self, receiver: Option<&str>) -> Result<Envelope> {
        let data = match self {
            Signal::Join(j) => plain_json(j)?,
            Signal::Start(s) => plain_json(s)?,
            Signal::Sdp(d) => encode_payload(d)?,
            Signal::IceCandidate(c) => encode_payload(c)?,
            Signal::Accepted(owner) => owner.clone(),
        };
        Ok(Envelope {
            msg_type: self.message_type().as_str().to_string(),
            sender_id: None,
            receiver_id: receiver.map(str::to_string),
            data,
        })
    }

    /// Decode an envelope's payload. `Ok(None)` means the type is unknown
    /// and should be ignored.
    pub fn from_envelope(env: &Envelope) -> Result<Option<Signal>> {
        let Some(ty) = MessageType::parse(&env.msg_type) else {
            return Ok(None);
        };
        let signal = match ty {
            MessageType::Join => Signal::Join(parse_plain(&env.data)?),
            MessageType::Start => Signal::Start(parse_plain(&env.data)?),
            MessageType::Sdp => Signal::Sdp(decode_payload(&env.data)?),
            MessageType::IceCandidate => Signal::IceCandidate(decode_payload(&env.data)?),
            MessageType::Accepted => Signal::Accepted(env.data.clone()),
        };
        Ok(Some(signal))
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub sender_id: Option<String>,
    pub signal: Signal,
}

/// Decode one text frame. Malformed frames are errors; unknown types are `Ok(None)`.
pub fn decode_text(s: &str) -> Result<Option<Inbound>> {
    let env: Envelope = serde_json::from_str(s)
        .map_err(|e| PlaycastError::Malformed(format!("invalid envelope json: {e}")))?;
    let signal = Signal::from_envelope(&env)?;
    Ok(signal.map(|signal| Inbound {
        sender_id: env.sender_id,
        signal,
    }))
}

/// Serialize an envelope to a text frame.
pub fn encode_text(env: &Envelope) -> Result<String> {
    serde_json::to_string(env)
        .map_err(|e| PlaycastError::Internal(format!("envelope encode failed: {e}")))
}

fn plain_json<T: Serialize>(v: &T) -> Result<String> {
    serde_json::to_string(v)
        .map_err(|e| PlaycastError::Internal(format!("json encode failed: {e}")))
}

fn parse_plain<T: serde::de::DeserializeOwned>(s: &str) -> Result<T> {
    serde_json::from_str(s).map_err(|e| PlaycastError::Malformed(format!("invalid json data: {e}")))
}
