//! Peer session layer.
//!
//! - `PeerConnector` / `PeerLink` / `DataChannel`: seams over the real-time transport
//! - `PeerSession`: fixed answerer negotiation order and candidate gating
//! - `media`: track aggregation into one presentable stream
//! - `rtc`: webrtc-rs backend
//!
//! Every event a link emits is tagged with the session id it was created for,
//! so the orchestrator can drop events from superseded sessions.

pub mod media;
pub mod rtc;
pub mod session;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use playcast_core::error::Result;
use playcast_core::protocol::types::{IceCandidateInit, SessionDescription};

pub use media::{MediaAggregate, MediaStream, RemoteTrack, TrackKind};
pub use rtc::RtcConnector;
pub use session::PeerSession;

/// Monotonic identity of one negotiation attempt.
pub type SessionId = u64;

pub const INPUT_LABEL: &str = "app-input";
pub const HEALTH_LABEL: &str = "health-check";

/// One data channel opened by the remote end.
#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> &str;
    fn is_open(&self) -> bool;
    async fn send_text(&self, text: String) -> Result<()>;
    async fn send_bytes(&self, data: Bytes) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// Answerer-side operations on one peer connection.
#[async_trait]
pub trait PeerLink: Send + Sync {
    async fn set_remote_description(&self, offer: SessionDescription) -> Result<()>;
    async fn create_answer(&self) -> Result<SessionDescription>;
    async fn set_local_description(&self, answer: SessionDescription) -> Result<()>;
    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// Factory for peer links. Events of the new link go to `events`.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(
        &self,
        session: SessionId,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Arc<dyn PeerLink>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::New => write!(f, "new"),
            LinkState::Connecting => write!(f, "connecting"),
            LinkState::Connected => write!(f, "connected"),
            LinkState::Disconnected => write!(f, "disconnected"),
            LinkState::Failed => write!(f, "failed"),
            LinkState::Closed => write!(f, "closed"),
        }
    }
}

pub enum PeerEvent {
    LocalCandidate { session: SessionId, candidate: IceCandidateInit },
    ChannelOpen { session: SessionId, channel: Arc<dyn DataChannel> },
    ChannelClosed { session: SessionId, channel: Arc<dyn DataChannel> },
    Track { session: SessionId, track: RemoteTrack },
    StateChanged { session: SessionId, state: LinkState },
    /// Result of the spawned negotiation task.
    Answered { session: SessionId, result: Result<SessionDescription> },
}

impl PeerEvent {
    pub fn session(&self) -> SessionId {
        match self {
            PeerEvent::LocalCandidate { session, .. }
            | PeerEvent::ChannelOpen { session, .. }
            | PeerEvent::ChannelClosed { session, .. }
            | PeerEvent::Track { session, .. }
            | PeerEvent::StateChanged { session, .. }
            | PeerEvent::Answered { session, .. } => *session,
        }
    }
}

impl fmt::Debug for PeerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerEvent::LocalCandidate { session, .. } => {
                write!(f, "LocalCandidate(session={session})")
            }
            PeerEvent::ChannelOpen { session, channel } => {
                write!(f, "ChannelOpen(session={session}, label={})", channel.label())
            }
            PeerEvent::ChannelClosed { session, channel } => {
                write!(f, "ChannelClosed(session={session}, label={})", channel.label())
            }
            PeerEvent::Track { session, track } => {
                write!(f, "Track(session={session}, id={})", track.id)
            }
            PeerEvent::StateChanged { session, state } => {
                write!(f, "StateChanged(session={session}, state={state})")
            }
            PeerEvent::Answered { session, result } => {
                write!(f, "Answered(session={session}, ok={})", result.is_ok())
            }
        }
    }
}
