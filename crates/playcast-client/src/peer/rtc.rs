//! webrtc-rs backend for the peer seams.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

use playcast_core::error::{PlaycastError, Result};
use playcast_core::protocol::types::{IceCandidateInit, SessionDescription};

use super::{
    DataChannel, LinkState, PeerConnector, PeerEvent, PeerLink, RemoteTrack, SessionId, TrackKind,
};
use crate::config::IceSection;

fn media_err(what: &str, e: impl std::fmt::Display) -> PlaycastError {
    PlaycastError::Media(format!("{what}: {e}"))
}

/// Creates one `RTCPeerConnection` per session.
pub struct RtcConnector {
    ice_servers: Vec<RTCIceServer>,
}

impl RtcConnector {
    pub fn new(ice: &IceSection) -> Self {
        let mut ice_servers: Vec<RTCIceServer> = ice
            .stun_servers
            .iter()
            .map(|url| RTCIceServer {
                urls: vec![url.clone()],
                ..Default::default()
            })
            .collect();

        for turn in &ice.turn_servers {
            ice_servers.push(RTCIceServer {
                urls: turn.urls.clone(),
                username: turn.username.clone(),
                credential: turn.credential.clone(),
                ..Default::default()
            });
        }

        Self { ice_servers }
    }
}

#[async_trait]
impl PeerConnector for RtcConnector {
    async fn connect(
        &self,
        session: SessionId,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Arc<dyn PeerLink>> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| media_err("register codecs", e))?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|e| media_err("register interceptors", e))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: self.ice_servers.clone(),
            ..Default::default()
        };
        let pc = Arc::new(
            api.new_peer_connection(config)
                .await
                .map_err(|e| media_err("create peer connection", e))?,
        );

        install_handlers(&pc, session, events);
        info!(session, "peer connection created");

        Ok(Arc::new(RtcPeer { pc }))
    }
}

fn install_handlers(
    pc: &RTCPeerConnection,
    session: SessionId,
    events: mpsc::UnboundedSender<PeerEvent>,
) {
    let tx = events.clone();
    pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
        let tx = tx.clone();
        Box::pin(async move {
            let state = match s {
                RTCPeerConnectionState::New => LinkState::New,
                RTCPeerConnectionState::Connecting => LinkState::Connecting,
                RTCPeerConnectionState::Connected => LinkState::Connected,
                RTCPeerConnectionState::Disconnected => LinkState::Disconnected,
                RTCPeerConnectionState::Failed => LinkState::Failed,
                RTCPeerConnectionState::Closed => LinkState::Closed,
                _ => return,
            };
            let _ = tx.send(PeerEvent::StateChanged { session, state });
        })
    }));

    let tx = events.clone();
    pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
        let tx = tx.clone();
        Box::pin(async move {
            // `None` marks the end of gathering.
            let Some(c) = candidate else { return };
            match c.to_json() {
                Ok(init) => {
                    let _ = tx.send(PeerEvent::LocalCandidate {
                        session,
                        candidate: IceCandidateInit {
                            candidate: init.candidate,
                            sdp_mid: init.sdp_mid,
                            sdp_mline_index: init.sdp_mline_index,
                            username_fragment: init.username_fragment,
                        },
                    });
                }
                Err(e) => warn!(session, error = %e, "local candidate not serializable"),
            }
        })
    }));

    let tx = events.clone();
    pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
        let tx = tx.clone();
        Box::pin(async move {
            let label = dc.label().to_string();
            debug!(session, %label, "remote data channel announced");

            let channel: Arc<dyn DataChannel> = Arc::new(RtcChannel {
                label,
                dc: dc.clone(),
            });

            let close_tx = tx.clone();
            // Weak: the handler lives inside `dc`, which the channel owns.
            let closed = Arc::downgrade(&channel);
            dc.on_close(Box::new(move || {
                if let Some(channel) = closed.upgrade() {
                    let _ = close_tx.send(PeerEvent::ChannelClosed { session, channel });
                }
                Box::pin(async {})
            }));

            // Fires immediately if the channel is already open.
            dc.on_open(Box::new(move || {
                let _ = tx.send(PeerEvent::ChannelOpen { session, channel });
                Box::pin(async {})
            }));
        })
    }));

    pc.on_track(Box::new(move |track: Arc<TrackRemote>, _receiver, _transceiver| {
        let tx = events.clone();
        Box::pin(async move {
            let kind = match track.kind() {
                RTPCodecType::Audio => TrackKind::Audio,
                RTPCodecType::Video => TrackKind::Video,
                _ => TrackKind::Unknown,
            };
            let stream_id = Some(track.stream_id()).filter(|s| !s.is_empty());
            let remote = RemoteTrack {
                id: track.id(),
                kind,
                stream_id,
            };
            let _ = tx.send(PeerEvent::Track { session, track: remote });

            // Keep the receive buffers drained until the connection goes away.
            tokio::spawn(async move {
                while track.read_rtp().await.is_ok() {}
                debug!(session, "remote track ended");
            });
        })
    }));
}

struct RtcPeer {
    pc: Arc<RTCPeerConnection>,
}

#[async_trait]
impl PeerLink for RtcPeer {
    async fn set_remote_description(&self, offer: SessionDescription) -> Result<()> {
        let desc =
            RTCSessionDescription::offer(offer.sdp).map_err(|e| media_err("invalid offer", e))?;
        self.pc
            .set_remote_description(desc)
            .await
            .map_err(|e| media_err("set remote description", e))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(|e| media_err("create answer", e))?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, answer: SessionDescription) -> Result<()> {
        let desc = RTCSessionDescription::answer(answer.sdp)
            .map_err(|e| media_err("invalid answer", e))?;
        self.pc
            .set_local_description(desc)
            .await
            .map_err(|e| media_err("set local description", e))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment,
        };
        self.pc
            .add_ice_candidate(init)
            .await
            .map_err(|e| media_err("add ice candidate", e))
    }

    async fn close(&self) -> Result<()> {
        self.pc.close().await.map_err(|e| media_err("close peer connection", e))
    }
}

struct RtcChannel {
    label: String,
    dc: Arc<RTCDataChannel>,
}

#[async_trait]
impl DataChannel for RtcChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        self.dc.ready_state() == RTCDataChannelState::Open
    }

    async fn send_text(&self, text: String) -> Result<()> {
        self.dc
            .send_text(text)
            .await
            .map(|_| ())
            .map_err(|e| media_err("data channel send", e))
    }

    async fn send_bytes(&self, data: Bytes) -> Result<()> {
        self.dc
            .send(&data)
            .await
            .map(|_| ())
            .map_err(|e| media_err("data channel send", e))
    }

    async fn close(&self) -> Result<()> {
        self.dc.close().await.map_err(|e| media_err("data channel close", e))
    }
}
