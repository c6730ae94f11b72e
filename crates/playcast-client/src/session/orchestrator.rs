//! Top-level session state machine.
//!
//! Three event sources are multiplexed on one task:
//! - control channel frames (`ControlEvent`)
//! - peer connection events (`PeerEvent`, tagged with a session id)
//! - local UI commands (`UiCommand`)
//!
//! Only one `Session` exists at a time. Starting a new one tears the previous
//! one down first, and peer events carrying a superseded session id are dropped.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use playcast_core::error::{PlaycastError, Result};
use playcast_core::protocol::envelope::{Inbound, Signal};
use playcast_core::protocol::types::{
    DeviceClass, IceCandidateInit, JoinData, Role, SdpType, SessionDescription, StartData,
};

use crate::config::{ClientConfig, Topology};
use crate::health::LivenessMonitor;
use crate::input::{InputBus, InputRelay};
use crate::peer::{
    DataChannel, MediaStream, PeerConnector, PeerEvent, PeerSession, SessionId, HEALTH_LABEL,
    INPUT_LABEL,
};
use crate::session::attempt::Session;
use crate::session::state::{advance, SessionState, Trigger};
use crate::transport::{ControlEvent, SignalSink};

/// Static behaviour of the orchestrator.
#[derive(Debug, Clone)]
pub struct Settings {
    pub role: Role,
    pub topology: Topology,
    pub device: DeviceClass,
    pub heartbeat: Duration,
    pub owner_id: Option<String>,
}

impl Settings {
    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self {
            role: cfg.session.role,
            topology: cfg.session.topology,
            device: cfg.session.device.resolve(),
            heartbeat: Duration::from_millis(cfg.session.heartbeat_interval_ms),
            owner_id: cfg.session.owner_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    BrowseProviders,
    SelectProvider(String),
    SelectApp(String),
    Exit,
    Shutdown,
}

enum Flow {
    Continue,
    Stop,
}

pub struct Orchestrator {
    sink: Arc<dyn SignalSink>,
    connector: Arc<dyn PeerConnector>,
    settings: Settings,

    peer_tx: mpsc::UnboundedSender<PeerEvent>,
    peer_rx: mpsc::UnboundedReceiver<PeerEvent>,
    state_tx: watch::Sender<SessionState>,
    stream_tx: watch::Sender<Option<MediaStream>>,

    session: Option<Session>,
    next_id: SessionId,
    provider_id: Option<String>,
    owner_id: Option<String>,

    input: InputRelay,
    health: LivenessMonitor,
}

impl Orchestrator {
    pub fn new(
        sink: Arc<dyn SignalSink>,
        connector: Arc<dyn PeerConnector>,
        input_bus: InputBus,
        settings: Settings,
    ) -> Self {
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (stream_tx, _) = watch::channel(None);
        let health = LivenessMonitor::new(settings.heartbeat);
        let owner_id = settings.owner_id.clone();

        Self {
            sink,
            connector,
            settings,
            peer_tx,
            peer_rx,
            state_tx,
            stream_tx,
            session: None,
            next_id: 1,
            provider_id: None,
            owner_id,
            input: InputRelay::new(input_bus),
            health,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn watch_stream(&self) -> watch::Receiver<Option<MediaStream>> {
        self.stream_tx.subscribe()
    }

    /// Owner id assigned by the coordinator (provider role) or configured.
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    fn fire(&self, trigger: Trigger) -> bool {
        let from = self.state();
        match advance(from, trigger) {
            Some(to) => {
                if to != from {
                    info!(%from, %to, ?trigger, "session state");
                    self.state_tx.send_replace(to);
                }
                true
            }
            None => {
                debug!(state = %from, ?trigger, "trigger ignored");
                false
            }
        }
    }

    /// Transport failures propagate; anything else is logged.
    fn send(&self, signal: Signal, receiver: Option<&str>) -> Result<()> {
        let env = signal.to_envelope(receiver)?;
        match self.sink.send(env) {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, "control send failed");
                Ok(())
            }
        }
    }

    /// Mark the control channel open and send `join`.
    pub fn begin(&mut self) -> Result<()> {
        self.fire(Trigger::ControlOpened);

        let mut join = JoinData::new(self.settings.role);
        if self.settings.role == Role::Provider {
            join.owner_id = self.owner_id.clone();
        }
        self.send(Signal::Join(join), None)?;
        self.fire(Trigger::JoinSent);
        Ok(())
    }

    /// Drive the state machine until shutdown or a fatal transport error.
    pub async fn run(
        mut self,
        mut control_rx: mpsc::Receiver<ControlEvent>,
        mut ui_rx: mpsc::Receiver<UiCommand>,
    ) -> Result<()> {
        if self.state() == SessionState::Idle {
            if let Err(e) = self.begin() {
                self.fail().await;
                return Err(e);
            }
        }

        loop {
            let step = tokio::select! {
                ev = control_rx.recv() => match ev {
                    Some(ev) => self.handle_control(ev).await,
                    None => Err(PlaycastError::Transport("control events ended".into())),
                },
                Some(ev) = self.peer_rx.recv() => {
                    self.handle_peer(ev).await.map(|_| Flow::Continue)
                }
                cmd = ui_rx.recv() => self.handle_ui(cmd.unwrap_or(UiCommand::Shutdown)).await,
            };

            match step {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => return Ok(()),
                Err(e) => {
                    self.fail().await;
                    return Err(e);
                }
            }
        }
    }

    async fn fail(&mut self) {
        self.teardown().await;
        self.fire(Trigger::ControlLost);
    }

    async fn handle_control(&mut self, ev: ControlEvent) -> Result<Flow> {
        match ev {
            ControlEvent::Signal(inbound) => {
                self.route(inbound).await?;
                Ok(Flow::Continue)
            }
            ControlEvent::Lost { reason } => Err(PlaycastError::Transport(reason)),
            ControlEvent::Closed => {
                self.teardown().await;
                self.fire(Trigger::Shutdown);
                Ok(Flow::Stop)
            }
        }
    }

    async fn route(&mut self, inbound: Inbound) -> Result<()> {
        let Inbound { sender_id, signal } = inbound;
        match signal {
            Signal::Sdp(desc) => self.on_remote_description(sender_id, desc),
            Signal::IceCandidate(candidate) => {
                self.on_remote_candidate(candidate).await;
                Ok(())
            }
            Signal::Accepted(owner) => {
                info!(owner_id = %owner, "coordinator accepted join");
                self.owner_id = Some(owner);
                Ok(())
            }
            Signal::Join(_) | Signal::Start(_) => {
                let kind = signal.message_type().as_str();
                debug!(kind, "not addressed to this role, ignored");
                Ok(())
            }
        }
    }

    fn on_remote_description(
        &mut self,
        sender_id: Option<String>,
        desc: SessionDescription,
    ) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            debug!("sdp without a session discarded");
            return Ok(());
        };
        if desc.sdp_type != SdpType::Offer {
            let sdp_type = desc.sdp_type;
            debug!(session = session.id, ?sdp_type, "non-offer description ignored");
            return Ok(());
        }
        if sender_id.is_some() {
            session.remote_id = sender_id;
        }

        // A newer offer replaces an in-flight negotiation.
        session.abort_negotiation();

        let sid = session.id;
        let peer = session.peer.clone();
        let tx = self.peer_tx.clone();
        session.negotiation = Some(tokio::spawn(async move {
            let result = peer.negotiate_answer(desc).await;
            let _ = tx.send(PeerEvent::Answered { session: sid, result });
        }));
        debug!(session = sid, "negotiation started");

        self.fire(Trigger::OfferReceived);
        Ok(())
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidateInit) {
        let Some(session) = self.session.as_ref() else {
            debug!("ice-candidate without a session discarded");
            return;
        };
        session.peer.add_remote_candidate(candidate).await;
    }

    async fn handle_peer(&mut self, ev: PeerEvent) -> Result<()> {
        let current = self.session.as_ref().map(|s| s.id);
        if current != Some(ev.session()) {
            debug!(event = ?ev, ?current, "stale peer event dropped");
            return Ok(());
        }

        match ev {
            PeerEvent::LocalCandidate { candidate, .. } => {
                let target = self.reply_target();
                self.send(Signal::IceCandidate(candidate), target.as_deref())?;
            }
            PeerEvent::Answered { result, .. } => self.on_answered(result).await?,
            PeerEvent::ChannelOpen { channel, .. } => self.on_channel_open(channel).await,
            PeerEvent::ChannelClosed { channel, .. } => self.on_channel_closed(channel).await,
            PeerEvent::Track { track, .. } => {
                if let Some(session) = self.session.as_mut() {
                    let kind = track.kind;
                    info!(session = session.id, track = %track.id, ?kind, "remote track");
                    let stream = session.media.add_track(track).clone();
                    self.stream_tx.send_replace(Some(stream));
                }
                self.media_flowing();
            }
            PeerEvent::StateChanged { session, state } => {
                info!(session, %state, "peer connection state");
            }
        }
        Ok(())
    }

    fn reply_target(&self) -> Option<String> {
        self.session.as_ref().and_then(|s| s.reply_target().map(str::to_string))
    }

    async fn on_answered(&mut self, result: Result<SessionDescription>) -> Result<()> {
        if let Some(session) = self.session.as_mut() {
            session.negotiation = None;
        }
        match result {
            Ok(answer) => {
                let target = self.reply_target();
                self.send(Signal::Sdp(answer), target.as_deref())
            }
            Err(e) => {
                warn!(kind = e.kind().as_str(), error = %e, "negotiation failed");
                self.teardown().await;
                self.fire(Trigger::SessionFailed);
                Ok(())
            }
        }
    }

    async fn on_channel_open(&mut self, channel: Arc<dyn DataChannel>) {
        let Some(session) = self.session.as_mut() else { return };
        let label = channel.label().to_string();
        match label.as_str() {
            INPUT_LABEL => {
                session.input_channel = Some(channel.clone());
                self.input.attach(channel).await;
            }
            HEALTH_LABEL => {
                session.health_channel = Some(channel.clone());
                self.health.attach(channel).await;
            }
            other => {
                debug!(label = other, "unrecognized data channel ignored");
                return;
            }
        }
        info!(session = session.id, %label, "data channel open");
        self.media_flowing();
    }

    /// Only the instance currently attached is detached; a late close from a
    /// replaced channel with the same label is ignored.
    async fn on_channel_closed(&mut self, channel: Arc<dyn DataChannel>) {
        let Some(session) = self.session.as_mut() else { return };
        let is = |slot: &Option<Arc<dyn DataChannel>>| {
            slot.as_ref().is_some_and(|c| Arc::ptr_eq(c, &channel))
        };
        let label = channel.label().to_string();
        if is(&session.input_channel) {
            session.input_channel = None;
            self.input.detach().await;
        } else if is(&session.health_channel) {
            session.health_channel = None;
            self.health.detach().await;
        } else {
            debug!(session = session.id, %label, "close of a channel not in use ignored");
            return;
        }
        info!(session = session.id, %label, "data channel closed");
    }

    fn media_flowing(&self) {
        if self.state() == SessionState::Negotiating {
            self.fire(Trigger::MediaFlowing);
        }
    }

    async fn handle_ui(&mut self, cmd: UiCommand) -> Result<Flow> {
        match cmd {
            UiCommand::BrowseProviders => {
                if self.settings.topology == Topology::Mediated {
                    self.fire(Trigger::ProvidersBrowsed);
                }
            }
            UiCommand::SelectProvider(id) => {
                info!(provider = %id, "provider selected");
                self.provider_id = Some(id);
                if self.settings.topology == Topology::Mediated {
                    self.fire(Trigger::ProvidersBrowsed);
                }
            }
            UiCommand::SelectApp(app_id) => self.start(app_id).await?,
            UiCommand::Exit => {
                if self.session.is_some() {
                    self.teardown().await;
                    self.fire(Trigger::UserExit);
                }
            }
            UiCommand::Shutdown => {
                self.teardown().await;
                self.sink.close();
                self.fire(Trigger::Shutdown);
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    /// Create a new session for `app_id` and send `start`.
    async fn start(&mut self, app_id: String) -> Result<()> {
        let provider_id = match self.settings.topology {
            Topology::Mediated => match self.provider_id.clone() {
                Some(p) => Some(p),
                None => {
                    warn!(app = %app_id, "no provider selected, start ignored");
                    return Ok(());
                }
            },
            Topology::Direct => None,
        };

        // Detach and close the previous session before creating the next one.
        if self.session.is_some() {
            self.teardown().await;
            self.fire(Trigger::UserExit);
        }
        if !matches!(
            self.state(),
            SessionState::Joined | SessionState::AwaitingProviderSelection
        ) {
            warn!(state = %self.state(), "start not allowed in this state");
            return Ok(());
        }

        let id = self.next_id;
        self.next_id += 1;

        let link = match self.connector.connect(id, self.peer_tx.clone()).await {
            Ok(link) => link,
            Err(e) => {
                warn!(session = id, error = %e, "peer connection setup failed");
                return Ok(());
            }
        };
        let peer = Arc::new(PeerSession::new(id, link));

        let device = self.settings.device;
        self.session = Some(Session::new(id, app_id.clone(), provider_id.clone(), device, peer));

        let start = StartData { app_id: app_id.clone(), device };
        self.send(Signal::Start(start), provider_id.as_deref())?;
        info!(session = id, app = %app_id, device = device.as_str(), "start sent");
        self.fire(Trigger::StartSent);
        Ok(())
    }

    /// Release the current session. Order: negotiation, input, health, peer, stream.
    async fn teardown(&mut self) {
        let Some(mut session) = self.session.take() else { return };
        session.abort_negotiation();
        self.input.detach().await;
        self.health.detach().await;
        session.input_channel = None;
        session.health_channel = None;
        session.peer.close().await;
        session.media.clear();
        self.stream_tx.send_replace(None);
        info!(session = session.id, "session torn down");
    }
}
