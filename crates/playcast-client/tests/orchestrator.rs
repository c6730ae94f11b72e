#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

use playcast_client::config::Topology;
use playcast_client::input::{InputBus, LocalInput};
use playcast_client::peer::{MediaStream, PeerEvent, RemoteTrack, TrackKind};
use playcast_client::session::{Orchestrator, SessionState, Settings, UiCommand};
use playcast_client::transport::ControlEvent;
use playcast_core::error::{ErrorKind, Result};
use playcast_core::protocol::envelope::{Inbound, Signal};
use playcast_core::protocol::transcoder::decode_payload;
use playcast_core::protocol::types::{DeviceClass, Role, SdpType, SessionDescription};

mod fakes;
use fakes::{candidate, FakeChannel, FakeConnector, FakeSink};

struct Harness {
    sink: Arc<FakeSink>,
    connector: Arc<FakeConnector>,
    bus: InputBus,
    control: mpsc::Sender<ControlEvent>,
    ui: mpsc::Sender<UiCommand>,
    state: watch::Receiver<SessionState>,
    stream: watch::Receiver<Option<MediaStream>>,
    task: JoinHandle<Result<()>>,
}

fn settings(role: Role, topology: Topology) -> Settings {
    Settings {
        role,
        topology,
        device: DeviceClass::Pc,
        heartbeat: Duration::from_millis(2000),
        owner_id: Some("owner-1".into()),
    }
}

fn spawn(settings: Settings) -> Harness {
    let sink = FakeSink::new();
    let connector = FakeConnector::new();
    let bus = InputBus::new(16);
    let orch = Orchestrator::new(sink.clone(), connector.clone(), bus.clone(), settings);
    let state = orch.watch_state();
    let stream = orch.watch_stream();

    let (control, control_rx) = mpsc::channel(16);
    let (ui, ui_rx) = mpsc::channel(16);
    let task = tokio::spawn(orch.run(control_rx, ui_rx));

    Harness { sink, connector, bus, control, ui, state, stream, task }
}

impl Harness {
    async fn wait_state(&mut self, want: SessionState) {
        timeout(Duration::from_secs(5), self.state.wait_for(|s| *s == want))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {want}"))
            .unwrap();
    }

    async fn ui(&self, cmd: UiCommand) {
        self.ui.send(cmd).await.unwrap();
    }

    async fn signal(&self, sender: Option<&str>, signal: Signal) {
        let inbound = Inbound { sender_id: sender.map(str::to_string), signal };
        self.control.send(ControlEvent::Signal(inbound)).await.unwrap();
    }

    async fn offer(&self, sender: Option<&str>) {
        self.signal(sender, Signal::Sdp(SessionDescription::offer("v=0\r\n"))).await;
    }
}

async fn settle() {
    sleep(Duration::from_millis(50)).await;
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn join_start_offer_yields_one_answer() {
    let mut h = spawn(settings(Role::Player, Topology::Direct));
    h.wait_state(SessionState::Joined).await;

    let sent = h.sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].msg_type, "join");
    assert_eq!(sent[0].data, r#"{"role":"player"}"#);

    h.ui(UiCommand::SelectApp("A1".into())).await;
    h.wait_state(SessionState::Starting).await;

    let start = &h.sink.of_type("start")[0];
    assert_eq!(start.data, r#"{"appID":"A1","device":"pc"}"#);
    assert!(start.receiver_id.is_none());
    assert_eq!(h.connector.ops(), ["connect:1"]);

    h.offer(Some("prov-9")).await;
    h.wait_state(SessionState::Negotiating).await;
    wait_until(|| !h.sink.of_type("sdp").is_empty()).await;
    settle().await;

    let answers = h.sink.of_type("sdp");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].receiver_id.as_deref(), Some("prov-9"));
    let answer: SessionDescription = decode_payload(&answers[0].data).unwrap();
    assert_eq!(answer.sdp_type, SdpType::Answer);
    assert_eq!(answer.sdp, "answer-1");

    assert_eq!(
        h.connector.ops(),
        ["connect:1", "set_remote:1", "create_answer:1", "set_local:1"]
    );
    assert_eq!(*h.state.borrow(), SessionState::Negotiating);
}

#[tokio::test]
async fn signaling_without_session_is_discarded() {
    let mut h = spawn(settings(Role::Player, Topology::Direct));
    h.wait_state(SessionState::Joined).await;

    let cand = candidate("candidate:1 1 udp 1 10.0.0.1 9 typ host");
    h.signal(Some("prov-9"), Signal::IceCandidate(cand)).await;
    h.offer(Some("prov-9")).await;
    settle().await;

    assert!(h.connector.ops().is_empty());
    assert_eq!(h.sink.sent().len(), 1);
    assert_eq!(*h.state.borrow(), SessionState::Joined);
    assert!(!h.task.is_finished());
}

#[tokio::test]
async fn local_candidates_follow_the_offer_sender() {
    let mut h = spawn(settings(Role::Player, Topology::Direct));
    h.wait_state(SessionState::Joined).await;
    h.ui(UiCommand::SelectApp("A1".into())).await;
    h.wait_state(SessionState::Starting).await;
    h.offer(Some("prov-9")).await;
    h.wait_state(SessionState::Negotiating).await;

    h.connector.emit(
        1,
        PeerEvent::LocalCandidate {
            session: 1,
            candidate: candidate("candidate:5 1 udp 1 192.0.2.5 9 typ host"),
        },
    );
    wait_until(|| !h.sink.of_type("ice-candidate").is_empty()).await;

    let ice = &h.sink.of_type("ice-candidate")[0];
    assert_eq!(ice.receiver_id.as_deref(), Some("prov-9"));
    let c: playcast_core::protocol::types::IceCandidateInit = decode_payload(&ice.data).unwrap();
    assert_eq!(c.candidate, "candidate:5 1 udp 1 192.0.2.5 9 typ host");

    // Remote candidates reach the link once the offer is applied.
    let cand = candidate("candidate:6 1 udp 1 192.0.2.6 9 typ host");
    h.signal(Some("prov-9"), Signal::IceCandidate(cand)).await;
    wait_until(|| h.connector.ops().contains(&"add_candidate:1".to_string())).await;
}

#[tokio::test]
async fn first_channel_activates_and_input_flows() {
    let mut h = spawn(settings(Role::Player, Topology::Direct));
    h.wait_state(SessionState::Joined).await;
    h.ui(UiCommand::SelectApp("A1".into())).await;
    h.wait_state(SessionState::Starting).await;
    h.offer(None).await;
    h.wait_state(SessionState::Negotiating).await;

    let input = FakeChannel::new("app-input", true);
    h.connector.emit(1, PeerEvent::ChannelOpen { session: 1, channel: input.clone() });
    h.wait_state(SessionState::Active).await;
    wait_until(|| h.bus.listener_count() == 1).await;

    h.bus.publish(LocalInput::Key { down: true, key_code: 32 });
    wait_until(|| input.texts().len() == 1).await;

    // Unaddressed answer when no provider and no sender are known.
    wait_until(|| !h.sink.of_type("sdp").is_empty()).await;
    assert!(h.sink.of_type("sdp")[0].receiver_id.is_none());
}

async fn negotiating(settings: Settings) -> Harness {
    let mut h = spawn(settings);
    h.wait_state(SessionState::Joined).await;
    h.ui(UiCommand::SelectApp("A1".into())).await;
    h.wait_state(SessionState::Starting).await;
    h.offer(Some("prov-9")).await;
    h.wait_state(SessionState::Negotiating).await;
    h
}

#[tokio::test]
async fn unrecognized_channel_is_ignored() {
    let mut h = negotiating(settings(Role::Player, Topology::Direct)).await;

    let video = FakeChannel::new("video-stream", true);
    h.connector.emit(1, PeerEvent::ChannelOpen { session: 1, channel: video.clone() });
    settle().await;
    assert_eq!(*h.state.borrow(), SessionState::Negotiating);
    assert_eq!(h.bus.listener_count(), 0);
    assert!(video.texts().is_empty());
    assert!(video.frames().is_empty());

    let input = FakeChannel::new("app-input", true);
    h.connector.emit(1, PeerEvent::ChannelOpen { session: 1, channel: input });
    h.wait_state(SessionState::Active).await;
}

#[tokio::test]
async fn channel_close_detaches_relay_and_monitor() {
    let mut fast = settings(Role::Player, Topology::Direct);
    fast.heartbeat = Duration::from_millis(20);
    let mut h = negotiating(fast).await;

    let input = FakeChannel::new("app-input", true);
    let health = FakeChannel::new("health-check", true);
    h.connector.emit(1, PeerEvent::ChannelOpen { session: 1, channel: input.clone() });
    h.connector.emit(1, PeerEvent::ChannelOpen { session: 1, channel: health.clone() });
    h.wait_state(SessionState::Active).await;
    wait_until(|| h.bus.listener_count() == 1 && !health.frames().is_empty()).await;

    h.connector.emit(1, PeerEvent::ChannelClosed { session: 1, channel: input.clone() });
    h.connector.emit(1, PeerEvent::ChannelClosed { session: 1, channel: health.clone() });
    wait_until(|| h.bus.listener_count() == 0).await;
    settle().await;

    let beats = health.frames().len();
    assert_eq!(h.bus.publish(LocalInput::Key { down: true, key_code: 32 }), 0);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(health.frames().len(), beats);
    assert!(input.texts().is_empty());
    assert_eq!(*h.state.borrow(), SessionState::Active);
}

#[tokio::test]
async fn late_close_of_replaced_channel_keeps_new_one() {
    let mut h = negotiating(settings(Role::Player, Topology::Direct)).await;

    let first = FakeChannel::new("app-input", true);
    let second = FakeChannel::new("app-input", true);
    h.connector.emit(1, PeerEvent::ChannelOpen { session: 1, channel: first.clone() });
    h.wait_state(SessionState::Active).await;
    h.connector.emit(1, PeerEvent::ChannelOpen { session: 1, channel: second.clone() });
    h.connector.emit(1, PeerEvent::ChannelClosed { session: 1, channel: first.clone() });
    settle().await;

    assert_eq!(h.bus.listener_count(), 1);
    assert_eq!(h.bus.publish(LocalInput::Key { down: true, key_code: 7 }), 1);
    wait_until(|| second.texts().len() == 1).await;
    assert!(first.texts().is_empty());
}

#[tokio::test]
async fn tracks_aggregate_into_the_observed_stream() {
    let mut h = spawn(settings(Role::Player, Topology::Direct));
    h.wait_state(SessionState::Joined).await;
    h.ui(UiCommand::SelectApp("A1".into())).await;
    h.wait_state(SessionState::Starting).await;
    h.offer(Some("prov-9")).await;
    h.wait_state(SessionState::Negotiating).await;

    for (id, kind) in [("v0", TrackKind::Video), ("a0", TrackKind::Audio)] {
        let track = RemoteTrack { id: id.into(), kind, stream_id: None };
        h.connector.emit(1, PeerEvent::Track { session: 1, track });
    }
    h.wait_state(SessionState::Active).await;
    timeout(
        Duration::from_secs(5),
        h.stream.wait_for(|s| s.as_ref().is_some_and(|s| s.tracks.len() == 2)),
    )
    .await
    .unwrap()
    .unwrap();

    h.ui(UiCommand::Exit).await;
    h.wait_state(SessionState::Joined).await;
    assert!(h.stream.borrow().is_none());
    assert!(h.connector.ops().contains(&"close:1".to_string()));
}

#[tokio::test]
async fn one_session_at_a_time() {
    let mut h = spawn(settings(Role::Player, Topology::Direct));
    h.wait_state(SessionState::Joined).await;
    h.ui(UiCommand::SelectApp("A1".into())).await;
    h.wait_state(SessionState::Starting).await;
    h.offer(Some("prov-9")).await;
    h.wait_state(SessionState::Negotiating).await;

    let input = FakeChannel::new("app-input", true);
    let health = FakeChannel::new("health-check", true);
    h.connector.emit(1, PeerEvent::ChannelOpen { session: 1, channel: input.clone() });
    h.connector.emit(1, PeerEvent::ChannelOpen { session: 1, channel: health.clone() });
    h.wait_state(SessionState::Active).await;
    wait_until(|| h.bus.listener_count() == 1).await;

    h.ui(UiCommand::SelectApp("A2".into())).await;
    wait_until(|| h.connector.ops().contains(&"connect:2".to_string())).await;
    h.wait_state(SessionState::Starting).await;

    let ops = h.connector.ops();
    let close_1 = ops.iter().position(|o| o == "close:1").expect("close:1");
    let connect_2 = ops.iter().position(|o| o == "connect:2").expect("connect:2");
    assert!(close_1 < connect_2, "{ops:?}");
    assert_eq!(h.bus.listener_count(), 0);
    assert!(h.stream.borrow().is_none());
    assert_eq!(h.sink.of_type("start").len(), 2);

    // Nothing is sent on the old session's channels any more.
    h.bus.publish(LocalInput::Key { down: true, key_code: 13 });
    settle().await;
    assert!(input.texts().is_empty());
}

#[tokio::test]
async fn stale_peer_events_are_dropped() {
    let mut h = spawn(settings(Role::Player, Topology::Direct));
    h.wait_state(SessionState::Joined).await;
    h.ui(UiCommand::SelectApp("A1".into())).await;
    h.wait_state(SessionState::Starting).await;
    h.ui(UiCommand::SelectApp("A2".into())).await;
    wait_until(|| h.connector.ops().contains(&"connect:2".to_string())).await;

    h.connector.emit(
        1,
        PeerEvent::Answered { session: 1, result: Ok(SessionDescription::answer("late")) },
    );
    h.connector.emit(
        1,
        PeerEvent::Track {
            session: 1,
            track: RemoteTrack { id: "v".into(), kind: TrackKind::Video, stream_id: None },
        },
    );
    h.connector.emit(
        1,
        PeerEvent::ChannelOpen { session: 1, channel: FakeChannel::new("app-input", true) },
    );
    settle().await;

    assert!(h.sink.of_type("sdp").is_empty());
    assert!(h.stream.borrow().is_none());
    assert_eq!(h.bus.listener_count(), 0);
    assert_eq!(*h.state.borrow(), SessionState::Starting);
}

#[tokio::test]
async fn mediated_start_is_addressed_to_the_provider() {
    let mut h = spawn(settings(Role::Player, Topology::Mediated));
    h.wait_state(SessionState::Joined).await;

    // No provider yet: nothing happens.
    h.ui(UiCommand::SelectApp("A1".into())).await;
    settle().await;
    assert!(h.sink.of_type("start").is_empty());

    h.ui(UiCommand::BrowseProviders).await;
    h.wait_state(SessionState::AwaitingProviderSelection).await;
    h.ui(UiCommand::SelectProvider("p-1".into())).await;
    h.ui(UiCommand::SelectApp("A1".into())).await;
    h.wait_state(SessionState::Starting).await;
    assert_eq!(h.sink.of_type("start")[0].receiver_id.as_deref(), Some("p-1"));

    h.offer(Some("relay-7")).await;
    wait_until(|| !h.sink.of_type("sdp").is_empty()).await;
    assert_eq!(h.sink.of_type("sdp")[0].receiver_id.as_deref(), Some("p-1"));
}

#[tokio::test]
async fn provider_join_carries_owner_and_records_acceptance() {
    let mut h = spawn(settings(Role::Provider, Topology::Direct));
    h.wait_state(SessionState::Joined).await;
    assert_eq!(h.sink.sent()[0].data, r#"{"role":"provider","ownerID":"owner-1"}"#);

    h.signal(None, Signal::Accepted("x7Kq2a".into())).await;
    settle().await;
    assert_eq!(*h.state.borrow(), SessionState::Joined);
}

#[tokio::test]
async fn failed_negotiation_returns_to_joined() {
    let mut h = spawn(settings(Role::Player, Topology::Direct));
    h.wait_state(SessionState::Joined).await;
    h.ui(UiCommand::SelectApp("A1".into())).await;
    h.wait_state(SessionState::Starting).await;

    h.connector.emit(
        1,
        PeerEvent::Answered {
            session: 1,
            result: Err(playcast_core::PlaycastError::Media("ice failed".into())),
        },
    );
    h.wait_state(SessionState::Joined).await;
    assert!(h.connector.ops().contains(&"close:1".to_string()));
    assert!(h.sink.of_type("sdp").is_empty());
}

#[tokio::test]
async fn control_loss_is_fatal() {
    let mut h = spawn(settings(Role::Player, Topology::Direct));
    h.wait_state(SessionState::Joined).await;
    h.ui(UiCommand::SelectApp("A1".into())).await;
    h.wait_state(SessionState::Starting).await;

    h.control
        .send(ControlEvent::Lost { reason: "closed by coordinator".into() })
        .await
        .unwrap();
    h.wait_state(SessionState::Closed).await;

    let err = h.task.await.unwrap().expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::TransportFatal);
    assert!(h.connector.ops().contains(&"close:1".to_string()));
}

#[tokio::test]
async fn shutdown_closes_control_channel() {
    let mut h = spawn(settings(Role::Player, Topology::Direct));
    h.wait_state(SessionState::Joined).await;
    h.ui(UiCommand::Shutdown).await;

    h.task.await.unwrap().expect("clean shutdown");
    assert!(h.sink.is_closed());
    assert_eq!(*h.state.borrow(), SessionState::Closed);
}
