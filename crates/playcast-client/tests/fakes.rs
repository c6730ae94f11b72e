//! In-process fakes for the client seams.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use playcast_client::peer::{DataChannel, PeerConnector, PeerEvent, PeerLink, SessionId};
use playcast_client::transport::SignalSink;
use playcast_core::error::{PlaycastError, Result};
use playcast_core::protocol::envelope::Envelope;
use playcast_core::protocol::types::{IceCandidateInit, SessionDescription};

#[derive(Default)]
pub struct FakeSink {
    sent: Mutex<Vec<Envelope>>,
    closed: AtomicBool,
}

impl FakeSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().unwrap().clone()
    }

    pub fn of_type(&self, msg_type: &str) -> Vec<Envelope> {
        self.sent().into_iter().filter(|e| e.msg_type == msg_type).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl SignalSink for FakeSink {
    fn send(&self, env: Envelope) -> Result<()> {
        if self.is_closed() {
            return Err(PlaycastError::Transport("closed".into()));
        }
        self.sent.lock().unwrap().push(env);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub struct FakeChannel {
    label: String,
    open: AtomicBool,
    texts: Mutex<Vec<String>>,
    frames: Mutex<Vec<Bytes>>,
}

impl FakeChannel {
    pub fn new(label: &str, open: bool) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            open: AtomicBool::new(open),
            texts: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
        })
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn frames(&self) -> Vec<Bytes> {
        self.frames.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataChannel for FakeChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send_text(&self, text: String) -> Result<()> {
        if !self.is_open() {
            return Err(PlaycastError::Media("channel closed".into()));
        }
        self.texts.lock().unwrap().push(text);
        Ok(())
    }

    async fn send_bytes(&self, data: Bytes) -> Result<()> {
        if !self.is_open() {
            return Err(PlaycastError::Media("channel closed".into()));
        }
        self.frames.lock().unwrap().push(data);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.set_open(false);
        Ok(())
    }
}

/// Shared, ordered record of peer operations, e.g. `set_remote:1`.
pub type OpLog = Arc<Mutex<Vec<String>>>;

pub fn ops(log: &OpLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub struct FakeLink {
    id: SessionId,
    log: OpLog,
}

impl FakeLink {
    pub fn new(id: SessionId, log: OpLog) -> Arc<Self> {
        Arc::new(Self { id, log })
    }

    fn record(&self, op: &str) {
        self.log.lock().unwrap().push(format!("{op}:{}", self.id));
    }
}

#[async_trait]
impl PeerLink for FakeLink {
    async fn set_remote_description(&self, _offer: SessionDescription) -> Result<()> {
        self.record("set_remote");
        Ok(())
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.record("create_answer");
        Ok(SessionDescription::answer(format!("answer-{}", self.id)))
    }

    async fn set_local_description(&self, _answer: SessionDescription) -> Result<()> {
        self.record("set_local");
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<()> {
        if candidate.candidate.contains("bogus") {
            self.record("reject_candidate");
            return Err(PlaycastError::Media("bad candidate".into()));
        }
        self.record("add_candidate");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record("close");
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeConnector {
    pub log: OpLog,
    events: Mutex<Vec<(SessionId, mpsc::UnboundedSender<PeerEvent>)>>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ops(&self) -> Vec<String> {
        ops(&self.log)
    }

    /// Inject a peer event the way the link for `session` would.
    pub fn emit(&self, session: SessionId, ev: PeerEvent) {
        let events = self.events.lock().unwrap();
        let (_, tx) = events
            .iter()
            .find(|(id, _)| *id == session)
            .expect("no link for session");
        tx.send(ev).unwrap();
    }
}

#[async_trait]
impl PeerConnector for FakeConnector {
    async fn connect(
        &self,
        session: SessionId,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Arc<dyn PeerLink>> {
        self.log.lock().unwrap().push(format!("connect:{session}"));
        self.events.lock().unwrap().push((session, events));
        Ok(FakeLink::new(session, self.log.clone()))
    }
}

pub fn candidate(s: &str) -> IceCandidateInit {
    IceCandidateInit {
        candidate: s.to_string(),
        sdp_mid: Some("0".into()),
        sdp_mline_index: Some(0),
        username_fragment: None,
    }
}
