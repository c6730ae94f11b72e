//! One peer connection driven as the answerer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use playcast_core::error::{PlaycastError, Result};
use playcast_core::protocol::types::{IceCandidateInit, SdpType, SessionDescription};

use super::{PeerLink, SessionId};

#[derive(Default)]
struct CandidateGate {
    remote_set: bool,
    pending: Vec<IceCandidateInit>,
}

pub struct PeerSession {
    id: SessionId,
    link: Arc<dyn PeerLink>,
    gate: Mutex<CandidateGate>,
    closed: AtomicBool,
}

impl PeerSession {
    pub fn new(id: SessionId, link: Arc<dyn PeerLink>) -> Self {
        Self {
            id,
            link,
            gate: Mutex::new(CandidateGate::default()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn gate(&self) -> MutexGuard<'_, CandidateGate> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply a remote offer and produce the local answer.
    ///
    /// Order: remote description, queued candidates, answer, local description.
    pub async fn negotiate_answer(&self, offer: SessionDescription) -> Result<SessionDescription> {
        if offer.sdp_type != SdpType::Offer {
            return Err(PlaycastError::Malformed(format!(
                "expected offer, got {:?}",
                offer.sdp_type
            )));
        }
        if self.is_closed() {
            return Err(PlaycastError::Stale(self.id));
        }

        self.link.set_remote_description(offer).await?;

        let pending = {
            let mut gate = self.gate();
            gate.remote_set = true;
            std::mem::take(&mut gate.pending)
        };
        if !pending.is_empty() {
            debug!(session = self.id, count = pending.len(), "flushing queued candidates");
        }
        for candidate in pending {
            self.apply_candidate(candidate).await;
        }

        let answer = self.link.create_answer().await?;
        self.link.set_local_description(answer.clone()).await?;
        Ok(answer)
    }

    /// Apply a trickled remote candidate, or queue it until the offer is applied.
    /// Never fails: a rejected candidate is logged and dropped.
    pub async fn add_remote_candidate(&self, candidate: IceCandidateInit) {
        if self.is_closed() {
            debug!(session = self.id, "candidate after close ignored");
            return;
        }
        {
            let mut gate = self.gate();
            if !gate.remote_set {
                gate.pending.push(candidate);
                return;
            }
        }
        self.apply_candidate(candidate).await;
    }

    async fn apply_candidate(&self, candidate: IceCandidateInit) {
        if let Err(e) = self.link.add_ice_candidate(candidate).await {
            warn!(session = self.id, error = %e, "remote candidate rejected");
        }
    }

    /// Release the connection. Safe to call more than once.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.gate().pending.clear();
        if let Err(e) = self.link.close().await {
            debug!(session = self.id, error = %e, "peer close failed");
        }
    }
}
