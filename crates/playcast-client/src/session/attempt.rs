use std::sync::Arc;

use tokio::task::JoinHandle;

use playcast_core::protocol::types::DeviceClass;

use crate::peer::{DataChannel, MediaAggregate, PeerSession, SessionId};

/// One negotiation attempt and everything it owns.
pub struct Session {
    pub id: SessionId,
    pub app_id: String,
    pub provider_id: Option<String>,
    pub device: DeviceClass,
    pub peer: Arc<PeerSession>,
    /// `senderID` of the most recent offer.
    pub remote_id: Option<String>,
    pub input_channel: Option<Arc<dyn DataChannel>>,
    pub health_channel: Option<Arc<dyn DataChannel>>,
    pub media: MediaAggregate,
    pub(crate) negotiation: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(
        id: SessionId,
        app_id: String,
        provider_id: Option<String>,
        device: DeviceClass,
        peer: Arc<PeerSession>,
    ) -> Self {
        Self {
            id,
            app_id,
            provider_id,
            device,
            peer,
            remote_id: None,
            input_channel: None,
            health_channel: None,
            media: MediaAggregate::new(),
            negotiation: None,
        }
    }

    /// Where answers and local candidates are addressed.
    pub fn reply_target(&self) -> Option<&str> {
        self.provider_id.as_deref().or(self.remote_id.as_deref())
    }

    pub(crate) fn abort_negotiation(&mut self) {
        if let Some(task) = self.negotiation.take() {
            task.abort();
        }
    }
}
