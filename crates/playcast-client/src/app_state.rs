//! Process-scoped client state.
//!
//! Built once at startup from the validated config and handed to everything
//! that needs it: the control channel endpoint, the input bus, the optional
//! discovery client, and the orchestrator wiring.

use std::sync::Arc;

use tokio::sync::mpsc;

use playcast_core::error::Result;

use crate::config::ClientConfig;
use crate::discovery::DiscoveryClient;
use crate::input::InputBus;
use crate::peer::{PeerConnector, RtcConnector};
use crate::session::{Orchestrator, Settings};
use crate::transport::{self, ControlEvent};

const INPUT_BUS_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ClientConfig,
    settings: Settings,
    input_bus: InputBus,
    discovery: Option<DiscoveryClient>,
}

impl AppState {
    pub fn new(cfg: ClientConfig) -> Self {
        let settings = Settings::from_config(&cfg);
        let discovery = cfg.coordinator.api_endpoint.as_deref().map(DiscoveryClient::new);

        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                settings,
                input_bus: InputBus::new(INPUT_BUS_CAPACITY),
                discovery,
            }),
        }
    }

    pub fn cfg(&self) -> &ClientConfig {
        &self.inner.cfg
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn input_bus(&self) -> &InputBus {
        &self.inner.input_bus
    }

    pub fn discovery(&self) -> Option<&DiscoveryClient> {
        self.inner.discovery.as_ref()
    }

    /// Open the control channel and build an orchestrator on top of it.
    pub async fn connect(&self) -> Result<(Orchestrator, mpsc::Receiver<ControlEvent>)> {
        let coord = &self.inner.cfg.coordinator;
        let (handle, events) = transport::connect(&coord.ws_endpoint, coord.queue_capacity).await?;

        let connector: Arc<dyn PeerConnector> = Arc::new(RtcConnector::new(&self.inner.cfg.ice));
        let orchestrator = Orchestrator::new(
            Arc::new(handle),
            connector,
            self.inner.input_bus.clone(),
            self.inner.settings.clone(),
        );
        Ok((orchestrator, events))
    }
}
