use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::debug;

use crate::peer::DataChannel;

pub const DEFAULT_HEARTBEAT: Duration = Duration::from_millis(2000);

/// Sends an empty binary frame every period while the channel stays open.
pub struct LivenessMonitor {
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl LivenessMonitor {
    pub fn new(period: Duration) -> Self {
        Self { period, task: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// True while the heartbeat timer is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Start the heartbeat on `channel`. The first frame goes out one period later.
    pub async fn attach(&mut self, channel: Arc<dyn DataChannel>) {
        self.detach().await;
        self.task = Some(tokio::spawn(heartbeat(channel, self.period)));
    }

    /// Cancel the timer. Returns false when there was nothing to cancel.
    pub async fn detach(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        task.abort();
        let _ = task.await;
        true
    }
}

async fn heartbeat(channel: Arc<dyn DataChannel>, period: Duration) {
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tick.tick().await;
        if !channel.is_open() {
            debug!(label = channel.label(), "health channel closed, heartbeat stopped");
            break;
        }
        if let Err(e) = channel.send_bytes(Bytes::new()).await {
            debug!(error = %e, "heartbeat send failed");
            break;
        }
    }
}
