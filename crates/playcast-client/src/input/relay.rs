use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use playcast_core::protocol::input::{InputEvent, MouseButton, PointerData, SurfaceRect};

use crate::peer::DataChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Up,
    Move,
}

/// A raw UI event, before translation to the wire schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalInput {
    Key {
        down: bool,
        key_code: u32,
    },
    Pointer {
        kind: PointerKind,
        button: MouseButton,
        client_x: f64,
        client_y: f64,
        surface: SurfaceRect,
    },
}

impl LocalInput {
    pub fn to_event(self) -> InputEvent {
        match self {
            LocalInput::Key { down: true, key_code } => InputEvent::KeyDown { key_code },
            LocalInput::Key { down: false, key_code } => InputEvent::KeyUp { key_code },
            LocalInput::Pointer {
                kind,
                button,
                client_x,
                client_y,
                surface,
            } => {
                let data = PointerData::relative(button, client_x, client_y, surface);
                match kind {
                    PointerKind::Down => InputEvent::MouseDown(data),
                    PointerKind::Up => InputEvent::MouseUp(data),
                    PointerKind::Move => InputEvent::MouseMove(data),
                }
            }
        }
    }
}

/// The channel a relay is currently forwarding to.
struct Attachment {
    token: u64,
    channel: Arc<dyn DataChannel>,
    frames: mpsc::Sender<String>,
}

/// Process-wide source of local input.
///
/// The open check happens here, at publish time: an event published while the
/// attached channel is not open is dropped and can never be sent later.
#[derive(Clone)]
pub struct InputBus {
    slot: Arc<Mutex<Option<Attachment>>>,
    next_token: Arc<AtomicU64>,
    capacity: usize,
}

impl InputBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            next_token: Arc::new(AtomicU64::new(1)),
            capacity: capacity.max(1),
        }
    }

    /// Publish one event; returns how many frames were queued (0 or 1).
    pub fn publish(&self, input: LocalInput) -> usize {
        let slot = self.slot();
        let Some(att) = slot.as_ref() else {
            return 0;
        };
        if !att.channel.is_open() {
            debug!(label = att.channel.label(), "input channel not open, event dropped");
            return 0;
        }

        let frame = match input.to_event().to_frame() {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "input event not encodable");
                return 0;
            }
        };
        match att.frames.try_send(frame) {
            Ok(()) => 1,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("input relay backlogged, event dropped");
                0
            }
            Err(mpsc::error::TrySendError::Closed(_)) => 0,
        }
    }

    pub fn listener_count(&self) -> usize {
        usize::from(self.slot().is_some())
    }

    fn slot(&self) -> MutexGuard<'_, Option<Attachment>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn install(&self, channel: Arc<dyn DataChannel>, frames: mpsc::Sender<String>) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        *self.slot() = Some(Attachment { token, channel, frames });
        token
    }

    fn remove(&self, token: u64) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|a| a.token == token) {
            *slot = None;
        }
    }
}

/// Forwards bus events to one channel while it is open.
pub struct InputRelay {
    bus: InputBus,
    attached: Option<(u64, JoinHandle<()>)>,
}

impl InputRelay {
    pub fn new(bus: InputBus) -> Self {
        Self { bus, attached: None }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Attach to `channel`, replacing any previous attachment.
    pub async fn attach(&mut self, channel: Arc<dyn DataChannel>) {
        self.detach().await;

        let (tx, mut rx) = mpsc::channel::<String>(self.bus.capacity);
        let token = self.bus.install(channel.clone(), tx);
        let task = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = channel.send_text(frame).await {
                    debug!(error = %e, "input send failed");
                }
            }
        });
        self.attached = Some((token, task));
    }

    /// Remove the attachment made by `attach`. Safe to call when detached.
    pub async fn detach(&mut self) {
        if let Some((token, task)) = self.attached.take() {
            self.bus.remove(token);
            task.abort();
            let _ = task.await;
        }
    }
}
