//! Control channel to the coordinator.
//!
//! Responsibilities:
//! - Open one WebSocket connection per process (no reconnect)
//! - Serialize outbound envelopes through a bounded queue
//! - Decode inbound frames once; malformed frames are dropped
//! - Report the end of the connection exactly once (`Lost` or `Closed`)

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use playcast_core::error::{PlaycastError, Result};
use playcast_core::protocol::envelope::{encode_text, Envelope, Inbound};

use crate::transport::codec::{decode, Frame};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outbound half of the control channel as seen by the orchestrator.
pub trait SignalSink: Send + Sync {
    fn send(&self, env: Envelope) -> Result<()>;
    fn close(&self);
}

/// Events produced by the control channel.
#[derive(Debug)]
pub enum ControlEvent {
    Signal(Inbound),
    /// The coordinator or the network ended the connection.
    Lost { reason: String },
    /// Closed locally through [`SignalSink::close`].
    Closed,
}

enum Outbound {
    Text(String),
    Close,
}

#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<Outbound>,
}

impl SignalSink for ControlHandle {
    fn send(&self, env: Envelope) -> Result<()> {
        let text = encode_text(&env)?;
        self.tx.try_send(Outbound::Text(text)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                PlaycastError::Internal("control queue full".into())
            }
            mpsc::error::TrySendError::Closed(_) => {
                PlaycastError::Transport("control channel closed".into())
            }
        })
    }

    fn close(&self) {
        let _ = self.tx.try_send(Outbound::Close);
    }
}

/// Open the control channel. Failure to connect is fatal.
pub async fn connect(
    endpoint: &str,
    queue_capacity: usize,
) -> Result<(ControlHandle, mpsc::Receiver<ControlEvent>)> {
    let (socket, _resp) = connect_async(endpoint)
        .await
        .map_err(|e| PlaycastError::Transport(format!("connect {endpoint} failed: {e}")))?;
    info!(endpoint, "control channel open");

    let (out_tx, out_rx) = mpsc::channel(queue_capacity);
    let (ev_tx, ev_rx) = mpsc::channel(queue_capacity);
    tokio::spawn(pump(socket, out_rx, ev_tx));

    Ok((ControlHandle { tx: out_tx }, ev_rx))
}

async fn pump(
    socket: Socket,
    mut out_rx: mpsc::Receiver<Outbound>,
    ev_tx: mpsc::Sender<ControlEvent>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let end = loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                match maybe_out {
                    Some(Outbound::Text(s)) => {
                        if let Err(e) = ws_tx.send(Message::Text(s)).await {
                            break ControlEvent::Lost { reason: format!("write failed: {e}") };
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break ControlEvent::Closed;
                    }
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(incoming) = incoming else {
                    break ControlEvent::Lost { reason: "stream ended".into() };
                };
                let msg = match incoming {
                    Ok(m) => m,
                    Err(e) => break ControlEvent::Lost { reason: format!("read failed: {e}") },
                };

                match decode(msg) {
                    Ok(Frame::Signal(inbound)) => {
                        if ev_tx.send(ControlEvent::Signal(inbound)).await.is_err() {
                            let _ = ws_tx.send(Message::Close(None)).await;
                            break ControlEvent::Closed;
                        }
                    }
                    Ok(Frame::Ignored) => {}
                    Ok(Frame::Close) => {
                        break ControlEvent::Lost { reason: "closed by coordinator".into() };
                    }
                    Err(e) => {
                        debug!(kind = e.kind().as_str(), error = %e, "dropping control frame");
                    }
                }
            }
        }
    };

    if let ControlEvent::Lost { reason } = &end {
        warn!(%reason, "control channel lost");
    }
    let _ = ev_tx.send(end).await;
}
