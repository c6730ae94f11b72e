//! Decode-once codec for the control channel.
//!
//! - Text frames => `Inbound` signal (payload decoded into a closed variant)
//! - Unknown envelope types, binary frames and ping/pong are ignored
//! - Close is surfaced for lifecycle management

use tokio_tungstenite::tungstenite::Message;

use playcast_core::error::Result;
use playcast_core::protocol::envelope::{self, Inbound};

#[derive(Debug)]
pub enum Frame {
    Signal(Inbound),
    Ignored,
    Close,
}

pub fn decode(msg: Message) -> Result<Frame> {
    match msg {
        Message::Text(s) => Ok(envelope::decode_text(&s)?.map_or(Frame::Ignored, Frame::Signal)),
        Message::Close(_) => Ok(Frame::Close),
        Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
            Ok(Frame::Ignored)
        }
    }
}
