//! Protocol modules (coordinator signaling + data-channel input).
//!
//! - `envelope`: the `{type, receiverID?, data}` frame and its decoded `Signal` union.
//! - `transcoder`: Base64-wrapped JSON payloads for `sdp` / `ice-candidate`.
//! - `types`: roles, device classes, descriptions and candidates.
//! - `input`: keyboard/pointer events as sent on the `app-input` channel.
//!
//! All decoders are panic-free: malformed input is reported as `PlaycastError`
//! instead of panicking, and unknown envelope types decode to `None`.

pub mod envelope;
pub mod input;
pub mod transcoder;
pub mod types;

pub use envelope::{decode_text, encode_text, Envelope, Inbound, MessageType, Signal};
pub use input::{InputEvent, MouseButton, PointerData, SurfaceRect};
pub use types::{
    DeviceClass, IceCandidateInit, JoinData, Role, SdpType, SessionDescription, StartData,
};
