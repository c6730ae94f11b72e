//! Transport layer (coordinator WebSocket).
//!
//! Exposes the control channel and the codec that decodes frames once
//! before they reach the session orchestrator.

pub mod codec;
pub mod ws;

pub use ws::{connect, ControlEvent, ControlHandle, SignalSink};
