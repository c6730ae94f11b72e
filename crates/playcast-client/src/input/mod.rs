//! Local input forwarding onto the `app-input` data channel.

pub mod relay;

pub use relay::{InputBus, InputRelay, LocalInput, PointerKind};
