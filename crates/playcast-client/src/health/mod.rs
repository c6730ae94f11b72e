//! Liveness heartbeat on the `health-check` data channel.

pub mod monitor;

pub use monitor::{LivenessMonitor, DEFAULT_HEARTBEAT};
