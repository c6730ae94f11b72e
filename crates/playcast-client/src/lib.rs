//! playcast client library entry.
//!
//! This crate wires the control channel, peer session, input relay, liveness
//! monitor and session orchestrator into one client runtime. It is intended
//! to be consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod discovery;
pub mod health;
pub mod input;
pub mod peer;
pub mod session;
pub mod transport;
