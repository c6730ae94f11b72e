//! playcast core: transport-agnostic signaling primitives and error types.
//!
//! This crate defines the wire-level contracts shared by the client runtime:
//! the coordinator envelope and its closed set of signals, the Base64/JSON
//! payload transcoder, and the input-event schema sent over the data channel.
//! It carries no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed coordinator traffic surfaces as `PlaycastError::Malformed`
//! so a bad frame can never take the session down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{PlaycastError, Result};
