//! Top-level facade crate for playcast.
//!
//! Re-exports the protocol core and the client runtime so users can depend on a single crate.

pub mod core {
    pub use playcast_core::*;
}

pub mod client {
    pub use playcast_client::*;
}
