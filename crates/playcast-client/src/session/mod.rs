//! Session orchestration.
//!
//! - `state`: pure transition table over `SessionState`
//! - `attempt`: the aggregate of one negotiation attempt
//! - `orchestrator`: routes control, peer and UI events through the table

pub mod attempt;
pub mod orchestrator;
pub mod state;

pub use attempt::Session;
pub use orchestrator::{Orchestrator, Settings, UiCommand};
pub use state::{advance, SessionState, Trigger};
