//! Shared error type across playcast crates.

use thiserror::Error;

/// Error classes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Control channel could not be opened or closed unexpectedly.
    TransportFatal,
    /// Unparseable envelope or payload.
    ProtocolMalformed,
    /// Message referencing a superseded session.
    StaleNegotiation,
    /// Peer connection, candidate, or data channel failure.
    LocalMedia,
    /// Invalid configuration.
    Config,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::TransportFatal => "TRANSPORT_FATAL",
            ErrorKind::ProtocolMalformed => "PROTOCOL_MALFORMED",
            ErrorKind::StaleNegotiation => "STALE_NEGOTIATION",
            ErrorKind::LocalMedia => "LOCAL_MEDIA",
            ErrorKind::Config => "CONFIG",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PlaycastError>;

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum PlaycastError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("malformed: {0}")]
    Malformed(String),
    #[error("stale session {0}")]
    Stale(u64),
    #[error("media: {0}")]
    Media(String),
    #[error("config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl PlaycastError {
    /// Map an error to its stable class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlaycastError::Transport(_) => ErrorKind::TransportFatal,
            PlaycastError::Malformed(_) => ErrorKind::ProtocolMalformed,
            PlaycastError::Stale(_) => ErrorKind::StaleNegotiation,
            PlaycastError::Media(_) => ErrorKind::LocalMedia,
            PlaycastError::Config(_) | PlaycastError::UnsupportedVersion => ErrorKind::Config,
            PlaycastError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Only transport failures end the client.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::TransportFatal
    }
}
