//! Base64/JSON payload codec.
//!
//! `sdp` and `ice-candidate` envelopes carry their object as standard Base64
//! of its JSON encoding so it survives inside the single `data` string.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{PlaycastError, Result};

/// JSON-encode `value`, then Base64 the bytes.
pub fn encode_payload<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| PlaycastError::Internal(format!("json encode failed: {e}")))?;
    Ok(BASE64.encode(json))
}

/// Reverse of [`encode_payload`]. Invalid Base64 or JSON is `Malformed`.
pub fn decode_payload<T: DeserializeOwned>(data: &str) -> Result<T> {
    let raw = BASE64
        .decode(data.trim())
        .map_err(|e| PlaycastError::Malformed(format!("invalid base64 payload: {e}")))?;
    serde_json::from_slice(&raw)
        .map_err(|e| PlaycastError::Malformed(format!("invalid json payload: {e}")))
}
