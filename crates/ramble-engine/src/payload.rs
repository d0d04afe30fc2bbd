//! Decoding stored documents.
//!
//! Some storage nodes wrap a payload in framing bytes (archive headers,
//! trailing padding). The document is the slice from the first `{` to the
//! last `}`, parsed as JSON.

use ramble_types::ContentHash;
use serde::de::DeserializeOwned;

use crate::error::{EngineError, EngineResult};

/// The outermost `{ ... }` span of `payload`, if any.
pub fn unframe(payload: &[u8]) -> Option<&[u8]> {
    let start = payload.iter().position(|&b| b == b'{')?;
    let end = payload.iter().rposition(|&b| b == b'}')?;
    (start < end).then(|| &payload[start..=end])
}

/// Strip framing from the payload stored under `hash` and parse it.
pub fn decode<T: DeserializeOwned>(hash: &ContentHash, payload: &[u8]) -> EngineResult<T> {
    let document = unframe(payload).ok_or_else(|| EngineError::MalformedPayload {
        hash: *hash,
        reason: "no JSON object in payload".into(),
    })?;
    serde_json::from_slice(document).map_err(|e| EngineError::MalformedPayload {
        hash: *hash,
        reason: e.to_string(),
    })
}
