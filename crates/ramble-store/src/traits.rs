use std::sync::Arc;

use async_trait::async_trait;
use ramble_types::{ContentHash, Endpoint};

use crate::error::StoreResult;

/// Body of a pin confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinResponse {
    /// Hashes the node reports as pinned.
    pub pins: Vec<ContentHash>,
    /// Raw response text, kept for diagnostics.
    pub body: String,
}

impl PinResponse {
    pub fn pinned(hash: ContentHash) -> Self {
        Self {
            pins: vec![hash],
            body: format!("{{\"Pins\":[\"{hash}\"]}}"),
        }
    }

    /// Some gateways answer with an HTML error page and a success status.
    /// Such a response does not count as a pin.
    pub fn is_error_page(&self) -> bool {
        self.body.to_ascii_lowercase().contains("<html>")
    }
}

/// Primitives exposed by one content-addressed storage node.
///
/// Implementations must satisfy:
/// - `add` of identical bytes always yields the same hash.
/// - `pin` is idempotent: pinning a pinned hash changes nothing.
/// - `fetch` returns the complete payload, never a partial one.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store bytes and return their content hash.
    async fn add(&self, data: &[u8]) -> StoreResult<ContentHash>;

    /// Return the full payload stored under `hash`.
    async fn fetch(&self, hash: &ContentHash) -> StoreResult<Vec<u8>>;

    /// Ask the node to retain `hash` indefinitely.
    async fn pin(&self, hash: &ContentHash) -> StoreResult<PinResponse>;
}

/// Builds a [`ContentStore`] for a given endpoint.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, endpoint: &Endpoint) -> StoreResult<Arc<dyn ContentStore>>;
}
