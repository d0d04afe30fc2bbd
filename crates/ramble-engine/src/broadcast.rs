use std::sync::Arc;

use ramble_store::{StoreConnector, StoreResult};
use ramble_types::{ContentHash, Endpoint};
use tracing::{debug, info, warn};

use crate::config::BroadcastMode;
use crate::error::{EngineError, EngineResult};
use crate::pool::EndpointPool;

/// Outcome of replicating to a single endpoint.
#[derive(Debug, PartialEq, Eq)]
enum NodeOutcome {
    Pinned,
    /// The node answered the pin with an error page instead of an API
    /// response. Not counted, but not a failure either.
    ErrorPage,
}

/// Replicates a payload to every endpoint in the pool.
///
/// Endpoints are visited sequentially, in pool order, each through its own
/// connection; the pool's binding is never touched.
#[derive(Clone)]
pub struct BroadcastPinner {
    pool: Arc<EndpointPool>,
    mode: BroadcastMode,
}

impl BroadcastPinner {
    pub fn new(pool: Arc<EndpointPool>, mode: BroadcastMode) -> Self {
        Self { pool, mode }
    }

    pub fn mode(&self) -> BroadcastMode {
        self.mode
    }

    /// Add `data` to every pool endpoint and pin `hash` there.
    ///
    /// Returns the endpoints that pinned, in pool order. In
    /// [`BroadcastMode::FailFast`] the first failing endpoint aborts with its
    /// error; in [`BroadcastMode::BestEffort`] it is skipped.
    pub async fn broadcast_pin(
        &self,
        data: &[u8],
        hash: &ContentHash,
    ) -> EngineResult<Vec<Endpoint>> {
        let connector = self.pool.connector();
        let nodes = self.pool.nodes();
        let mut pinned = Vec::with_capacity(nodes.len());

        for endpoint in nodes {
            match replicate(connector.as_ref(), &endpoint, data, hash).await {
                Ok(NodeOutcome::Pinned) => {
                    debug!(%hash, %endpoint, "pinned");
                    pinned.push(endpoint);
                }
                Ok(NodeOutcome::ErrorPage) => {
                    debug!(%hash, %endpoint, "pin answered with an error page, not counted");
                }
                Err(err) => match self.mode {
                    BroadcastMode::FailFast => {
                        warn!(%hash, %endpoint, error = %err, "broadcast aborted");
                        return Err(EngineError::from(err));
                    }
                    BroadcastMode::BestEffort => {
                        warn!(%hash, %endpoint, error = %err, "broadcast skipped endpoint");
                    }
                },
            }
        }

        info!(%hash, pinned = pinned.len(), "broadcast complete");
        Ok(pinned)
    }
}

async fn replicate(
    connector: &dyn StoreConnector,
    endpoint: &Endpoint,
    data: &[u8],
    hash: &ContentHash,
) -> StoreResult<NodeOutcome> {
    let store = connector.connect(endpoint)?;
    let stored = store.add(data).await?;
    if stored != *hash {
        debug!(%endpoint, %stored, %hash, "node stored the payload under another hash");
    }
    let response = store.pin(hash).await?;
    if response.is_error_page() {
        return Ok(NodeOutcome::ErrorPage);
    }
    Ok(NodeOutcome::Pinned)
}

impl std::fmt::Debug for BroadcastPinner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastPinner")
            .field("mode", &self.mode)
            .finish()
    }
}
