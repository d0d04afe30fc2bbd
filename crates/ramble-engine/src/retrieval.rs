use std::sync::Arc;

use ramble_ledger::LedgerClient;
use ramble_store::{ContentStore, StoreError, StoreResult};
use ramble_types::{Comment, ContentHash, Metadata, RetrievedComment, RetrievedMetadata};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::payload;
use crate::pool::EndpointPool;

/// Fetches documents by hash with endpoint failover.
///
/// Every successful fetch also pins the content on the serving node, so
/// reading a document helps keep it alive.
pub struct RetrievalEngine {
    pool: Arc<EndpointPool>,
    ledger: Arc<dyn LedgerClient>,
}

impl RetrievalEngine {
    pub fn new(pool: Arc<EndpointPool>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { pool, ledger }
    }

    pub fn pool(&self) -> &Arc<EndpointPool> {
        &self.pool
    }

    /// Fetch the comment stored under `hash`.
    ///
    /// With `block_number`, the block's timestamp is looked up and attached
    /// as `time`. Without, neither field is set.
    pub async fn fetch_comment(
        &self,
        hash: &ContentHash,
        block_number: Option<u64>,
    ) -> EngineResult<RetrievedComment> {
        let bytes = self.fetch_pinned(hash).await?;
        let comment: Comment = payload::decode(hash, &bytes)?;

        let (block_number, time) = match block_number {
            Some(number) => {
                let block = self.ledger.get_block(number, true).await?;
                (Some(number), Some(block.timestamp))
            }
            None => (None, None),
        };

        Ok(RetrievedComment {
            hash: *hash,
            author: comment.author,
            message: comment.message,
            block_number,
            time,
        })
    }

    /// Fetch the metadata record stored under `hash`.
    pub async fn fetch_metadata(&self, hash: &ContentHash) -> EngineResult<RetrievedMetadata> {
        let bytes = self.fetch_pinned(hash).await?;
        let metadata: Metadata = payload::decode(hash, &bytes)?;
        Ok(RetrievedMetadata {
            hash: *hash,
            metadata,
        })
    }

    /// Raw payload under `hash`, pinned on the node that served it.
    ///
    /// Any store failure rotates to the next endpoint. Gives up with
    /// `StorageExhausted` after one attempt per pool endpoint plus one.
    pub async fn fetch_pinned(&self, hash: &ContentHash) -> EngineResult<Vec<u8>> {
        let mut attempts = 0;
        loop {
            let (endpoint, store) = self.pool.adapter().bound();
            match fetch_and_pin(store.as_ref(), hash).await {
                Ok(bytes) => {
                    debug!(%hash, %endpoint, attempts, "fetched and pinned");
                    return Ok(bytes);
                }
                Err(err) => {
                    attempts += 1;
                    if attempts > self.pool.size() {
                        warn!(%hash, attempts, error = %err, "storage exhausted");
                        return Err(EngineError::StorageExhausted {
                            target: format!("fetch {hash}"),
                            attempts,
                            last_error: err.to_string(),
                        });
                    }
                    debug!(%hash, %endpoint, attempts, error = %err, "fetch failed, rotating");
                    self.pool.advance()?;
                }
            }
        }
    }
}

async fn fetch_and_pin(store: &dyn ContentStore, hash: &ContentHash) -> StoreResult<Vec<u8>> {
    let bytes = store.fetch(hash).await?;
    if bytes.is_empty() {
        return Err(StoreError::Empty(*hash));
    }
    let pinned = store.pin(hash).await?;
    if pinned.is_error_page() {
        return Err(StoreError::PinRejected {
            hash: *hash,
            reason: "node answered with an error page".into(),
        });
    }
    Ok(bytes)
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("pool", &self.pool)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{local, remote, Fixture, MARKET};
    use ramble_ledger::LedgerError;
    use ramble_store::NodeFault;

    fn engine(fixture: &Fixture) -> RetrievalEngine {
        RetrievalEngine::new(Arc::clone(&fixture.pool), fixture.ledger.clone())
    }

    fn comment_bytes() -> Vec<u8> {
        Comment::new(MARKET, "0xauthor", "first!").to_payload().unwrap()
    }

    // -----------------------------------------------------------------------
    // Comments
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn fetch_without_block_has_no_time() {
        let fixture = Fixture::new(2);
        let hash = fixture.network.node(&local()).insert(&comment_bytes());

        let comment = engine(&fixture).fetch_comment(&hash, None).await.unwrap();
        assert_eq!(comment.hash, hash);
        assert_eq!(comment.author, "0xauthor");
        assert_eq!(comment.message, "first!");
        assert_eq!(comment.block_number, None);
        assert_eq!(comment.time, None);
        assert!(fixture.network.node(&local()).is_pinned(&hash));
    }

    #[tokio::test]
    async fn fetch_with_block_attaches_time() {
        let fixture = Fixture::new(2);
        let hash = fixture.network.node(&local()).insert(&comment_bytes());
        let block = fixture.ledger.mine_block();

        let comment = engine(&fixture)
            .fetch_comment(&hash, Some(block.number))
            .await
            .unwrap();
        assert_eq!(comment.block_number, Some(block.number));
        assert_eq!(comment.time, Some(block.timestamp));
        assert!(comment.time.unwrap() > 0);
        assert!(comment.is_complete());
    }

    #[tokio::test]
    async fn missing_block_is_a_ledger_error() {
        let fixture = Fixture::new(2);
        let hash = fixture.network.node(&local()).insert(&comment_bytes());
        let err = engine(&fixture).fetch_comment(&hash, Some(99)).await.unwrap_err();
        assert!(matches!(err, EngineError::Ledger(LedgerError::BlockNotFound(99))));
    }

    // -----------------------------------------------------------------------
    // Failover
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn missing_content_rotates_to_next_endpoint() {
        let fixture = Fixture::new(3);
        let hash = fixture.network.node(&remote(1)).insert(&comment_bytes());

        let comment = engine(&fixture).fetch_comment(&hash, None).await.unwrap();
        assert_eq!(comment.hash, hash);
        assert_eq!(fixture.pool.active(), Some(remote(1)));
        assert_eq!(fixture.pool.local(), None);
        assert!(fixture.network.node(&remote(1)).is_pinned(&hash));
    }

    #[tokio::test]
    async fn empty_payload_and_pin_failures_rotate() {
        let fixture = Fixture::remote_bound(3);
        let bytes = comment_bytes();
        let hash = fixture.network.replicate(&bytes);
        fixture.network.set_fault(&remote(0), NodeFault::EmptyFetch);
        fixture.network.set_fault(&remote(1), NodeFault::RejectPins);

        engine(&fixture).fetch_comment(&hash, None).await.unwrap();
        assert_eq!(fixture.pool.current(), remote(2));
    }

    #[tokio::test]
    async fn unreachable_pool_is_exhausted_after_bounded_attempts() {
        let fixture = Fixture::new(3);
        for endpoint in fixture.remotes.iter().chain([&local()]) {
            fixture.network.set_fault(endpoint, NodeFault::Unreachable);
        }
        let hash = ContentHash::digest(b"nowhere");

        let err = engine(&fixture).fetch_comment(&hash, None).await.unwrap_err();
        match err {
            EngineError::StorageExhausted { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("expected StorageExhausted, got {other:?}"),
        }
        assert_eq!(fixture.network.total_requests(), 4);
    }

    #[tokio::test]
    async fn malformed_payload_is_terminal() {
        let fixture = Fixture::new(3);
        let hash = ContentHash::digest(b"planted");
        fixture.network.node(&local()).insert_raw(hash, b"not a document");

        let err = engine(&fixture).fetch_comment(&hash, None).await.unwrap_err();
        assert!(matches!(err, EngineError::MalformedPayload { .. }));
        // One fetch and one pin, no rotation.
        assert_eq!(fixture.network.requests(&local()), 2);
        assert_eq!(fixture.pool.current(), local());
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn fetch_metadata_decodes_record() {
        let fixture = Fixture::new(2);
        let mut metadata = Metadata::new(MARKET);
        metadata.details = Some("Resolves on the official count".into());
        metadata.tags = Some(vec!["politics".into()]);
        metadata.source = Some("augur".into());
        let hash = fixture
            .network
            .node(&local())
            .insert(&metadata.to_payload().unwrap());

        let fetched = engine(&fixture).fetch_metadata(&hash).await.unwrap();
        assert_eq!(fetched.hash, hash);
        assert_eq!(fetched.metadata, metadata);
    }
}
