use std::sync::Arc;

use ramble_ledger::{LedgerClient, SentTransaction, Submission, TxReceipt, TxSpec};
use ramble_store::ContentStore;
use ramble_types::{Comment, ContentHash, Endpoint, MarketId, Metadata};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::broadcast::BroadcastPinner;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::pool::EndpointPool;

/// Parameter signature of the anchoring methods: two integer words.
const ANCHOR_SIGNATURE: &str = "ii";

/// Ledger method that anchors a document kind.
#[derive(Clone, Copy, Debug)]
enum Anchor {
    Comment,
    Metadata,
}

impl Anchor {
    fn method(self) -> &'static str {
        match self {
            Self::Comment => "addComment",
            Self::Metadata => "addMetadata",
        }
    }
}

/// A published document whose reference transaction has been sent.
///
/// `publish_*` returns this at the point the ledger reports the
/// transaction as sent. [`confirmed`](Self::confirmed) waits for it to be
/// mined.
#[derive(Debug)]
pub struct PublishHandle {
    hash: ContentHash,
    endpoint: Endpoint,
    submission: Submission,
    broadcast: Option<JoinHandle<EngineResult<Vec<Endpoint>>>>,
}

impl PublishHandle {
    /// Content hash of the stored payload.
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Endpoint that stored and pinned the payload.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn sent(&self) -> &SentTransaction {
        &self.submission.sent
    }

    /// The background broadcast, if one was requested. Dropping the handle
    /// detaches the task; it keeps running.
    pub fn take_broadcast(&mut self) -> Option<JoinHandle<EngineResult<Vec<Endpoint>>>> {
        self.broadcast.take()
    }

    /// Wait for the reference transaction to be mined.
    pub async fn confirmed(self) -> EngineResult<TxReceipt> {
        Ok(self.submission.confirmed().await?)
    }
}

/// Stores documents, pins them, and anchors their hashes on the ledger.
pub struct PublicationEngine {
    pool: Arc<EndpointPool>,
    ledger: Arc<dyn LedgerClient>,
    pinner: BroadcastPinner,
    config: EngineConfig,
}

impl PublicationEngine {
    pub fn new(
        pool: Arc<EndpointPool>,
        ledger: Arc<dyn LedgerClient>,
        pinner: BroadcastPinner,
        config: EngineConfig,
    ) -> Self {
        Self {
            pool,
            ledger,
            pinner,
            config,
        }
    }

    pub async fn publish_comment(&self, comment: &Comment) -> EngineResult<PublishHandle> {
        let market = comment
            .market()
            .map_err(|e| EngineError::ParameterError(format!("comment market id: {e}")))?;
        let payload = comment
            .to_payload()
            .map_err(|e| EngineError::ParameterError(e.to_string()))?;
        self.publish(Anchor::Comment, market, payload, comment.broadcast)
            .await
    }

    pub async fn publish_metadata(&self, metadata: &Metadata) -> EngineResult<PublishHandle> {
        let market = metadata
            .market()
            .map_err(|e| EngineError::ParameterError(format!("metadata market id: {e}")))?;
        let payload = metadata
            .to_payload()
            .map_err(|e| EngineError::ParameterError(e.to_string()))?;
        self.publish(Anchor::Metadata, market, payload, metadata.broadcast)
            .await
    }

    async fn publish(
        &self,
        anchor: Anchor,
        market: MarketId,
        payload: Vec<u8>,
        broadcast: bool,
    ) -> EngineResult<PublishHandle> {
        let (endpoint, store, hash) = self.store_with_failover(&payload).await?;

        // A node that took the payload but will not pin it is not retried.
        let response = store
            .pin(&hash)
            .await
            .map_err(|e| EngineError::PinRejected {
                hash,
                reason: e.to_string(),
            })?;
        if response.is_error_page() {
            return Err(EngineError::PinRejected {
                hash,
                reason: format!("{endpoint} answered with an error page"),
            });
        }
        debug!(%hash, %endpoint, "stored and pinned");

        let tx = TxSpec::send(
            &self.config.contract,
            &self.config.sender,
            anchor.method(),
            ANCHOR_SIGNATURE,
            vec![market.to_word_hex(), hash.to_ledger_word()],
        );
        let submission = self.ledger.submit_transaction(&tx).await?;
        info!(
            tx_hash = %submission.sent.tx_hash,
            %hash,
            method = anchor.method(),
            "reference transaction sent"
        );

        let broadcast = broadcast.then(|| {
            let pinner = self.pinner.clone();
            tokio::spawn(async move { pinner.broadcast_pin(&payload, &hash).await })
        });

        Ok(PublishHandle {
            hash,
            endpoint,
            submission,
            broadcast,
        })
    }

    /// Add `payload` through the pool, rotating on any failure, up to the
    /// configured attempt cap.
    async fn store_with_failover(
        &self,
        payload: &[u8],
    ) -> EngineResult<(Endpoint, Arc<dyn ContentStore>, ContentHash)> {
        let cap = self
            .config
            .max_publish_attempts
            .unwrap_or_else(|| self.pool.size() + 1)
            .max(1);
        let mut attempts = 0;
        loop {
            let (endpoint, store) = self.pool.adapter().bound();
            match store.add(payload).await {
                Ok(hash) => return Ok((endpoint, store, hash)),
                Err(err) => {
                    attempts += 1;
                    if attempts >= cap {
                        warn!(attempts, error = %err, "publish exhausted storage");
                        return Err(EngineError::StorageExhausted {
                            target: "publish".into(),
                            attempts,
                            last_error: err.to_string(),
                        });
                    }
                    debug!(%endpoint, attempts, error = %err, "add failed, rotating");
                    self.pool.advance()?;
                }
            }
        }
    }
}

impl std::fmt::Debug for PublicationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicationEngine")
            .field("contract", &self.config.contract)
            .field("pool", &self.pool)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BroadcastMode;
    use crate::testkit::{config, local, remote, Fixture, CONTRACT, MARKET, SENDER};
    use ramble_ledger::{LedgerError, LogFilter};
    use ramble_store::NodeFault;

    fn engine_with(fixture: &Fixture, config: EngineConfig) -> PublicationEngine {
        let pinner = BroadcastPinner::new(Arc::clone(&fixture.pool), config.broadcast_mode);
        PublicationEngine::new(
            Arc::clone(&fixture.pool),
            fixture.ledger.clone(),
            pinner,
            config,
        )
    }

    fn engine(fixture: &Fixture) -> PublicationEngine {
        engine_with(fixture, config())
    }

    fn comment() -> Comment {
        Comment::new(MARKET, "0xauthor", "hello market")
    }

    // -----------------------------------------------------------------------
    // Happy path
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn publish_comment_stores_pins_and_anchors() {
        let fixture = Fixture::new(2);
        let handle = engine(&fixture).publish_comment(&comment()).await.unwrap();

        let hash = *handle.hash();
        assert_eq!(hash, ContentHash::digest(&comment().to_payload().unwrap()));
        assert_eq!(handle.endpoint(), &local());
        let node = fixture.network.node(&local());
        assert!(node.contains(&hash));
        assert!(node.is_pinned(&hash));

        let txs = fixture.ledger.transactions();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].to, CONTRACT);
        assert_eq!(txs[0].from, SENDER);
        assert_eq!(txs[0].method, "addComment");
        assert_eq!(txs[0].signature, "ii");
        assert_eq!(
            txs[0].params,
            vec![MarketId::parse(MARKET).unwrap().to_word_hex(), hash.to_ledger_word()]
        );

        assert_eq!(handle.sent().call_return, "1");
        let receipt = handle.confirmed().await.unwrap();
        assert_eq!(receipt.block_number, 1);

        let logs = fixture
            .ledger
            .query_logs(&LogFilter::tagged(CONTRACT, "comment"))
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(ContentHash::from_ledger_word(&logs[0].data).unwrap(), hash);
    }

    #[tokio::test]
    async fn publish_metadata_uses_metadata_method() {
        let fixture = Fixture::new(2);
        let mut metadata = Metadata::new(MARKET);
        metadata.source = Some("augur".into());
        engine(&fixture).publish_metadata(&metadata).await.unwrap();
        assert_eq!(fixture.ledger.transactions()[0].method, "addMetadata");
    }

    #[tokio::test]
    async fn broadcast_runs_after_send() {
        let fixture = Fixture::new(3);
        let mut handle = engine(&fixture)
            .publish_comment(&comment().with_broadcast(true))
            .await
            .unwrap();

        let pinned = handle.take_broadcast().unwrap().await.unwrap().unwrap();
        assert_eq!(pinned, fixture.remotes);
        assert!(handle.take_broadcast().is_none());
    }

    #[tokio::test]
    async fn no_broadcast_unless_requested() {
        let fixture = Fixture::new(3);
        let mut handle = engine(&fixture).publish_comment(&comment()).await.unwrap();
        assert!(handle.take_broadcast().is_none());
        assert_eq!(fixture.network.requests(&remote(0)), 0);
    }

    // -----------------------------------------------------------------------
    // Failures
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn add_failure_rotates() {
        let fixture = Fixture::new(3);
        fixture.network.set_fault(&local(), NodeFault::Unreachable);
        fixture.network.set_fault(&remote(1), NodeFault::RejectAdds);

        let handle = engine(&fixture).publish_comment(&comment()).await.unwrap();
        assert_eq!(handle.endpoint(), &remote(2));
        assert_eq!(fixture.pool.active(), Some(remote(2)));
    }

    #[tokio::test]
    async fn default_cap_is_pool_size_plus_one() {
        let fixture = Fixture::new(2);
        for endpoint in [local(), remote(0), remote(1)] {
            fixture.network.set_fault(&endpoint, NodeFault::Unreachable);
        }
        let err = engine(&fixture).publish_comment(&comment()).await.unwrap_err();
        assert!(matches!(err, EngineError::StorageExhausted { attempts: 3, .. }));
        assert_eq!(fixture.network.total_requests(), 3);
        assert!(fixture.ledger.transactions().is_empty());
    }

    #[tokio::test]
    async fn configured_cap_is_honored() {
        let fixture = Fixture::new(3);
        fixture.network.set_fault(&local(), NodeFault::Unreachable);
        let config = EngineConfig {
            max_publish_attempts: Some(1),
            ..config()
        };
        let err = engine_with(&fixture, config)
            .publish_comment(&comment())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::StorageExhausted { attempts: 1, .. }));
        assert_eq!(fixture.pool.current(), local());
    }

    #[tokio::test]
    async fn pin_failure_is_terminal() {
        let fixture = Fixture::new(3);
        fixture.network.set_fault(&local(), NodeFault::RejectPins);

        let err = engine(&fixture).publish_comment(&comment()).await.unwrap_err();
        assert!(matches!(err, EngineError::PinRejected { .. }));
        assert_eq!(fixture.pool.current(), local());
        assert!(fixture.ledger.transactions().is_empty());
    }

    #[tokio::test]
    async fn failed_transaction_surfaces_on_confirmation() {
        let fixture = Fixture::new(2);
        fixture.ledger.reject_transactions(Some("out of gas"));

        let handle = engine(&fixture).publish_comment(&comment()).await.unwrap();
        let err = handle.confirmed().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Ledger(LedgerError::TransactionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_market_is_rejected_before_storage() {
        let fixture = Fixture::new(2);
        let bad = Comment::new("", "0xauthor", "orphan");
        let err = engine(&fixture).publish_comment(&bad).await.unwrap_err();
        assert!(matches!(err, EngineError::ParameterError(_)));
        assert_eq!(fixture.network.total_requests(), 0);
    }

    #[tokio::test]
    async fn best_effort_broadcast_reports_partial_success() {
        let fixture = Fixture::new(3);
        fixture.network.set_fault(&remote(0), NodeFault::Unreachable);
        let config = EngineConfig {
            broadcast_mode: BroadcastMode::BestEffort,
            ..config()
        };
        let mut handle = engine_with(&fixture, config)
            .publish_comment(&comment().with_broadcast(true))
            .await
            .unwrap();
        let pinned = handle.take_broadcast().unwrap().await.unwrap().unwrap();
        assert_eq!(pinned, vec![remote(1), remote(2)]);
    }
}
