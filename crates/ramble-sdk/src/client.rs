use std::sync::Arc;
use std::time::Duration;

use ramble_engine::{
    BroadcastPinner, EndpointPool, EngineError, FetchOptions, LogCorrelator, PublicationEngine,
    PublishHandle, RetrievalEngine,
};
use ramble_ledger::LedgerClient;
use ramble_store::{HttpConnector, StoreConnector};
use ramble_types::{
    Comment, ContentHash, Endpoint, Metadata, RetrievedComment, RetrievedMetadata,
};
use tracing::info;

use crate::config::RambleConfig;
use crate::error::SdkResult;

/// High-level Ramble client.
///
/// Every component shares one endpoint pool, so a rotation triggered by a
/// fetch is visible to the next publish. Separate `Ramble` values never
/// share state.
pub struct Ramble {
    config: RambleConfig,
    pool: Arc<EndpointPool>,
    retrieval: Arc<RetrievalEngine>,
    publication: PublicationEngine,
    pinner: BroadcastPinner,
    correlator: LogCorrelator,
}

impl Ramble {
    /// Build a client over any storage connector and ledger.
    pub fn new(
        config: RambleConfig,
        connector: Arc<dyn StoreConnector>,
        ledger: Arc<dyn LedgerClient>,
    ) -> SdkResult<Self> {
        config.validate()?;
        let (local, remotes) = config.endpoints()?;

        let pool = Arc::new(EndpointPool::new(
            connector,
            local,
            remotes,
            config.secure_context,
        )?);
        let retrieval = Arc::new(RetrievalEngine::new(Arc::clone(&pool), Arc::clone(&ledger)));
        let pinner = BroadcastPinner::new(Arc::clone(&pool), config.engine.broadcast_mode);
        let publication = PublicationEngine::new(
            Arc::clone(&pool),
            Arc::clone(&ledger),
            pinner.clone(),
            config.engine.clone(),
        );
        let correlator = LogCorrelator::new(Arc::clone(&retrieval), ledger, &config.engine);

        info!(
            endpoint = %pool.current(),
            pool_size = pool.size(),
            contract = %config.engine.contract,
            "ramble client ready"
        );
        Ok(Self {
            config,
            pool,
            retrieval,
            publication,
            pinner,
            correlator,
        })
    }

    /// Build a client that talks to storage nodes over their HTTP API.
    pub fn connect(config: RambleConfig, ledger: Arc<dyn LedgerClient>) -> SdkResult<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let connector = HttpConnector::new(timeout).map_err(EngineError::from)?;
        Self::new(config, Arc::new(connector), ledger)
    }

    pub fn config(&self) -> &RambleConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<EndpointPool> {
        &self.pool
    }

    // ---- Endpoint selection ----

    /// Bind to the local node, optionally replacing its URL.
    pub fn select_local_endpoint(&self, url: Option<&str>) -> SdkResult<Endpoint> {
        let endpoint = url
            .map(|url| {
                Endpoint::parse(url)
                    .map_err(|e| EngineError::ParameterError(format!("local endpoint: {e}")))
            })
            .transpose()?;
        Ok(self.pool.select_local(endpoint)?)
    }

    /// Bind to a remote node, adding `endpoint` to the pool if given.
    pub fn select_remote_endpoint(&self, endpoint: Option<Endpoint>) -> SdkResult<Endpoint> {
        Ok(self.pool.select_remote(endpoint)?)
    }

    // ---- Retrieval ----

    pub async fn fetch_comment(
        &self,
        hash: &ContentHash,
        block_number: Option<u64>,
    ) -> SdkResult<RetrievedComment> {
        Ok(self.retrieval.fetch_comment(hash, block_number).await?)
    }

    pub async fn fetch_metadata(&self, hash: &ContentHash) -> SdkResult<RetrievedMetadata> {
        Ok(self.retrieval.fetch_metadata(hash).await?)
    }

    /// Complete comments for a market, newest first.
    pub async fn fetch_comments_for_market(
        &self,
        market_id: &str,
        options: &FetchOptions,
    ) -> SdkResult<Vec<RetrievedComment>> {
        Ok(self.correlator.fetch_comments(market_id, options).await?)
    }

    /// Metadata records for a market, newest first.
    pub async fn fetch_metadata_for_market(
        &self,
        market_id: &str,
        options: &FetchOptions,
    ) -> SdkResult<Vec<RetrievedMetadata>> {
        Ok(self.correlator.fetch_metadata(market_id, options).await?)
    }

    // ---- Publication ----

    /// Store, pin and anchor a comment. Resolves once the reference
    /// transaction is sent; see [`PublishHandle::confirmed`].
    pub async fn publish_comment(
        &self,
        comment: Comment,
        broadcast: bool,
    ) -> SdkResult<PublishHandle> {
        let comment = comment.with_broadcast(broadcast);
        Ok(self.publication.publish_comment(&comment).await?)
    }

    pub async fn publish_metadata(
        &self,
        metadata: Metadata,
        broadcast: bool,
    ) -> SdkResult<PublishHandle> {
        let metadata = metadata.with_broadcast(broadcast);
        Ok(self.publication.publish_metadata(&metadata).await?)
    }

    /// Replicate `data` to every pool endpoint and pin `hash` there.
    pub async fn broadcast_pin(&self, data: &[u8], hash: &ContentHash) -> SdkResult<Vec<Endpoint>> {
        Ok(self.pinner.broadcast_pin(data, hash).await?)
    }
}

impl std::fmt::Debug for Ramble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ramble")
            .field("pool", &self.pool)
            .field("contract", &self.config.engine.contract)
            .finish()
    }
}
