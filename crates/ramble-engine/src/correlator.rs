use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use ramble_ledger::{LedgerClient, LogFilter};
use ramble_types::{ContentHash, LogEvent, MarketId, RetrievedComment, RetrievedMetadata};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::retrieval::RetrievalEngine;

const COMMENT_TAG: &str = "comment";
const METADATA_TAG: &str = "metadata";

/// Options for listing a market's documents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchOptions {
    /// First block to scan. Defaults to 1.
    pub from_block: Option<u64>,
    /// Last block to scan. Defaults to the head.
    pub to_block: Option<u64>,
    /// Keep only the last `n` logs of the query, before the market filter
    /// is applied. `None` or `0` keeps everything.
    pub num_comments: Option<usize>,
    /// Include metadata records without a `source`.
    pub sourceless: bool,
}

/// A log that references a document of the requested market.
#[derive(Debug)]
struct Reference {
    hash: ContentHash,
    block_number: u64,
}

/// Finds a market's documents through the contract's ledger logs and
/// fetches them.
///
/// Results come back newest first. Any failed retrieval fails the whole
/// listing.
pub struct LogCorrelator {
    retrieval: Arc<RetrievalEngine>,
    ledger: Arc<dyn LedgerClient>,
    contract: String,
    concurrency: usize,
}

impl LogCorrelator {
    pub fn new(
        retrieval: Arc<RetrievalEngine>,
        ledger: Arc<dyn LedgerClient>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            retrieval,
            ledger,
            contract: config.contract.clone(),
            concurrency: config.concurrency(),
        }
    }

    /// Complete comments logged for `market_id`, newest first.
    pub async fn fetch_comments(
        &self,
        market_id: &str,
        options: &FetchOptions,
    ) -> EngineResult<Vec<RetrievedComment>> {
        let references = self.references(COMMENT_TAG, market_id, options).await?;
        let retrieval = &self.retrieval;
        let fetched: Vec<RetrievedComment> = stream::iter(references)
            .map(|reference| async move {
                retrieval
                    .fetch_comment(&reference.hash, Some(reference.block_number))
                    .await
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut comments: Vec<RetrievedComment> =
            fetched.into_iter().filter(RetrievedComment::is_complete).collect();
        comments.reverse();
        info!(market = market_id, count = comments.len(), "comments correlated");
        Ok(comments)
    }

    /// Metadata records logged for `market_id`, newest first.
    ///
    /// Records without a `source` are dropped unless
    /// [`FetchOptions::sourceless`] is set.
    pub async fn fetch_metadata(
        &self,
        market_id: &str,
        options: &FetchOptions,
    ) -> EngineResult<Vec<RetrievedMetadata>> {
        let references = self.references(METADATA_TAG, market_id, options).await?;
        let retrieval = &self.retrieval;
        let fetched: Vec<RetrievedMetadata> = stream::iter(references)
            .map(|reference| async move { retrieval.fetch_metadata(&reference.hash).await })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut records: Vec<RetrievedMetadata> = fetched
            .into_iter()
            .filter(|record| options.sourceless || record.metadata.source.is_some())
            .collect();
        records.reverse();
        info!(market = market_id, count = records.len(), "metadata correlated");
        Ok(records)
    }

    /// Logs tagged `tag` that belong to `market_id`, oldest first.
    async fn references(
        &self,
        tag: &str,
        market_id: &str,
        options: &FetchOptions,
    ) -> EngineResult<Vec<Reference>> {
        if market_id.trim().is_empty() {
            return Err(EngineError::ParameterError("market id is required".into()));
        }
        let market = MarketId::parse(market_id)
            .map_err(|e| EngineError::ParameterError(format!("market id {market_id:?}: {e}")))?;

        let mut filter = LogFilter::tagged(&self.contract, tag);
        if let Some(from) = options.from_block {
            filter = filter.from_block(from);
        }
        if let Some(to) = options.to_block {
            filter = filter.to_block(to);
        }

        let mut logs = self
            .ledger
            .query_logs(&filter)
            .await
            .map_err(|e| EngineError::LedgerQueryFailed(e.to_string()))?;
        if logs.is_empty() {
            return Err(EngineError::NoLogs);
        }

        // Truncation sees every log of the tag, not only this market's.
        if let Some(n) = options.num_comments.filter(|&n| n > 0 && n < logs.len()) {
            logs.drain(..logs.len() - n);
        }

        let references: Vec<Reference> = logs
            .iter()
            .filter(|log| belongs_to(log, &market))
            .filter_map(|log| match ContentHash::from_ledger_word(&log.data) {
                Ok(hash) => Some(Reference {
                    hash,
                    block_number: log.block_number,
                }),
                Err(err) => {
                    debug!(
                        block = log.block_number,
                        data = %log.data,
                        error = %err,
                        "skipping undecodable log"
                    );
                    None
                }
            })
            .collect();
        debug!(
            tag,
            market = %market,
            logs = logs.len(),
            matched = references.len(),
            "logs filtered"
        );
        Ok(references)
    }
}

/// Compares correlation ids as words, so `0xa1` and `0x00a1` match.
fn belongs_to(log: &LogEvent, market: &MarketId) -> bool {
    log.correlation_id()
        .and_then(|id| MarketId::parse(id).ok())
        .is_some_and(|id| id == *market)
}

impl std::fmt::Debug for LogCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogCorrelator")
            .field("contract", &self.contract)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}
