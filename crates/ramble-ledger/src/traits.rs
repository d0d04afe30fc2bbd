use async_trait::async_trait;
use ramble_types::{Block, LogEvent};

use crate::error::LedgerResult;
use crate::types::{LogFilter, Submission, TxSpec};

/// Client for the ledger that anchors content hashes.
///
/// Timeouts and transport retries are the implementation's concern.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Logs matching `filter`, oldest first.
    async fn query_logs(&self, filter: &LogFilter) -> LedgerResult<Vec<LogEvent>>;

    /// Look up a block by number.
    async fn get_block(&self, number: u64, full_transactions: bool) -> LedgerResult<Block>;

    /// Sign and send a transaction. Resolves once it is sent; the returned
    /// [`Submission`] resolves again once it is mined or fails.
    async fn submit_transaction(&self, tx: &TxSpec) -> LedgerResult<Submission>;
}
