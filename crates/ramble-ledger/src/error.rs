/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("log query failed: {0}")]
    QueryFailed(String),

    #[error("block {0} not found")]
    BlockNotFound(u64),

    #[error("transaction could not be submitted: {0}")]
    SubmissionFailed(String),

    #[error("transaction {tx_hash} failed: {reason}")]
    TransactionFailed { tx_hash: String, reason: String },

    #[error("confirmation channel closed before the transaction settled")]
    ConfirmationDropped,
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
