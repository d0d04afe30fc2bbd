use ramble_ledger::LedgerError;
use ramble_store::StoreError;
use ramble_types::ContentHash;
use thiserror::Error;

/// Errors surfaced by the publish/fetch engine.
///
/// `StoreUnavailable`, `NotFoundOrEmpty` and (during retrieval)
/// `PinRejected` are transient: the engine rotates endpoints on them and
/// callers only see them through `StorageExhausted` or a fail-fast
/// broadcast. Everything else is terminal.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage node {endpoint} unavailable: {reason}")]
    StoreUnavailable { endpoint: String, reason: String },

    #[error("storage node rejected the payload: {0}")]
    StoreRejected(String),

    #[error("content {0} not found or not yet replicated")]
    NotFoundOrEmpty(ContentHash),

    #[error("pin rejected for {hash}: {reason}")]
    PinRejected { hash: ContentHash, reason: String },

    #[error("malformed payload for {hash}: {reason}")]
    MalformedPayload { hash: ContentHash, reason: String },

    #[error("storage exhausted: {target} failed on {attempts} attempts, last error: {last_error}")]
    StorageExhausted {
        target: String,
        attempts: usize,
        last_error: String,
    },

    #[error("ledger log query failed: {0}")]
    LedgerQueryFailed(String),

    #[error("no logs found")]
    NoLogs,

    #[error("invalid parameter: {0}")]
    ParameterError(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { endpoint, reason } => {
                Self::StoreUnavailable { endpoint, reason }
            }
            StoreError::Rejected(reason) => Self::StoreRejected(reason),
            StoreError::NotFound(hash) | StoreError::Empty(hash) => Self::NotFoundOrEmpty(hash),
            StoreError::PinRejected { hash, reason } => Self::PinRejected { hash, reason },
            other => Self::Store(other),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
