use ramble_types::ContentHash;

/// Errors from content store operations.
///
/// Callers that hold a pool of nodes treat every variant as a reason to try
/// the next node.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The node could not be reached (connection refused, DNS, timeout).
    #[error("storage node {endpoint} unavailable: {reason}")]
    Unavailable { endpoint: String, reason: String },

    /// The node answered but refused to store the payload.
    #[error("add rejected: {0}")]
    Rejected(String),

    /// The node answered but does not have the content.
    #[error("content not found: {0}")]
    NotFound(ContentHash),

    /// The node answered with an empty body.
    #[error("empty response for {0}")]
    Empty(ContentHash),

    /// The node refused to pin the content.
    #[error("pin rejected for {hash}: {reason}")]
    PinRejected { hash: ContentHash, reason: String },

    /// The node's response could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A backend could not be built for the endpoint.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
