//! High-level SDK for Ramble.
//!
//! [`Ramble`] wires an endpoint pool, the retrieval and publication engines,
//! the broadcast pinner and the log correlator together from one
//! [`RambleConfig`]. This is the main entry point for applications.

pub mod client;
pub mod config;
pub mod error;

pub use client::Ramble;
pub use config::RambleConfig;
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use ramble_engine::{BroadcastMode, FetchOptions, PublishHandle};
pub use ramble_ledger::{InMemoryLedger, LedgerClient, TxReceipt};
pub use ramble_store::{HttpConnector, MemoryNetwork, StoreConnector};
pub use ramble_types::{
    Comment, ContentHash, Endpoint, Metadata, RetrievedComment, RetrievedMetadata,
};
