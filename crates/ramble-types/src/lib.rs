//! Foundation types for Ramble.
//!
//! Ramble publishes small JSON documents (market comments and metadata
//! records) to a content-addressed storage network and anchors their hashes
//! in ledger log events. Every other Ramble crate depends on `ramble-types`.
//!
//! # Key Types
//!
//! - [`Endpoint`]: address of one storage node (host, port, protocol)
//! - [`ContentHash`]: SHA2-256 multihash identifying a stored payload
//! - [`MarketId`]: 256-bit correlation id, normalized from signed hex
//! - [`Comment`] / [`Metadata`]: the documents that get published
//! - [`LogEvent`] / [`Block`]: read-only records supplied by the ledger
//! - [`RetrievedComment`] / [`RetrievedMetadata`]: fetch results

pub mod chain;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod hash;
pub mod market;
pub mod retrieved;

pub use chain::{Block, LogEvent};
pub use document::{Comment, Metadata};
pub use endpoint::{Endpoint, Protocol};
pub use error::TypeError;
pub use hash::ContentHash;
pub use market::MarketId;
pub use retrieved::{RetrievedComment, RetrievedMetadata};
