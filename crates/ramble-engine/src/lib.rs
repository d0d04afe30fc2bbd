//! Failover publish/fetch engine for Ramble.
//!
//! Storage nodes are unreliable: they go down, lag behind on replication,
//! or refuse pins. The engine keeps a pool of endpoints and rotates through
//! it on transient failures, with every retry loop bounded by the pool size.
//!
//! # Components
//!
//! - [`EndpointPool`]: ordered remote endpoints, a local endpoint, and the
//!   round-robin cursor deciding which one the store adapter is bound to
//! - [`RetrievalEngine`]: fetch, pin, and decode a document by hash
//! - [`PublicationEngine`]: store, pin, and anchor a document on the ledger
//! - [`BroadcastPinner`]: replicate a payload to every pool endpoint
//! - [`LogCorrelator`]: find a market's documents through ledger logs
//!
//! The pool is an explicit shared handle (`Arc<EndpointPool>`): independent
//! pools never interfere, and components sharing one pool see each other's
//! rotations.

pub mod broadcast;
pub mod config;
pub mod correlator;
pub mod error;
pub mod payload;
pub mod pool;
pub mod publication;
pub mod retrieval;

#[cfg(test)]
mod testkit;

pub use broadcast::BroadcastPinner;
pub use config::{BroadcastMode, EngineConfig};
pub use correlator::{FetchOptions, LogCorrelator};
pub use error::{EngineError, EngineResult};
pub use pool::EndpointPool;
pub use publication::{PublicationEngine, PublishHandle};
pub use retrieval::RetrievalEngine;
