//! Ledger boundary for Ramble.
//!
//! Ramble anchors content hashes on a ledger by submitting reference
//! transactions to a comments contract, and finds them again by querying the
//! contract's topic-tagged logs. This crate provides:
//! - The [`LedgerClient`] trait boundary (log query, block lookup, submit)
//! - Transaction and filter records ([`TxSpec`], [`LogFilter`], [`TxReceipt`])
//! - [`Submission`], the two-stage (sent, then confirmed) result of a submit
//! - [`InMemoryLedger`] for tests and embedding

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{LedgerError, LedgerResult};
pub use memory::InMemoryLedger;
pub use traits::LedgerClient;
pub use types::{BlockTag, LogFilter, SentTransaction, Submission, TxReceipt, TxSpec};
