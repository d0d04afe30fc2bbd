use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::{LedgerError, LedgerResult};

/// A contract call to sign and send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSpec {
    /// Target contract address.
    pub to: String,
    /// Sending account.
    pub from: String,
    pub method: String,
    /// Encoded parameter signature, e.g. `"ii"` for two integer words.
    pub signature: String,
    /// Encoded parameter values, in signature order.
    pub params: Vec<String>,
    /// Expected return type of the call.
    pub returns: String,
    /// `true` for a state-changing transaction, `false` for a read-only call.
    pub send: bool,
}

impl TxSpec {
    /// A state-changing call returning a number.
    pub fn send(
        to: impl Into<String>,
        from: impl Into<String>,
        method: impl Into<String>,
        signature: impl Into<String>,
        params: Vec<String>,
    ) -> Self {
        Self {
            to: to.into(),
            from: from.into(),
            method: method.into(),
            signature: signature.into(),
            params,
            returns: "number".into(),
            send: true,
        }
    }
}

/// Block bound for a log query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    Number(u64),
    Latest,
}

impl BlockTag {
    /// Resolve against the current head.
    pub fn resolve(&self, head: u64) -> u64 {
        match self {
            Self::Number(n) => *n,
            Self::Latest => head,
        }
    }
}

/// Filter for [`LedgerClient::query_logs`](crate::LedgerClient::query_logs).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    pub from_block: BlockTag,
    pub to_block: BlockTag,
    pub address: String,
    /// Positional topic constraints; `topics[i]` must equal the log's
    /// `topics[i]`.
    pub topics: Vec<String>,
}

impl LogFilter {
    /// All logs of `address` tagged `event_tag`, from block 1 to the head.
    pub fn tagged(address: impl Into<String>, event_tag: impl Into<String>) -> Self {
        Self {
            from_block: BlockTag::Number(1),
            to_block: BlockTag::Latest,
            address: address.into(),
            topics: vec![event_tag.into()],
        }
    }

    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = BlockTag::Number(block);
        self
    }

    pub fn to_block(mut self, block: u64) -> Self {
        self.to_block = BlockTag::Number(block);
        self
    }
}

/// What the ledger reports once a transaction has been sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentTransaction {
    pub tx_hash: String,
    /// Value returned by a dry run of the call.
    pub call_return: String,
}

/// What the ledger reports once a transaction has been mined.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub block_hash: String,
    pub from: String,
    pub to: String,
    pub call_return: String,
    pub value: u64,
}

/// A transaction that has been sent and may still be pending.
#[derive(Debug)]
pub struct Submission {
    pub sent: SentTransaction,
    confirmation: oneshot::Receiver<LedgerResult<TxReceipt>>,
}

impl Submission {
    /// A pending submission and the sender that settles it.
    pub fn pending(sent: SentTransaction) -> (Self, oneshot::Sender<LedgerResult<TxReceipt>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sent,
                confirmation: rx,
            },
            tx,
        )
    }

    /// A submission whose outcome is already known.
    pub fn settled(sent: SentTransaction, outcome: LedgerResult<TxReceipt>) -> Self {
        let (submission, tx) = Self::pending(sent);
        // The receiver is alive in `submission`, so this cannot fail.
        let _ = tx.send(outcome);
        submission
    }

    /// Wait for the transaction to be mined or to fail.
    pub async fn confirmed(self) -> LedgerResult<TxReceipt> {
        self.confirmation
            .await
            .map_err(|_| LedgerError::ConfirmationDropped)?
    }
}
