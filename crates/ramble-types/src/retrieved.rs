use serde::{Deserialize, Serialize};

use crate::document::Metadata;
use crate::hash::ContentHash;

/// A comment fetched from storage, optionally anchored to a ledger block.
///
/// `block_number` and `time` are both present or both absent: they are only
/// attached when the caller supplied the block the comment was logged in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedComment {
    pub hash: ContentHash,
    pub author: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
}

impl RetrievedComment {
    /// Non-empty author and message, and a block time.
    pub fn is_complete(&self) -> bool {
        !self.author.is_empty() && !self.message.is_empty() && self.time.is_some()
    }
}

/// A metadata record fetched from storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedMetadata {
    pub hash: ContentHash,
    #[serde(flatten)]
    pub metadata: Metadata,
}
