use serde::{Deserialize, Serialize};

/// A topic-tagged event emitted by the comments contract.
///
/// `topics[0]` is the event tag (`comment`, `metadata`), `topics[1]` the
/// correlation id. `data` is the hex word holding the content digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: u64,
}

impl LogEvent {
    pub fn new(topics: Vec<String>, data: impl Into<String>, block_number: u64) -> Self {
        Self {
            topics,
            data: data.into(),
            block_number,
        }
    }

    pub fn event_tag(&self) -> Option<&str> {
        self.topics.first().map(String::as_str)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.topics.get(1).map(String::as_str)
    }
}

/// The subset of a ledger block Ramble needs: its number and timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    pub hash: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
}
