use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::market::MarketId;

/// A market comment as stored on the storage network.
///
/// `broadcast` is a transient control flag: it asks the publisher to
/// replicate the payload to every pool endpoint and is never serialized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub market_id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub message: String,
    #[serde(skip)]
    pub broadcast: bool,
}

impl Comment {
    pub fn new(
        market_id: impl Into<String>,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            market_id: market_id.into(),
            author: author.into(),
            message: message.into(),
            broadcast: false,
        }
    }

    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// The normalized correlation id this comment belongs to.
    pub fn market(&self) -> Result<MarketId, TypeError> {
        MarketId::parse(&self.market_id)
    }

    /// Serialized bytes as written to storage.
    pub fn to_payload(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

/// Descriptive metadata attached to a market.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub market_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "image_bytes")]
    pub image: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    /// Where the record came from. Market listings only surface sourced
    /// records unless asked otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Fields this crate does not model. Kept so a record survives a
    /// decode and re-encode intact.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
    #[serde(skip)]
    pub broadcast: bool,
}

impl Metadata {
    pub fn new(market_id: impl Into<String>) -> Self {
        Self {
            market_id: market_id.into(),
            ..Default::default()
        }
    }

    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    pub fn market(&self) -> Result<MarketId, TypeError> {
        MarketId::parse(&self.market_id)
    }

    pub fn to_payload(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

/// Images travel as a JSON byte array. Writers on other platforms wrap the
/// array in a `{"type": "Buffer", "data": [...]}` envelope; both shapes decode
/// to the same bytes.
mod image_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ImageRepr {
        Bytes(Vec<u8>),
        Buffer { data: Vec<u8> },
    }

    pub fn serialize<S: Serializer>(
        image: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match image {
            Some(bytes) => serializer.collect_seq(bytes.iter()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Ok(Option::<ImageRepr>::deserialize(deserializer)?.map(|repr| match repr {
            ImageRepr::Bytes(bytes) => bytes,
            ImageRepr::Buffer { data } => data,
        }))
    }
}
