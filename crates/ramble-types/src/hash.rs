use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::TypeError;

/// Multihash function code for SHA2-256.
const SHA2_256: u8 = 0x12;
/// Digest length, in bytes, carried in the multihash header.
const DIGEST_LEN: usize = 32;

/// Content-derived identifier of a stored payload.
///
/// The storage network names payloads by a base58 SHA2-256 multihash
/// (`Qm…`). The ledger only carries the bare 32-byte digest, so a
/// `ContentHash` converts between the two on the way in and out of log data.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; DIGEST_LEN]);

impl ContentHash {
    /// Hash raw bytes.
    pub fn digest(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Wrap a pre-computed SHA2-256 digest.
    pub fn from_digest(digest: [u8; DIGEST_LEN]) -> Self {
        Self(digest)
    }

    /// The bare 32-byte digest.
    pub fn as_digest(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Binary multihash: function code, length, digest.
    pub fn to_multihash(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(DIGEST_LEN + 2);
        bytes.push(SHA2_256);
        bytes.push(DIGEST_LEN as u8);
        bytes.extend_from_slice(&self.0);
        bytes
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.to_multihash()).into_string()
    }

    /// Parse a base58 multihash such as `QmUTAHurKVErazXo…`.
    pub fn from_base58(s: &str) -> Result<Self, TypeError> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| TypeError::InvalidContentHash(e.to_string()))?;
        if bytes.len() != DIGEST_LEN + 2 {
            return Err(TypeError::InvalidLength {
                expected: DIGEST_LEN + 2,
                actual: bytes.len(),
            });
        }
        if bytes[0] != SHA2_256 || bytes[1] as usize != DIGEST_LEN {
            return Err(TypeError::InvalidContentHash(format!(
                "unsupported multihash header {:#04x} {:#04x}",
                bytes[0], bytes[1]
            )));
        }
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&bytes[2..]);
        Ok(Self(digest))
    }

    /// Ledger-native form: `0x` followed by the 64 hex digits of the digest.
    pub fn to_ledger_word(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Decode log data back into a content hash.
    pub fn from_ledger_word(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != DIGEST_LEN {
            return Err(TypeError::InvalidLength {
                expected: DIGEST_LEN,
                actual: bytes.len(),
            });
        }
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&bytes);
        Ok(Self(digest))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_base58())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl FromStr for ContentHash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base58(&s).map_err(serde::de::Error::custom)
    }
}
