use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

const WORD_LEN: usize = 32;

/// 256-bit correlation id linking ledger log events to a market.
///
/// Market ids circulate as signed hex (`-0xd7d2…`) in documents and as
/// unsigned 32-byte words in log topics. Both forms normalize to the same
/// two's-complement word, so comparisons are sign-insensitive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarketId([u8; WORD_LEN]);

impl MarketId {
    pub fn from_word(word: [u8; WORD_LEN]) -> Self {
        Self(word)
    }

    pub fn as_word(&self) -> &[u8; WORD_LEN] {
        &self.0
    }

    /// Parse `0x…`, bare hex, or negative `-0x…` hex.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        let (negative, magnitude) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let digits = magnitude
            .strip_prefix("0x")
            .or_else(|| magnitude.strip_prefix("0X"))
            .unwrap_or(magnitude);
        if digits.is_empty() {
            return Err(TypeError::InvalidMarketId(format!("no digits in {s:?}")));
        }

        let digits = digits.trim_start_matches('0');
        let padded = if digits.len() % 2 == 1 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        let bytes = hex::decode(&padded).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() > WORD_LEN {
            return Err(TypeError::InvalidMarketId(format!(
                "{s:?} does not fit in 256 bits"
            )));
        }

        let mut word = [0u8; WORD_LEN];
        word[WORD_LEN - bytes.len()..].copy_from_slice(&bytes);
        if negative {
            twos_complement(&mut word);
        }
        Ok(Self(word))
    }

    /// `0x` followed by 64 hex digits.
    pub fn to_word_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// Negate a big-endian 256-bit word in place.
fn twos_complement(word: &mut [u8; WORD_LEN]) {
    let mut carry = true;
    for byte in word.iter_mut().rev() {
        *byte = !*byte;
        if carry {
            let (sum, overflow) = byte.overflowing_add(1);
            *byte = sum;
            carry = overflow;
        }
    }
}

impl fmt::Debug for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarketId({})", self.to_word_hex())
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_word_hex())
    }
}

impl FromStr for MarketId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for MarketId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_word_hex())
    }
}

impl<'de> Deserialize<'de> for MarketId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
