use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Transport scheme spoken by a storage node's HTTP API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Port used when an endpoint string omits one.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => 5001,
            Self::Https => 443,
        }
    }
}

/// Address of one storage node.
///
/// Endpoints are immutable once constructed. Two endpoints are the same node
/// when host, port and protocol all match.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            host: host.into(),
            port,
            protocol,
        }
    }

    pub fn http(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, Protocol::Http)
    }

    pub fn https(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, Protocol::Https)
    }

    /// `scheme://host:port`, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol.as_str(), self.host, self.port)
    }

    /// Parse `https://host:443`, `host:5001` or a bare `host`.
    ///
    /// A missing scheme means plain HTTP; a missing port means the scheme's
    /// default port.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let trimmed = s.trim().trim_end_matches('/');
        let (protocol, rest) = if let Some(rest) = trimmed.strip_prefix("https://") {
            (Protocol::Https, rest)
        } else if let Some(rest) = trimmed.strip_prefix("http://") {
            (Protocol::Http, rest)
        } else if trimmed.contains("://") {
            return Err(TypeError::InvalidEndpoint(format!("unsupported scheme in {s:?}")));
        } else {
            (Protocol::Http, trimmed)
        };

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| TypeError::InvalidEndpoint(format!("bad port in {s:?}")))?;
                (host, port)
            }
            None => (rest, protocol.default_port()),
        };

        if host.is_empty() || host.contains('/') {
            return Err(TypeError::InvalidEndpoint(format!("bad host in {s:?}")));
        }
        Ok(Self::new(host, port, protocol))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}

impl FromStr for Endpoint {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
