use std::path::Path;

use ramble_engine::EngineConfig;
use ramble_types::Endpoint;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Remote storage nodes used when none are configured.
pub const DEFAULT_REMOTES: [&str; 3] = [
    "https://ipfs2.augur.net:443",
    "https://ipfs4.augur.net:443",
    "https://ipfs5.augur.net:443",
];

pub const DEFAULT_LOCAL: &str = "http://localhost:5001";

/// Client configuration, loadable from TOML.
///
/// Endpoints are written as URLs (`https://host:443`, `host:5001`) and
/// parsed by [`validate`](Self::validate). Engine settings sit at the top
/// level of the file:
///
/// ```toml
/// local = "http://localhost:5001"
/// remotes = ["https://ipfs2.augur.net:443"]
/// contract = "0x..."
/// sender = "0x..."
/// broadcast_mode = "best_effort"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RambleConfig {
    pub local: String,
    pub remotes: Vec<String>,
    /// Start on the first remote instead of the local node.
    pub secure_context: bool,
    /// Per-request timeout of the HTTP storage client.
    pub request_timeout_secs: u64,
    #[serde(flatten)]
    pub engine: EngineConfig,
}

impl Default for RambleConfig {
    fn default() -> Self {
        Self {
            local: DEFAULT_LOCAL.into(),
            remotes: DEFAULT_REMOTES.iter().map(|s| s.to_string()).collect(),
            secure_context: false,
            request_timeout_secs: 30,
            engine: EngineConfig::default(),
        }
    }
}

impl RambleConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        toml::from_str(s).map_err(|e| SdkError::Config(format!("invalid TOML: {e}")))
    }

    /// Read and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SdkError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SdkResult<()> {
        self.endpoints()?;
        if self.engine.contract.trim().is_empty() {
            return Err(SdkError::Config("contract address is required".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(SdkError::Config("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Parsed local endpoint and remote pool.
    pub fn endpoints(&self) -> SdkResult<(Endpoint, Vec<Endpoint>)> {
        let local = Endpoint::parse(&self.local)
            .map_err(|e| SdkError::Config(format!("local endpoint: {e}")))?;
        if self.remotes.is_empty() {
            return Err(SdkError::Config("at least one remote endpoint is required".into()));
        }
        let remotes = self
            .remotes
            .iter()
            .map(|url| {
                Endpoint::parse(url).map_err(|e| SdkError::Config(format!("remote endpoint: {e}")))
            })
            .collect::<SdkResult<Vec<_>>>()?;
        Ok((local, remotes))
    }
}
